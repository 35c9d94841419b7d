//! Process-level loop contract.
//!
//! An embedding host drives the console through four calls:
//!
//! ```text
//! let mut session = Session::initialize(options, table, simulation, sink);
//! while session.should_continue() {
//!     let line = /* read from the host's own input */;
//!     session.submit_line(&line)?;
//! }
//! session.shutdown();
//! ```
//!
//! Each submitted line goes through the [`CommandSlot`] and is read back
//! by a [`SlotSource`], so the slot's publish / consume / erase discipline
//! is exercised on every command.

use std::fmt;
use std::sync::Arc;

use cadence_core::config::CadenceConfig;
use cadence_core::simulation::{ReinitKind, SharedSimulation, Simulation};
use chrono::Local;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::dispatch::{Console, ConsoleState, DispatchOutcome};
use crate::error::SessionError;
use crate::io::{LineSink, SlotSource, strip_line_ending};
use crate::slot::{CommandSlot, SlotState};
use crate::table::CommandTable;

/// Settings fixed for the life of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Longest accepted line, and the slot capacity, in bytes.
    pub max_line_length: usize,
    /// Column at which help text starts.
    pub help_column: usize,
    /// Name shown in the banner.
    pub version_name: String,
    /// Map area for the start-up initialization.
    pub map_area: u64,
}

impl From<&CadenceConfig> for SessionOptions {
    fn from(config: &CadenceConfig) -> Self {
        Self {
            max_line_length: config.console.max_line_length,
            help_column: config.console.help_column,
            version_name: config.console.version_name.clone(),
            map_area: config.ticker.map_area,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&CadenceConfig::default())
    }
}

/// A running console bound to a simulation.
pub struct Session<S> {
    console: Console,
    slot: Arc<CommandSlot>,
    source: SlotSource,
    sink: Box<dyn LineSink + Send>,
    simulation: SharedSimulation<S>,
}

impl<S: Simulation> Session<S> {
    /// Wire the console, print the banner, and start the simulation with
    /// a random seed.
    pub fn initialize(
        options: &SessionOptions,
        table: CommandTable,
        simulation: SharedSimulation<S>,
        sink: Box<dyn LineSink + Send>,
    ) -> Self {
        Self::with_seed(options, table, simulation, sink, rand::rng().random())
    }

    /// Like [`initialize`](Self::initialize), with the start-up seed given.
    pub fn with_seed(
        options: &SessionOptions,
        table: CommandTable,
        simulation: SharedSimulation<S>,
        mut sink: Box<dyn LineSink + Send>,
        seed: u64,
    ) -> Self {
        let slot = Arc::new(CommandSlot::with_capacity(options.max_line_length));
        let console = Console::new(table)
            .with_help_column(options.help_column)
            .with_max_line_length(options.max_line_length);

        let date = Local::now().format("%b %e %Y");
        sink.write_line("");
        sink.write_line(&format!(" *** {} Console, {date} ***", options.version_name));
        sink.write_line("      For a list of commands type 'help'");
        sink.write_line("");

        simulation.with(|sim| sim.reinitialize(ReinitKind::StartUp, seed, options.map_area, 0));
        info!(
            seed,
            map_area = options.map_area,
            commands = console.table().len(),
            "console session initialized"
        );

        Self {
            console,
            source: SlotSource::new(Arc::clone(&slot)),
            slot,
            sink,
            simulation,
        }
    }

    /// `false` once a quit command has run.
    pub const fn should_continue(&self) -> bool {
        !self.console.is_terminated()
    }

    /// Feed one line through the command slot and dispatch it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Terminated`] after a quit command, or
    /// [`SessionError::Slot`] if the slot rejects the line. A rejected line
    /// is dropped; the session stays usable.
    pub fn submit_line(&mut self, text: &str) -> Result<DispatchOutcome, SessionError> {
        if self.console.is_terminated() {
            return Err(SessionError::Terminated);
        }

        let line = strip_line_ending(text);
        if let Err(e) = self.slot.publish(line) {
            warn!(error = %e, "command rejected by slot");
            return Err(e.into());
        }

        let outcome = self.console.cycle(&mut self.source, self.sink.as_mut());

        if self.slot.state() == SlotState::ConsumedDirty {
            self.slot.finalize()?;
            debug!("command slot erased after dispatch");
        }

        Ok(outcome?.unwrap_or(DispatchOutcome::Continue))
    }

    /// The command slot backing this session.
    pub fn slot(&self) -> &CommandSlot {
        &self.slot
    }

    /// The dispatcher.
    pub const fn console(&self) -> &Console {
        &self.console
    }

    /// Dispatcher state.
    pub const fn state(&self) -> ConsoleState {
        self.console.state()
    }

    /// The shared simulation.
    pub const fn simulation(&self) -> &SharedSimulation<S> {
        &self.simulation
    }

    /// Close the simulation and end the session.
    pub fn shutdown(self) {
        self.simulation.with(S::close);
        info!(state = ?self.console.state(), "console session shut down");
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("console", &self.console)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}
