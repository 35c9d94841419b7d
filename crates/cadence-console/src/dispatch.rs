//! The console dispatcher.
//!
//! [`Console`] is a small state machine:
//!
//! ```text
//! Idle --dispatch--> Dispatching --+--> Idle
//!                                  +--> Terminated (quit / exit / close)
//! ```
//!
//! `Terminated` is final. Once reached, no handler runs again and every
//! dispatch reports [`DispatchOutcome::Quit`].

use std::io;

use tracing::{debug, info, warn};

use crate::io::{LineSink, LineSource, strip_line_ending};
use crate::slot::DEFAULT_CAPACITY;
use crate::table::{CommandContext, CommandStatus, CommandTable, DEFAULT_HELP_COLUMN, Invocation};

/// Message written when a line names no known command.
pub const NOT_FOUND_MESSAGE: &str = "Command not found, type help for more information";

/// Dispatcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    /// Waiting for a line.
    Idle,
    /// A handler is running.
    Dispatching,
    /// A quit command ran. Terminal.
    Terminated,
}

/// Result of dispatching one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The command ran (or the line was blank); keep going.
    Continue,
    /// The console has terminated.
    Quit,
    /// No table entry matched the command name.
    NotFound,
    /// The handler reported a failure.
    ExecutionError(String),
}

/// Looks commands up in a [`CommandTable`] and runs them.
#[derive(Debug)]
pub struct Console {
    table: CommandTable,
    state: ConsoleState,
    help_column: usize,
    max_line_length: usize,
}

impl Console {
    /// Create an idle console over `table`.
    pub const fn new(table: CommandTable) -> Self {
        Self {
            table,
            state: ConsoleState::Idle,
            help_column: DEFAULT_HELP_COLUMN,
            max_line_length: DEFAULT_CAPACITY,
        }
    }

    /// Set the column at which help text starts.
    #[must_use]
    pub const fn with_help_column(mut self, column: usize) -> Self {
        self.help_column = column;
        self
    }

    /// Set the longest line [`cycle`](Self::cycle) will read.
    #[must_use]
    pub const fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Current state.
    pub const fn state(&self) -> ConsoleState {
        self.state
    }

    /// Whether a quit command has run.
    pub const fn is_terminated(&self) -> bool {
        matches!(self.state, ConsoleState::Terminated)
    }

    /// The command table.
    pub const fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Dispatch one line, writing any output to `sink`.
    pub fn dispatch(&mut self, line: &str, sink: &mut dyn LineSink) -> DispatchOutcome {
        if self.is_terminated() {
            debug!("console terminated, line ignored");
            return DispatchOutcome::Quit;
        }

        let Some(invocation) = Invocation::parse(strip_line_ending(line)) else {
            return DispatchOutcome::Continue;
        };

        let Some(entry) = self.table.find(invocation.name()) else {
            warn!(command = invocation.name(), "unknown command");
            sink.write_line(&format!("ERROR: {NOT_FOUND_MESSAGE}"));
            return DispatchOutcome::NotFound;
        };

        self.state = ConsoleState::Dispatching;
        debug!(command = entry.name(), args = invocation.rest(), "dispatching");
        let result = {
            let mut ctx = CommandContext::new(&self.table, &mut *sink, self.help_column);
            entry.invoke(&mut ctx, &invocation)
        };

        match result {
            Ok(CommandStatus::Continue) => {
                self.state = ConsoleState::Idle;
                DispatchOutcome::Continue
            }
            Ok(CommandStatus::Quit) => {
                self.state = ConsoleState::Terminated;
                info!(command = invocation.name(), "console terminated");
                DispatchOutcome::Quit
            }
            Err(e) => {
                self.state = ConsoleState::Idle;
                let reason = e.to_string();
                warn!(command = invocation.name(), error = %reason, "command failed");
                sink.write_line(&format!("ERROR: {reason}"));
                DispatchOutcome::ExecutionError(reason)
            }
        }
    }

    /// Read one line from `source` and dispatch it.
    ///
    /// Returns `Ok(None)` when the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `source`.
    pub fn cycle(
        &mut self,
        source: &mut dyn LineSource,
        sink: &mut dyn LineSink,
    ) -> io::Result<Option<DispatchOutcome>> {
        let Some(line) = source.read_line(self.max_line_length)? else {
            return Ok(None);
        };
        Ok(Some(self.dispatch(&line, sink)))
    }
}
