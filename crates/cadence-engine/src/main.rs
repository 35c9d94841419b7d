//! Cadence engine binary.
//!
//! Wires the tick worker and the line console around one shared
//! population engine, then reads commands from standard input until a
//! quit command or end of input.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `cadence-config.yaml` (or `CADENCE_CONFIG`)
//! 2. Initialize structured logging (tracing, to stderr)
//! 3. Arm the periodic timer; a bad interval aborts startup
//! 4. Initialize the console session (banner, start-up simulation)
//! 5. Spawn the tick driver
//! 6. Run the console loop on a blocking thread
//! 7. Abort the tick driver and close the simulation

mod commands;
mod error;

use std::path::PathBuf;

use cadence_console::error::SessionError;
use cadence_console::io::{LineSource, StdinSource, StdoutSink};
use cadence_console::session::{Session, SessionOptions};
use cadence_console::table::CommandTable;
use cadence_core::config::CadenceConfig;
use cadence_core::driver::{DriverSettings, TickDriver};
use cadence_core::simulation::{SharedSimulation, Simulation};
use cadence_core::timer::{PeriodicTimer, TimerSpec};
use cadence_sim::{PopulationEngine, PopulationParams};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Environment variable naming the config file.
const CONFIG_PATH_ENV: &str = "CADENCE_CONFIG";

/// Config file used when `CADENCE_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "cadence-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration or the timer is invalid, or if the
/// console loop fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging. Output goes to stderr so it does
    //    not interleave with console replies.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(
        interval_ms = config.ticker.interval_ms,
        progress_every = config.ticker.progress_every,
        map_area = config.ticker.map_area,
        "cadence-engine starting"
    );

    // 3. Arm the timer.
    let spec = TimerSpec::from_millis(config.ticker.interval_ms).map_err(EngineError::from)?;
    let timer = PeriodicTimer::from_spec(spec).map_err(EngineError::from)?;

    // 4. Initialize the console session.
    let simulation = SharedSimulation::new(PopulationEngine::new(PopulationParams::from(
        &config.simulation,
    )));
    let closer = simulation.clone();
    let options = SessionOptions::from(&config);
    let table = CommandTable::new(commands::simulation_commands(
        &simulation,
        config.ticker.map_area,
    ));
    let session = Session::initialize(&options, table, simulation.clone(), Box::new(StdoutSink));

    // 5. Spawn the tick driver.
    let driver = TickDriver::new(simulation, DriverSettings::from(&config.ticker));
    let ticker = tokio::spawn(driver.run(timer));

    // 6. Run the console loop.
    let max_line_length = options.max_line_length;
    let console = tokio::task::spawn_blocking(move || {
        let mut input = StdinSource::stdin();
        run_console(session, &mut input, max_line_length)
    });
    let joined = console.await;

    // 7. Shut down. The tick task stops first so it cannot reinitialize a
    //    closed simulation.
    ticker.abort();
    let _ = ticker.await;
    match joined {
        Ok((session, outcome)) => {
            session.shutdown();
            outcome?;
        }
        Err(e) => {
            closer.with(PopulationEngine::close);
            return Err(EngineError::from(e).into());
        }
    }

    info!("cadence-engine shutdown complete");
    Ok(())
}

/// Read lines from `input` and submit them until the session stops.
///
/// End of input ends the loop like a quit command. Lines the slot
/// rejects are dropped. The session is handed back on every path so the
/// caller can shut it down.
fn run_console(
    mut session: Session<PopulationEngine>,
    input: &mut dyn LineSource,
    max_line_length: usize,
) -> (Session<PopulationEngine>, Result<(), EngineError>) {
    while session.should_continue() {
        let line = match input.read_line(max_line_length) {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("console input closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "console input failed");
                return (session, Err(e.into()));
            }
        };
        match session.submit_line(&line) {
            Ok(_) | Err(SessionError::Slot { .. }) => {}
            Err(SessionError::Terminated) => break,
            Err(e) => {
                warn!(error = %e, "console session failed");
                return (session, Err(e.into()));
            }
        }
    }
    (session, Ok(()))
}

/// Load configuration from `CADENCE_CONFIG` or `cadence-config.yaml`.
///
/// A missing file yields the defaults with environment overrides applied.
fn load_config() -> Result<CadenceConfig, EngineError> {
    let config_path = std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if config_path.exists() {
        Ok(CadenceConfig::from_file(&config_path)?)
    } else {
        let mut config = CadenceConfig::default();
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }
}
