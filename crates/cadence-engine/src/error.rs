//! Error types for the Cadence engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a subsystem error so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: cadence_core::config::ConfigError,
    },

    /// The periodic timer could not be armed.
    #[error("timer error: {source}")]
    Timer {
        /// The underlying timer error.
        #[from]
        source: cadence_core::timer::TimerError,
    },

    /// The console session failed.
    #[error("session error: {source}")]
    Session {
        /// The underlying session error.
        #[from]
        source: cadence_console::error::SessionError,
    },

    /// Reading terminal input failed.
    #[error("console input error: {source}")]
    Input {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The console thread panicked or was cancelled.
    #[error("console task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}
