//! Configuration loading and typed config structures for the Cadence console.
//!
//! The configuration lives in `cadence-config.yaml`. Every field has a
//! default, so a missing file, a missing section, or a missing key all
//! fall back to the values below.

use std::path::Path;

use serde::Deserialize;

/// Environment variable overriding [`TickerConfig::interval_ms`].
pub const TICK_INTERVAL_ENV: &str = "CADENCE_TICK_INTERVAL_MS";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {variable}")]
    Override {
        /// The environment variable name.
        variable: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CadenceConfig {
    /// Tick scheduling.
    #[serde(default)]
    pub ticker: TickerConfig,

    /// Console dispatcher and banner.
    #[serde(default)]
    pub console: ConsoleConfig,

    /// Parameters handed to the population engine.
    #[serde(default)]
    pub simulation: PopulationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CadenceConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `CADENCE_TICK_INTERVAL_MS` overrides `ticker.interval_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Override`] if the override is not a number.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply environment overrides, looking variables up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Override`] if a present variable does not parse.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(TICK_INTERVAL_ENV) {
            let interval_ms = value.trim().parse().map_err(|_err| ConfigError::Override {
                variable: TICK_INTERVAL_ENV,
                value: value.clone(),
            })?;
            self.ticker.interval_ms = interval_ms;
        }
        Ok(())
    }
}

/// Tick scheduling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TickerConfig {
    /// Real-time milliseconds between ticks. Zero is rejected when the
    /// timer is armed.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Emit a progress event whenever the tick count is a multiple of this.
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,

    /// Map area passed to every reinitialization.
    #[serde(default = "default_map_area")]
    pub map_area: u64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            progress_every: default_progress_every(),
            map_area: default_map_area(),
        }
    }
}

/// Console configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsoleConfig {
    /// Capacity of the command slot in bytes.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Product name printed in the start-up banner.
    #[serde(default = "default_version_name")]
    pub version_name: String,

    /// Column at which help text starts.
    #[serde(default = "default_help_column")]
    pub help_column: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            max_line_length: default_max_line_length(),
            version_name: default_version_name(),
            help_column: default_help_column(),
        }
    }
}

/// Population engine parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopulationConfig {
    /// Beings created by every reinitialization.
    #[serde(default = "default_initial_population")]
    pub initial_population: u64,

    /// Per-being chance of a birth each tick.
    #[serde(default = "default_birth_rate")]
    pub birth_rate: f64,

    /// Per-being chance of a death each tick.
    #[serde(default = "default_death_rate")]
    pub death_rate: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_population: default_initial_population(),
            birth_rate: default_birth_rate(),
            death_rate: default_death_rate(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_interval_ms() -> u64 {
    100
}

const fn default_progress_every() -> u64 {
    2048
}

/// A 512 by 512 cell map.
const fn default_map_area() -> u64 {
    1 << 18
}

const fn default_max_line_length() -> usize {
    4096
}

fn default_version_name() -> String {
    "Simulated Ape 0.708".to_owned()
}

const fn default_help_column() -> usize {
    28
}

const fn default_initial_population() -> u64 {
    32
}

const fn default_birth_rate() -> f64 {
    0.010
}

const fn default_death_rate() -> f64 {
    0.011
}

fn default_log_level() -> String {
    "info".to_owned()
}
