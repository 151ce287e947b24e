//! Solver configuration.
//!
//! The options forwarded opaquely to whichever solver consumes a model.
//! Can be built in code or loaded from TOML:
//!
//! ```
//! use u_formulate::config::{SolverConfig, Verbosity};
//! use std::time::Duration;
//!
//! let config = SolverConfig::from_toml_str(r#"
//!     thread_count = 6
//!     time_limit_secs = 120.0
//!     verbosity = "normal"
//! "#).unwrap();
//!
//! assert_eq!(config.thread_count, 6);
//! assert_eq!(config.time_limit(), Duration::from_secs(120));
//! assert_eq!(config.verbosity, Verbosity::Normal);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Solver log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// No solver output.
    #[default]
    Quiet,
    /// Regular progress output.
    Normal,
}

/// Options passed through to a model consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SolverConfig {
    /// Parallelism hint for the solver.
    pub thread_count: usize,
    /// Wall-clock budget in seconds.
    pub time_limit_secs: f64,
    /// Solver log level.
    pub verbosity: Verbosity,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            thread_count: 1,
            time_limit_secs: 3600.0,
            verbosity: Verbosity::Quiet,
        }
    }
}

impl SolverConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist, contains invalid TOML,
    /// or holds out-of-range values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the thread count hint.
    pub fn with_threads(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_secs = limit.as_secs_f64();
        self
    }

    /// Sets the verbosity.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Wall-clock budget as a [`Duration`].
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs_f64(self.time_limit_secs.max(0.0))
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_count == 0 {
            return Err(ConfigError::Invalid("thread_count must be at least 1".into()));
        }
        if !self.time_limit_secs.is_finite() || self.time_limit_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "time_limit_secs must be a non-negative number, got {}",
                self.time_limit_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.thread_count, 1);
        assert_eq!(config.time_limit(), Duration::from_secs(3600));
        assert_eq!(config.verbosity, Verbosity::Quiet);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SolverConfig::from_toml_str("thread_count = 4").unwrap();
        assert_eq!(config.thread_count, 4);
        assert_eq!(config.time_limit_secs, 3600.0);
    }

    #[test]
    fn test_builder() {
        let config = SolverConfig::new()
            .with_threads(8)
            .with_time_limit(Duration::from_millis(1500))
            .with_verbosity(Verbosity::Normal);
        assert_eq!(config.thread_count, 8);
        assert_eq!(config.time_limit(), Duration::from_millis(1500));
        assert_eq!(config.verbosity, Verbosity::Normal);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            SolverConfig::from_toml_str("thread_count = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SolverConfig::from_toml_str("time_limit_secs = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            SolverConfig::from_toml_str("verbosity = \"loud\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SolverConfig::load("/nonexistent/solver.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
