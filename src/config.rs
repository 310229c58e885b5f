//! Configuration for the biometric pipeline.

use crate::core::window::DEFAULT_WINDOW_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of readings (and therefore cycles) to generate
    pub cycles: u64,

    /// Readings kept in each analyzer window
    pub window_size: usize,

    /// Delay between generated readings
    #[serde(with = "duration_millis")]
    pub tick_interval: Duration,

    /// Simulated per-cycle processing latency of each analyzer
    pub analysis_delay: AnalysisDelay,

    /// Ledger file written by the verifier
    pub ledger_path: PathBuf,

    /// Text report written by the chain audit
    pub report_path: PathBuf,

    /// Run statistics written at the end of each run
    pub run_log_path: PathBuf,

    /// Reject cycles whose results carry different timestamps
    pub strict_timestamps: bool,

    /// Fixed generator seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = Self::default_data_dir();

        Self {
            cycles: 60,
            window_size: DEFAULT_WINDOW_SIZE,
            tick_interval: Duration::from_secs(1),
            analysis_delay: AnalysisDelay::default(),
            ledger_path: data_dir.join("blockchain.json"),
            report_path: data_dir.join("report.txt"),
            run_log_path: data_dir.join("run_log.json"),
            strict_timestamps: true,
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration as pretty JSON to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("biometric-chain")
            .join("config.json")
    }

    fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("biometric-chain")
    }

    /// Ensure the parent directories of every output file exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        for path in [&self.ledger_path, &self.report_path, &self.run_log_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::IoError(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Reject configurations that cannot produce a valid run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycles == 0 {
            return Err(ConfigError::Invalid(
                "cycle count must be a positive integer".to_string(),
            ));
        }
        if self.window_size == 0 {
            return Err(ConfigError::Invalid(
                "window size must be at least 1".to_string(),
            ));
        }
        if self.analysis_delay.min_ms > self.analysis_delay.max_ms {
            return Err(ConfigError::Invalid(format!(
                "analysis delay minimum {}ms exceeds maximum {}ms",
                self.analysis_delay.min_ms, self.analysis_delay.max_ms
            )));
        }
        Ok(())
    }
}

/// Bounds of the simulated analyzer latency, in milliseconds.
///
/// A maximum of zero disables the delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDelay {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl AnalysisDelay {
    pub fn disabled() -> Self {
        Self {
            min_ms: 0,
            max_ms: 0,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.max_ms == 0
    }
}

impl Default for AnalysisDelay {
    fn default() -> Self {
        Self {
            min_ms: 10,
            max_ms: 3000,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cycles, 60);
        assert_eq!(config.window_size, 30);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert!(config.strict_timestamps);
        assert!(config.ledger_path.ends_with("blockchain.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_cycle_count_rejected() {
        let config = Config {
            cycles: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_inverted_delay_rejected() {
        let config = Config {
            analysis_delay: AnalysisDelay {
                min_ms: 50,
                max_ms: 10,
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"cycles": 5, "tick_interval": 250}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.cycles, 5);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.window_size, 30);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"cycles":"#).unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            cycles: 12,
            seed: Some(9),
            tick_interval: Duration::from_millis(40),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.cycles, 12);
        assert_eq!(loaded.seed, Some(9));
        assert_eq!(loaded.tick_interval, Duration::from_millis(40));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.cycles, 60);
    }
}
