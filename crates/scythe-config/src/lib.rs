//! Configuration for the scythe inspection service.
//!
//! Configuration is resolved in three layers: built-in defaults, an
//! optional JSON file pointed at by `SCYTHE_CONFIG`, and finally
//! individual environment variable overrides.

pub mod logging;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Log output format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Settings for invoking the external analysis tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Path to the `und` binary
    pub und_binary: PathBuf,
    /// Path to the companion detection script run through `und uperl`
    pub unused_script: PathBuf,
    /// Wall-clock bound for each external command, in seconds
    pub command_timeout_secs: u64,
    /// Maximum number of inspections waiting for the analysis worker
    pub queue_capacity: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            und_binary: PathBuf::from("/opt/scitools/bin/linux64/und"),
            unused_script: PathBuf::from("/opt/scythe/unused.pl"),
            command_timeout_secs: 1800,
            queue_capacity: 64,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding one working subdirectory per inspection
    pub data_dir: PathBuf,
    pub analyzer: AnalyzerConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/scythe"),
            analyzer: AnalyzerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the optional `SCYTHE_CONFIG`
    /// JSON file and environment variable overrides, in that order.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("SCYTHE_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("SCYTHE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(und) = std::env::var("SCYTHE_UND_BINARY") {
            self.analyzer.und_binary = PathBuf::from(und);
        }
        if let Ok(script) = std::env::var("SCYTHE_UNUSED_SCRIPT") {
            self.analyzer.unused_script = PathBuf::from(script);
        }
        if let Ok(timeout) = std::env::var("SCYTHE_COMMAND_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.analyzer.command_timeout_secs = secs;
            }
        }
        if let Ok(capacity) = std::env::var("SCYTHE_QUEUE_CAPACITY") {
            if let Ok(size) = capacity.parse() {
                self.analyzer.queue_capacity = size;
            }
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.analyzer.queue_capacity, 64);
        assert_eq!(config.analyzer.command_timeout_secs, 1800);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn loads_partial_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"data_dir": "/tmp/scythe", "analyzer": {{"queue_capacity": 4}}}}"#
        )
        .unwrap();
        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/scythe"));
        assert_eq!(config.analyzer.queue_capacity, 4);
        // untouched fields fall back to defaults
        assert_eq!(config.analyzer.command_timeout_secs, 1800);
    }

    #[test]
    fn rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            AppConfig::from_file(file.path().to_str().unwrap()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
