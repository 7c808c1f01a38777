//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Detection API connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds. Absent means requests wait indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

/// Where session state is persisted
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

fn default_state_file() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("botwatch").join("state.json").to_string_lossy().to_string())
        .unwrap_or_else(|| "./botwatch_state.json".to_string())
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
        }
    }
}

/// Defaults for batch detection runs
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_samples")]
    pub samples: u32,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_balanced")]
    pub balanced: bool,
}

fn default_samples() -> u32 {
    10
}

fn default_model() -> String {
    "ensemble".to_string()
}

fn default_balanced() -> bool {
    true
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            samples: default_samples(),
            model: default_model(),
            balanced: default_balanced(),
        }
    }
}

/// Live monitoring and streaming settings
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_stream_interval")]
    pub stream_interval_ms: u64,

    /// Packets kept in the stream feed, at most 20
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,

    #[serde(default = "default_duration")]
    pub duration_secs: u32,

    #[serde(default = "default_sampling_interval")]
    pub sampling_interval_secs: f64,

    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
}

fn default_stream_interval() -> u64 {
    2000 // 2 seconds
}

fn default_feed_capacity() -> usize {
    20
}

fn default_duration() -> u32 {
    30
}

fn default_sampling_interval() -> f64 {
    2.0
}

fn default_alert_threshold() -> f64 {
    0.8
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stream_interval_ms: default_stream_interval(),
            feed_capacity: default_feed_capacity(),
            duration_secs: default_duration(),
            sampling_interval_secs: default_sampling_interval(),
            alert_threshold: default_alert_threshold(),
        }
    }
}

/// Presentation settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayConfig {
    /// Shave the fixed calibration offset off displayed percentages
    #[serde(default)]
    pub calibrated_percentages: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("botwatch").join("config.toml")),
            Some(PathBuf::from("./botwatch.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("BOTWATCH_API_URL") {
            self.api.base_url = url;
        }

        if let Ok(path) = std::env::var("BOTWATCH_STATE_FILE") {
            self.session.state_file = path;
        }

        if let Ok(ms) = std::env::var("BOTWATCH_STREAM_INTERVAL_MS") {
            if let Ok(ms) = ms.parse() {
                self.monitor.stream_interval_ms = ms;
            }
        }

        if let Ok(level) = std::env::var("BOTWATCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("BOTWATCH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Botwatch Configuration
#
# Environment variables override these settings:
# - BOTWATCH_API_URL
# - BOTWATCH_STATE_FILE
# - BOTWATCH_STREAM_INTERVAL_MS
# - BOTWATCH_LOG_LEVEL
# - BOTWATCH_LOG_FORMAT

[api]
# Detection API base URL
base_url = "http://127.0.0.1:8000"

# Request timeout in seconds (unset = no timeout)
# request_timeout_secs = 30

[session]
# File holding the token, user email, theme and last detection result
# state_file = "~/.local/share/botwatch/state.json"

[detection]
# Samples per batch run (1-50)
samples = 10

# Model: lstm, gcn or ensemble
model = "ensemble"

# Request a balanced normal/botnet sample mix
balanced = true

[monitor]
# Streaming poll period (ms)
stream_interval_ms = 2000

# Number of packets kept in the live feed
feed_capacity = 20

# Live monitoring run defaults
duration_secs = 30
sampling_interval_secs = 2.0
alert_threshold = 0.8

[display]
# Subtract the fixed calibration offset from displayed percentages
calibrated_percentages = false

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/botwatch/botwatch.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert!(config.api.request_timeout_secs.is_none());
        assert_eq!(config.monitor.stream_interval_ms, 2000);
        assert_eq!(config.monitor.feed_capacity, 20);
        assert_eq!(config.detection.model, "ensemble");
        assert!(!config.display.calibrated_percentages);
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.detection.samples, 10);
        assert_eq!(config.monitor.alert_threshold, 0.8);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("botwatch.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"http://detector:9000\"\n\n[monitor]\nfeed_capacity = 5\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "http://detector:9000");
        assert_eq!(config.monitor.feed_capacity, 5);
        assert_eq!(config.monitor.stream_interval_ms, 2000);
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[api\nbase_url = ").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
