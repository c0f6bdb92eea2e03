//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//! ```text
//! defines the schema for `host.toml`.
//! loads configuration from file or falls back to defaults.
//! ```
//!
//! structure:
//! ```text
//! - SerialConfig: which port the radio bridge is on, and its baud rate.
//! - HistoryConfig: how many readings to keep per sensor.
//! - ValidationConfig: which temperature range the deployment uses.
//! - HttpConfig: where the snapshot server listens, optional static dir.
//! - PublisherConfig: backend name plus settings for each backend.
//! - LoggingConfig: log level and per-frame logging.
//!
//! every section is optional; missing keys take the defaults below.
//! ```
//!
//! ==============================================================================

use crate::error::ConfigError;
use crate::publish::DEFAULT_QUEUE_DEPTH;
use crate::registry::TemperatureRange;
use crate::store::DEFAULT_DEPTH;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HostConfig {
    pub serial: SerialConfig,
    pub history: HistoryConfig,
    pub validation: ValidationConfig,
    pub http: HttpConfig,
    pub publisher: PublisherConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialConfig {
    /// JeeLink on USB0 by default
    pub port: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    /// readings kept per sensor
    pub depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { depth: DEFAULT_DEPTH }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ValidationConfig {
    pub temperature_range: TemperatureRange,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    /// front-end files served at `/`
    pub static_dir: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:80".to_string(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PublisherConfig {
    /// "emoncms", "hub" or "log"
    pub backend: String,
    /// batches buffered for the publisher before new ones are dropped
    pub queue_depth: usize,
    pub emoncms: EmoncmsConfig,
    pub hub: HubConfig,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            backend: "emoncms".to_string(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
            emoncms: EmoncmsConfig::default(),
            hub: HubConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmoncmsConfig {
    pub server: String,
    pub apikey: String,
    /// added to numeric node ids so they don't clash with other inputs
    pub nodeid_offset: i64,
    pub timeout_seconds: u64,
}

impl Default for EmoncmsConfig {
    fn default() -> Self {
        Self {
            server: "emoncms.org".to_string(),
            apikey: String::new(),
            nodeid_offset: 0,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HubConfig {
    /// URL to push batches to
    pub hub_url: String,
    pub timeout_seconds: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            hub_url: String::new(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// log every decoded frame
    pub show_frames: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_frames: true,
        }
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: HostConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit path, or search the default locations
    ///
    /// returns the path actually used, `None` when falling back to defaults.
    /// an explicit path that fails to load is an error; a default location
    /// that fails is skipped with a warning.
    pub fn locate(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        let paths = [
            PathBuf::from("config").join("host.toml"),
            PathBuf::from("..").join("config").join("host.toml"),
        ];

        for path in paths {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return Ok((config, Some(path))),
                    Err(e) => {
                        // logging is not up yet
                        eprintln!("[CONFIG] Warning: failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        Ok((Self::default(), None))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.history.depth == 0 {
            return Err(ConfigError::Invalid("history.depth must be at least 1".into()));
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid("serial.baud_rate must be positive".into()));
        }
        if self.publisher.queue_depth == 0 {
            return Err(ConfigError::Invalid("publisher.queue_depth must be at least 1".into()));
        }
        Ok(())
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            port = %self.serial.port,
            baud = self.serial.baud_rate,
            depth = self.history.depth,
            temperature = ?self.validation.temperature_range,
            bind = %self.http.bind,
            publisher = %self.publisher.backend,
            queue_depth = self.publisher.queue_depth,
            level = %self.logging.level,
            "host configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_radio_bridge() {
        let config = HostConfig::default();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.history.depth, 20);
        assert_eq!(config.publisher.backend, "emoncms");
        assert_eq!(config.publisher.emoncms.server, "emoncms.org");
        assert_eq!(config.publisher.queue_depth, 256);
        assert_eq!(config.validation.temperature_range, TemperatureRange::Standard);
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = HostConfig::parse("").unwrap();
        assert_eq!(config.http.bind, "0.0.0.0:80");
        assert!(config.logging.show_frames);
    }

    #[test]
    fn test_parse_full_file() {
        let config = HostConfig::parse(
            r#"
            [serial]
            port = "/dev/ttyAMA0"
            baud_rate = 57600

            [history]
            depth = 50

            [validation]
            temperature_range = "extended"

            [http]
            bind = "127.0.0.1:8080"
            static_dir = "static"

            [publisher]
            backend = "hub"
            queue_depth = 32

            [publisher.emoncms]
            apikey = "abc"
            nodeid_offset = 20

            [publisher.hub]
            hub_url = "http://hub.local:3000/api/ingest"

            [logging]
            level = "debug"
            show_frames = false
            "#,
        )
        .unwrap();

        assert_eq!(config.serial.port, "/dev/ttyAMA0");
        assert_eq!(config.serial.baud_rate, 57600);
        assert_eq!(config.history.depth, 50);
        assert_eq!(config.validation.temperature_range, TemperatureRange::Extended);
        assert_eq!(config.http.static_dir, Some(PathBuf::from("static")));
        assert_eq!(config.publisher.backend, "hub");
        assert_eq!(config.publisher.queue_depth, 32);
        assert_eq!(config.publisher.emoncms.nodeid_offset, 20);
        assert_eq!(config.publisher.emoncms.server, "emoncms.org");
        assert_eq!(config.publisher.hub.hub_url, "http://hub.local:3000/api/ingest");
        assert!(!config.logging.show_frames);
    }

    #[test]
    fn test_rejects_zero_depth() {
        let err = HostConfig::parse("[history]\ndepth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_queue_depth() {
        let err = HostConfig::parse("[publisher]\nqueue_depth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unknown_temperature_range() {
        let err = HostConfig::parse("[validation]\ntemperature_range = \"arctic\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_locate_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[serial]\nport = \"/dev/ttyUSB1\"").unwrap();

        let (config, source) = HostConfig::locate(Some(file.path())).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB1");
        assert_eq!(source.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_locate_missing_explicit_path_fails() {
        let err = HostConfig::locate(Some(Path::new("/nonexistent/host.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
