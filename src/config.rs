//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub broadcast: BroadcastConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory of dashboard files served at `/`
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Broadcast loop and connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Upper bound on one diagnostics batch
    #[serde(default = "default_build_timeout")]
    pub build_timeout_ms: u64,

    /// How long shutdown waits for close notifications
    #[serde(default = "default_shutdown_deadline")]
    pub shutdown_deadline_ms: u64,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_interval() -> u64 {
    500
}

fn default_build_timeout() -> u64 {
    2000
}

fn default_shutdown_deadline() -> u64 {
    5000
}

fn default_max_connections() -> usize {
    1000
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            build_timeout_ms: default_build_timeout(),
            shutdown_deadline_ms: default_shutdown_deadline(),
            max_connections: default_max_connections(),
        }
    }
}

impl BroadcastConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_millis(self.build_timeout_ms)
    }

    pub fn shutdown_deadline(&self) -> Duration {
        Duration::from_millis(self.shutdown_deadline_ms)
    }
}

/// Vehicle diagnostics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticsConfig {
    /// Serial or Bluetooth (rfcomm) device of the OBD-II adapter
    #[serde(default = "default_obd_path")]
    pub device_path: PathBuf,

    /// Use the simulated device instead of real hardware
    #[serde(default)]
    pub simulated: bool,
}

fn default_obd_path() -> PathBuf {
    PathBuf::from("/dev/rfcomm0")
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            device_path: default_obd_path(),
            simulated: false,
        }
    }
}

/// Media player configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Player integration: "simulated" or "none"
    #[serde(default = "default_player")]
    pub player: String,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,
}

fn default_player() -> String {
    "simulated".to_string()
}

fn default_refresh_interval() -> u64 {
    500
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            player: default_player(),
            refresh_interval_ms: default_refresh_interval(),
        }
    }
}

impl MediaConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Camera configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_camera_path")]
    pub device_path: PathBuf,

    /// Refuse to start without a camera
    #[serde(default)]
    pub required: bool,
}

fn default_camera_path() -> PathBuf {
    PathBuf::from("/dev/video0")
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_path: default_camera_path(),
            required: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub fn filter_directive(&self) -> String {
        format!("dashlink={},tower_http={}", self.level, self.level)
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config = Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("broadcast.interval_ms", self.broadcast.interval_ms),
            ("broadcast.build_timeout_ms", self.broadcast.build_timeout_ms),
            ("media.refresh_interval_ms", self.media.refresh_interval_ms),
        ];
        for (key, value) in periods {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be greater than 0", key)));
            }
        }
        if self.broadcast.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "broadcast.max_connections must be greater than 0".to_string(),
            ));
        }
        Ok(())
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
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("dashlink").join("config.toml")),
            Some(PathBuf::from("/etc/dashlink/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(host) = var("DASHLINK_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("DASHLINK_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Some(dir) = var("DASHLINK_STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(dir));
        }

        // Source overrides
        if let Some(path) = var("DASHLINK_OBD_PATH") {
            self.diagnostics.device_path = PathBuf::from(path);
        }
        if let Some(simulated) = var("DASHLINK_OBD_SIMULATED") {
            self.diagnostics.simulated = simulated.to_lowercase() != "false" && simulated != "0";
        }
        if let Some(path) = var("DASHLINK_CAMERA_PATH") {
            self.camera.device_path = PathBuf::from(path);
        }

        // Logging overrides
        if let Some(level) = var("DASHLINK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("DASHLINK_LOG_FORMAT") {
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

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Dashlink Configuration
#
# Environment variables override these settings:
# - DASHLINK_HOST
# - DASHLINK_PORT
# - DASHLINK_STATIC_DIR
# - DASHLINK_OBD_PATH
# - DASHLINK_OBD_SIMULATED
# - DASHLINK_CAMERA_PATH
# - DASHLINK_LOG_LEVEL
# - DASHLINK_LOG_FORMAT

[server]
# Address to listen on
host = "0.0.0.0"
port = 8080

# Dashboard files served at / (optional)
# static_dir = "./src"

[broadcast]
# How often a snapshot is pushed to dashboards (ms)
interval_ms = 500

# Give up on a diagnostics batch after this long (ms)
build_timeout_ms = 2000

# How long shutdown waits for dashboards to be notified (ms)
shutdown_deadline_ms = 5000

# Maximum concurrent dashboard connections
max_connections = 1000

[diagnostics]
# OBD-II adapter device (serial or rfcomm)
device_path = "/dev/rfcomm0"

# Use a simulated vehicle instead of real hardware
simulated = false

[media]
# Player integration: simulated or none
player = "simulated"

# How often the player state is refreshed (ms)
refresh_interval_ms = 500

[camera]
# Video device
device_path = "/dev/video0"

# Refuse to start when the camera is missing
required = false

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.addr(), "0.0.0.0:8080");
        assert_eq!(config.broadcast.interval(), Duration::from_millis(500));
        assert_eq!(config.broadcast.shutdown_deadline(), Duration::from_secs(5));
        assert_eq!(config.broadcast.max_connections, 1000);
        assert_eq!(config.diagnostics.device_path, PathBuf::from("/dev/rfcomm0"));
        assert!(!config.diagnostics.simulated);
        assert_eq!(config.media.player, "simulated");
        assert!(!config.camera.required);
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.broadcast.build_timeout_ms, 2000);
        assert_eq!(config.camera.device_path, PathBuf::from("/dev/video0"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [diagnostics]
            simulated = true

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert!(config.diagnostics.simulated);
        assert!(config.logging.is_json());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.broadcast.interval_ms, 500);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9000\nstatic_dir = \"web\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.static_dir, Some(PathBuf::from("web")));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[server\nport = ").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_zero_periods_rejected() {
        let config = Config::parse("[broadcast]\ninterval_ms = 0\n").unwrap();
        match config.validate() {
            Err(ConfigError::Invalid(message)) => {
                assert!(message.contains("broadcast.interval_ms"), "{}", message)
            }
            other => panic!("expected invalid config, got {:?}", other),
        }

        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[media]\nrefresh_interval_ms = 0\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, "[broadcast]\nbuild_timeout_ms = 0\n").unwrap();
        assert!(matches!(Config::load_with_env(&path), Err(ConfigError::Invalid(_))));

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DASHLINK_PORT", "9100"),
            ("DASHLINK_OBD_SIMULATED", "true"),
            ("DASHLINK_OBD_PATH", "/dev/ttyUSB0"),
            ("DASHLINK_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9100);
        assert!(config.diagnostics.simulated);
        assert_eq!(config.diagnostics.device_path, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(config.logging.filter_directive(), "dashlink=debug,tower_http=debug");
    }

    #[test]
    fn test_invalid_port_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "DASHLINK_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 8080);
    }
}
