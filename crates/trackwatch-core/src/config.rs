//! Configuration module for TrackWatch.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for TrackWatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub transport: TransportConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

/// Dashboard server endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the REST API, without the `/api` suffix.
    pub base_url: String,
    /// WebSocket URL of the push channel. `None` runs poll-only.
    pub push_url: Option<String>,
    /// Timeout applied to every REST request, in seconds.
    pub request_timeout_secs: u64,
}

/// Push/poll transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Seconds between poll heartbeats while push is down.
    pub poll_interval_secs: u64,
    /// Seconds to wait for a push connection before falling back.
    pub connect_timeout_secs: u64,
    /// Seconds between push reconnect attempts.
    pub reconnect_delay_secs: u64,
}

/// Change feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Maximum number of retained feed entries.
    pub capacity: usize,
    /// Seconds an entry stays visible.
    pub display_secs: u64,
    /// Title of every feed entry, also the announced text.
    pub alert_message: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/trackwatch/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("trackwatch")
            .join("config.yaml")
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl TransportConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

impl NotificationsConfig {
    pub fn display_duration(&self) -> Duration {
        Duration::from_secs(self.display_secs)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8085".to_string(),
            push_url: None,
            request_timeout_secs: 10,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            connect_timeout_secs: 10,
            reconnect_delay_secs: 3,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            display_secs: 10,
            alert_message: "Data updated".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"transport.poll_interval_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str, schemes: &[&str]) {
    match url::Url::parse(value) {
        Ok(parsed) if schemes.contains(&parsed.scheme()) => {}
        Ok(parsed) => errors.push(ValidationError {
            field: field.into(),
            message: format!(
                "unsupported scheme '{}'; valid options: {}",
                parsed.scheme(),
                schemes.join(", ")
            ),
        }),
        Err(e) => errors.push(ValidationError {
            field: field.into(),
            message: format!("invalid URL '{value}': {e}"),
        }),
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError {
            field: field.into(),
            message: "must be greater than 0".into(),
        });
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- server ---
        check_url(
            &mut errors,
            "server.base_url",
            &self.server.base_url,
            &["http", "https"],
        );
        if let Some(push_url) = &self.server.push_url {
            check_url(&mut errors, "server.push_url", push_url, &["ws", "wss"]);
        }
        check_positive(
            &mut errors,
            "server.request_timeout_secs",
            self.server.request_timeout_secs,
        );

        // --- transport ---
        check_positive(
            &mut errors,
            "transport.poll_interval_secs",
            self.transport.poll_interval_secs,
        );
        check_positive(
            &mut errors,
            "transport.connect_timeout_secs",
            self.transport.connect_timeout_secs,
        );
        check_positive(
            &mut errors,
            "transport.reconnect_delay_secs",
            self.transport.reconnect_delay_secs,
        );

        // --- notifications ---
        check_positive(
            &mut errors,
            "notifications.capacity",
            self.notifications.capacity as u64,
        );
        check_positive(
            &mut errors,
            "notifications.display_secs",
            self.notifications.display_secs,
        );
        if self.notifications.alert_message.trim().is_empty() {
            errors.push(ValidationError {
                field: "notifications.alert_message".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use trackwatch_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .server_base_url("http://dashboard.local:8085")
///     .server_push_url("ws://dashboard.local:8085/ws")
///     .transport_poll_interval_secs(10)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- server ---

    pub fn server_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.server.base_url = url.into();
        self
    }

    pub fn server_push_url(mut self, url: impl Into<String>) -> Self {
        self.config.server.push_url = Some(url.into());
        self
    }

    pub fn server_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.server.request_timeout_secs = seconds;
        self
    }

    // --- transport ---

    pub fn transport_poll_interval_secs(mut self, seconds: u64) -> Self {
        self.config.transport.poll_interval_secs = seconds;
        self
    }

    pub fn transport_connect_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.transport.connect_timeout_secs = seconds;
        self
    }

    pub fn transport_reconnect_delay_secs(mut self, seconds: u64) -> Self {
        self.config.transport.reconnect_delay_secs = seconds;
        self
    }

    // --- notifications ---

    pub fn notifications_capacity(mut self, capacity: usize) -> Self {
        self.config.notifications.capacity = capacity;
        self
    }

    pub fn notifications_display_secs(mut self, seconds: u64) -> Self {
        self.config.notifications.display_secs = seconds;
        self
    }

    pub fn notifications_alert_message(mut self, message: impl Into<String>) -> Self {
        self.config.notifications.alert_message = message.into();
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
