//! Application configuration module
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables. `AppConfig::load` applies all three;
//! `AppConfig::builder` is the programmatic path used by tests.
//!
//! ```toml
//! [server]
//! port = 5000
//!
//! [hub]
//! outbound_capacity = 256
//! history_limit = 100
//!
//! [hub.auto_reply]
//! enabled = true
//!
//! [connection]
//! ping_interval_secs = 54
//! idle_timeout_secs = 60
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CRM_RELAY_CONFIG";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub hub: HubConfig,
    pub connection: ConnectionConfig,
}

/// HTTP listener and external services
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// PostgreSQL URL for the message store; the timeline log store is used when unset
    pub database_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_url: None,
        }
    }
}

/// Hub sizing and message policies
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HubConfig {
    /// Capacity of every connection's outbound queue
    pub outbound_capacity: usize,
    /// Retained history; `None` keeps everything
    pub history_limit: Option<usize>,
    /// Capacity of the publish command channel
    pub command_buffer: usize,
    /// Send a system welcome message after history replay
    pub welcome_message: bool,
    pub auto_reply: AutoReplyPolicy,
}

impl HubConfig {
    /// Most messages a joining connection is sent before live traffic
    ///
    /// History replay plus the welcome message; `None` when history is
    /// unbounded.
    pub fn max_replay(&self) -> Option<usize> {
        self.history_limit
            .map(|limit| limit.saturating_add(usize::from(self.welcome_message)))
    }

    /// Whether a full replay always fits in an outbound queue
    pub fn replay_fits(&self) -> bool {
        self.max_replay().is_some_and(|replay| replay <= self.outbound_capacity)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            history_limit: Some(100),
            command_buffer: 1024,
            welcome_message: true,
            auto_reply: AutoReplyPolicy::default(),
        }
    }
}

/// Automatic replies on behalf of mentioned users
///
/// When enabled, every mention in a broadcast message produces a reply whose
/// sender is the mentioned name. `{sender}` in the template is replaced with
/// the original sender.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AutoReplyPolicy {
    pub enabled: bool,
    /// Reply when users mention themselves
    pub reply_to_self_mentions: bool,
    pub template: String,
}

impl Default for AutoReplyPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            reply_to_self_mentions: false,
            template: "Thanks for the mention, @{sender}!".to_string(),
        }
    }
}

impl AutoReplyPolicy {
    /// Render the reply text for a given original sender
    pub fn render(&self, sender: &str) -> String {
        self.template.replace("{sender}", sender)
    }
}

/// Per-connection liveness and frame limits
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    pub ping_interval_secs: u64,
    pub idle_timeout_secs: u64,
    pub write_timeout_secs: u64,
    /// Largest accepted WebSocket frame
    pub max_frame_bytes: usize,
    /// Longest accepted message content, in characters
    pub max_content_len: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: 54,
            idle_timeout_secs: 60,
            write_timeout_secs: 10,
            max_frame_bytes: 4096,
            max_content_len: 2000,
        }
    }
}

impl ConnectionConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load configuration from defaults, the config file and the environment
    ///
    /// The file is `$CRM_RELAY_CONFIG` when set (and must exist), otherwise
    /// `<config dir>/crm-relay/config.toml` if present.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_file_path()? {
            Some(path) => {
                tracing::info!("[Config] Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; absent sections and keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Override values from environment-style variables
    ///
    /// `lookup` returns the value of a variable; taking it as a closure keeps
    /// this testable without touching the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = parse_env("SERVER_PORT", &port)?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.server.database_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(capacity) = lookup("CRM_RELAY_OUTBOUND_CAPACITY") {
            self.hub.outbound_capacity = parse_env("CRM_RELAY_OUTBOUND_CAPACITY", &capacity)?;
        }
        if let Some(limit) = lookup("CRM_RELAY_HISTORY_LIMIT") {
            let limit: usize = parse_env("CRM_RELAY_HISTORY_LIMIT", &limit)?;
            self.hub.history_limit = (limit > 0).then_some(limit);
        }
        if let Some(welcome) = lookup("CRM_RELAY_WELCOME") {
            self.hub.welcome_message = parse_env("CRM_RELAY_WELCOME", &welcome)?;
        }
        if let Some(auto_reply) = lookup("CRM_RELAY_AUTO_REPLY") {
            self.hub.auto_reply.enabled = parse_env("CRM_RELAY_AUTO_REPLY", &auto_reply)?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.outbound_capacity == 0 {
            return Err(ConfigError::Invalid("hub.outbound_capacity must be greater than 0"));
        }
        if self.hub.command_buffer == 0 {
            return Err(ConfigError::Invalid("hub.command_buffer must be greater than 0"));
        }
        if self.hub.history_limit == Some(0) {
            return Err(ConfigError::Invalid("hub.history_limit must be greater than 0 when set"));
        }
        if self.connection.ping_interval_secs == 0 {
            return Err(ConfigError::Invalid("connection.ping_interval_secs must be greater than 0"));
        }
        if self.connection.ping_interval_secs >= self.connection.idle_timeout_secs {
            return Err(ConfigError::Invalid(
                "connection.ping_interval_secs must be shorter than connection.idle_timeout_secs",
            ));
        }
        if self.connection.max_content_len == 0 || self.connection.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid("connection frame limits must be greater than 0"));
        }

        if !self.hub.replay_fits() {
            tracing::warn!(
                "[Config] Replay of {:?} message(s) can exceed the outbound queue ({}); connections joining a long history will be evicted during replay",
                self.hub.max_replay(),
                self.hub.outbound_capacity
            );
        }
        Ok(())
    }

    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn config_file_path() -> Result<Option<PathBuf>, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(ConfigError::MissingFile(path));
        }
        return Ok(Some(path));
    }
    Ok(dirs::config_dir()
        .map(|dir| dir.join("crm-relay").join("config.toml"))
        .filter(|path| path.exists()))
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: value.to_string(),
    })
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.hub.outbound_capacity = capacity;
        self
    }

    pub fn history_limit(mut self, limit: Option<usize>) -> Self {
        self.config.hub.history_limit = limit;
        self
    }

    pub fn welcome_message(mut self, enabled: bool) -> Self {
        self.config.hub.welcome_message = enabled;
        self
    }

    pub fn auto_reply(mut self, policy: AutoReplyPolicy) -> Self {
        self.config.hub.auto_reply = policy;
        self
    }

    pub fn ping_interval_secs(mut self, secs: u64) -> Self {
        self.config.connection.ping_interval_secs = secs;
        self
    }

    pub fn idle_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connection.idle_timeout_secs = secs;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
