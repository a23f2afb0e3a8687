//! TOML-based configuration for the host.
//!
//! The file is looked up at the path given on the command line, or else in
//! the platform-appropriate config directory:
//! - Windows:  `%APPDATA%\PodRemote\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/podremote/config.toml` (or `~/.config/podremote`)
//! - macOS:    `~/Library/Application Support/PodRemote/config.toml`
//!
//! A missing file is not an error; the defaults reproduce the classic setup
//! (`MacController` on `_ipodsync._tcp`, port 50505).
//!
//! ```toml
//! log_level = "info"
//!
//! [server]
//! bind_address = "0.0.0.0"
//! port = 50505            # 0 lets the OS choose; the chosen port is advertised
//! max_command_len = 1024
//! send_welcome = true
//!
//! [discovery]
//! enabled = true
//! service_type = "_ipodsync._tcp"
//! instance_name = "MacController"
//! domain = "local"
//!
//! [actions]
//! destructive_delay_ms = 1000
//! volume_step = 10
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so a partial file only
//! overrides what it mentions and an older file keeps working when new
//! fields are added.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use podremote_core::domain::service::{
    DEFAULT_DOMAIN, DEFAULT_INSTANCE_NAME, DEFAULT_PORT, DEFAULT_SERVICE_TYPE,
};
use podremote_core::protocol::DEFAULT_MAX_LINE_LEN;
use podremote_core::{PortSpec, ServiceRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::dispatch_command::{
    DispatchSettings, DEFAULT_DESTRUCTIVE_DELAY, DEFAULT_VOLUME_STEP,
};
use crate::infrastructure::network::server::ServerConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but makes no sense.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub actions: ActionsSection,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// IP address to bind.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port; `0` means any free port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Longest accepted command line in bytes, terminator excluded.
    #[serde(default = "default_max_command_len")]
    pub max_command_len: usize,
    /// Greet each new connection with `welcome to <instance>`.
    #[serde(default = "default_true")]
    pub send_welcome: bool,
}

/// DNS-SD advertisement settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverySection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
    #[serde(default = "default_domain")]
    pub domain: String,
}

/// Host action tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionsSection {
    /// Pause between acknowledging shutdown/restart/exit and acting on it.
    #[serde(default = "default_destructive_delay_ms")]
    pub destructive_delay_ms: u64,
    /// Volume change per `volume up`/`volume down`, in percent.
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_max_command_len() -> usize {
    DEFAULT_MAX_LINE_LEN
}
fn default_true() -> bool {
    true
}
fn default_service_type() -> String {
    DEFAULT_SERVICE_TYPE.to_string()
}
fn default_instance_name() -> String {
    DEFAULT_INSTANCE_NAME.to_string()
}
fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}
fn default_destructive_delay_ms() -> u64 {
    DEFAULT_DESTRUCTIVE_DELAY.as_millis() as u64
}
fn default_volume_step() -> u8 {
    DEFAULT_VOLUME_STEP as u8
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerSection::default(),
            discovery: DiscoverySection::default(),
            actions: ActionsSection::default(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_command_len: default_max_command_len(),
            send_welcome: default_true(),
        }
    }
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            service_type: default_service_type(),
            instance_name: default_instance_name(),
            domain: default_domain(),
        }
    }
}

impl Default for ActionsSection {
    fn default() -> Self {
        Self {
            destructive_delay_ms: default_destructive_delay_ms(),
            volume_step: default_volume_step(),
        }
    }
}

impl AppConfig {
    /// Validates the file settings and builds the runtime [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unparsable bind address,
    /// a zero command length, an empty instance name, an instance name with
    /// control characters, or a malformed service type.
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        let bind_address: IpAddr =
            self.server
                .bind_address
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                    field: "server.bind_address",
                    reason: e.to_string(),
                })?;
        if self.server.max_command_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_command_len",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.discovery.instance_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "discovery.instance_name",
                reason: "must not be empty".to_string(),
            });
        }
        // The name is sent in the welcome line and the DNS-SD record.
        if self.discovery.instance_name.chars().any(char::is_control) {
            return Err(ConfigError::InvalidValue {
                field: "discovery.instance_name",
                reason: "must not contain control characters".to_string(),
            });
        }
        if !self.discovery.service_type.starts_with('_') {
            return Err(ConfigError::InvalidValue {
                field: "discovery.service_type",
                reason: format!(
                    "{:?} is not a DNS-SD type like _name._tcp",
                    self.discovery.service_type
                ),
            });
        }

        let service = ServiceRecord::new(
            self.discovery.service_type.clone(),
            self.discovery.instance_name.clone(),
            self.discovery.domain.clone(),
            self.server.port,
        );
        Ok(ServerConfig {
            bind_address,
            port: PortSpec::from(self.server.port),
            max_command_len: self.server.max_command_len,
            send_welcome: self.server.send_welcome,
            service,
            discovery_enabled: self.discovery.enabled,
            dispatch: DispatchSettings {
                destructive_delay: Duration::from_millis(self.actions.destructive_delay_ms),
                volume_step: i32::from(self.actions.volume_step),
            },
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the default location.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path` as pretty TOML, creating parent directories.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the `PodRemote` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("PodRemote"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("podremote"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("PodRemote")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
