//! Image choice configuration.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ConfigError;

const APP_NAME: &str = "remote-image-choice";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "linuxmobile";

/// Default in-memory budget for decoded images (64 MiB).
pub const DEFAULT_MEMORY_CAPACITY_BYTES: usize = 64 * 1024 * 1024;

/// Default on-disk budget for raw image bytes (200 MiB).
pub const DEFAULT_DISK_CAPACITY_BYTES: u64 = 200 * 1024 * 1024;

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Top-level configuration, usually read from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageChoiceConfig {
    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Memory and disk cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Budget for decoded images held in memory, in bytes.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity_bytes: usize,

    /// Persist fetched bytes to disk.
    #[serde(default = "default_true")]
    pub disk_enabled: bool,

    /// Disk cache directory. Defaults to the platform cache dir.
    #[serde(default)]
    pub disk_cache_dir: Option<PathBuf>,

    /// Budget for the disk cache, in bytes.
    #[serde(default = "default_disk_capacity")]
    pub disk_capacity_bytes: u64,

    /// Images wider than this are downscaled after decode.
    #[serde(default)]
    pub max_decode_width: Option<u32>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity_bytes: DEFAULT_MEMORY_CAPACITY_BYTES,
            disk_enabled: true,
            disk_cache_dir: None,
            disk_capacity_bytes: DEFAULT_DISK_CAPACITY_BYTES,
            max_decode_width: None,
        }
    }
}

impl CacheConfig {
    /// Returns effective disk cache directory.
    #[must_use]
    pub fn effective_disk_cache_dir(&self) -> PathBuf {
        self.disk_cache_dir
            .clone()
            .unwrap_or_else(default_disk_cache_dir)
    }
}

/// HTTP fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with image requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log verbosity level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log file path. Logs go nowhere when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_memory_capacity() -> usize {
    DEFAULT_MEMORY_CAPACITY_BYTES
}

fn default_disk_capacity() -> u64 {
    DEFAULT_DISK_CAPACITY_BYTES
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("{}/{}", crate::NAME, crate::VERSION)
}

impl ImageChoiceConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    /// Returns error if the TOML is malformed or a value is out of range.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads `path`, or the default config file when `path` is `None`,
    /// falling back to defaults when the file is absent.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be parsed.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path);
        match path {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// Returns error naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.memory_capacity_bytes == 0 {
            return Err(ConfigError::invalid(
                "cache.memory_capacity_bytes",
                "must be greater than zero",
            ));
        }
        if self.network.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "network.timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.cache.max_decode_width == Some(0) {
            return Err(ConfigError::invalid(
                "cache.max_decode_width",
                "must be greater than zero when set",
            ));
        }
        Ok(())
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }
}

/// Returns the default disk cache directory.
fn default_disk_cache_dir() -> PathBuf {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).map_or_else(
        || std::env::temp_dir().join(APP_NAME).join("cache").join("images"),
        |dirs| dirs.cache_dir().join("images"),
    )
}
