//! # pkgcache-config
//!
//! Configuration management for the package cache.
//!
//! Loads configuration from:
//! 1. `~/.pkgcache/config.toml` (global)
//! 2. `.pkgcache/config.toml` (project-local, overrides global)
//! 3. Environment variables (highest priority)

pub mod logging;
pub mod testing;

pub use logging::{init_logging, LogLevel};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

/// Global config instance
static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::load().unwrap_or_default()));

/// Get global config (read-only)
pub fn config() -> std::sync::RwLockReadGuard<'static, Config> {
    CONFIG.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reload config from disk
pub fn reload() -> Result<(), ConfigError> {
    let new_config = Config::load()?;
    *CONFIG.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = new_config;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML render error: {0}")]
    TomlRender(#[from] toml::ser::Error),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

pub const ENV_ROOT: &str = "PKGCACHE_ROOT";
pub const ENV_INDEX_URL: &str = "PKGCACHE_INDEX_URL";
pub const ENV_LOG: &str = "PKGCACHE_LOG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from standard locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_layered(
            Self::global_config_path().as_deref(),
            Path::new(".pkgcache/config.toml"),
            |key| std::env::var(key).ok(),
        )
    }

    /// Global file, then project file, then `env` lookups. Missing files
    /// are skipped.
    pub fn load_layered(
        global_path: Option<&Path>,
        project_path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(global_path) = global_path.filter(|p| p.exists()) {
            debug!("Loading global config from {:?}", global_path);
            config = Self::load_from(global_path)?;
        }

        if project_path.exists() {
            debug!("Loading project config from {:?}", project_path);
            let project_config = Self::load_from(project_path)?;
            config.merge(project_config);
        }

        config.apply_env_overrides(env)?;
        config.remote.index_url = normalize_index_url(&config.remote.index_url);

        Ok(config)
    }

    /// Load a single config file, without env overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.remote.index_url = normalize_index_url(&config.remote.index_url);
        Ok(config)
    }

    /// Global config path: ~/.pkgcache/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".pkgcache/config.toml"))
    }

    /// Merge a project config over this one. Values left at their
    /// defaults in `other` do not clobber what is already set.
    pub fn merge(&mut self, other: Config) {
        let defaults = Config::default();
        if other.storage.root != defaults.storage.root {
            self.storage.root = other.storage.root;
        }
        if other.remote.index_url != defaults.remote.index_url {
            self.remote.index_url = other.remote.index_url;
        }
        if other.remote.show_hidden {
            self.remote.show_hidden = true;
        }
        if other.logging.level != defaults.logging.level {
            self.logging.level = other.logging.level;
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = env(ENV_ROOT) {
            self.storage.root = PathBuf::from(path);
        }
        if let Some(url) = env(ENV_INDEX_URL) {
            self.remote.index_url = url;
        }
        if let Some(level) = env(ENV_LOG) {
            self.logging.level = level.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_LOG,
                value: level,
            })?;
        }
        Ok(())
    }

    /// Generate default config TOML string
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&Config::default())?)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage root; packages live under `<root>/packages/`
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("~/.pkgcache/store"),
        }
    }
}

impl StorageConfig {
    /// Root with a leading `~` expanded to the home directory.
    pub fn resolved_root(&self) -> PathBuf {
        expand_home(&self.root)
    }
}

/// Upstream package index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the upstream index, always ending in `/`
    pub index_url: String,
    /// Ask the index for hidden releases too (slow)
    pub show_hidden: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            index_url: "https://pypi.org/".to_string(),
            show_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

/// Append a trailing `/` to an index URL if it lacks one.
pub fn normalize_index_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

/// Expand a leading `~` component to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
