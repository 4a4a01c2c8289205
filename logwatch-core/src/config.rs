use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::store::PoolSettings;

pub const DEFAULT_BASE_URL: &str = "https://api.render.com/v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub stream: StreamConfig,
    pub store: StoreConfig,
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub fetch_limit: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 10,
            fetch_limit: crate::client::DEFAULT_FETCH_LIMIT,
        }
    }
}

/// Polling cadence of the realtime streamer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub poll_interval_secs: u64,
    pub error_backoff_secs: u64,
    pub initial_lookback_secs: u64,
    pub batch_limit: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            error_backoff_secs: 30,
            initial_lookback_secs: 5 * 60,
            batch_limit: 50,
        }
    }
}

impl StreamConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn initial_lookback(&self) -> Duration {
        Duration::from_secs(self.initial_lookback_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: Option<PathBuf>,
    /// Horizon used by the retention task; the store itself never expires rows.
    pub retention_hours: u32,
    pub retention_interval_secs: u64,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let pool = PoolSettings::default();
        Self {
            database_path: None,
            retention_hours: 7 * 24,
            retention_interval_secs: 24 * 60 * 60,
            max_connections: pool.max_connections,
            busy_timeout_secs: pool.busy_timeout.as_secs(),
        }
    }
}

impl StoreConfig {
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(crate::db_path::default_database_path)
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            busy_timeout: Duration::from_secs(self.busy_timeout_secs),
        }
    }
}

/// Where realtime alerts go. Resolved once at startup and handed to monitors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub target: Option<String>,
}

impl Config {
    /// Load `~/.logwatch/config.toml` (or `.logwatch.toml` in the working
    /// directory), fill gaps with defaults, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::get_config_path() {
            Some(path) => Self::load_from_path(&path)?,
            None => Config::default(),
        };
        config.apply_env_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str::<Config>(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Reject settings that would make the archive unusable.
    pub fn validate(&self) -> Result<()> {
        if self.store.retention_hours == 0 {
            anyhow::bail!("store.retention_hours must be at least 1");
        }
        if self.store.max_connections == 0 {
            anyhow::bail!("store.max_connections must be at least 1");
        }
        Ok(())
    }

    fn get_config_path() -> Option<PathBuf> {
        if let Ok(current_dir) = env::current_dir() {
            let project_config = current_dir.join(".logwatch.toml");
            if project_config.exists() {
                return Some(project_config);
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let user_config = home_dir.join(".logwatch").join("config.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Environment wins over the file. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("LOGWATCH_API_KEY").or_else(|| lookup("RENDER_API_KEY")) {
            self.remote.api_key = Some(key);
        }

        if let Some(base_url) = lookup("LOGWATCH_BASE_URL") {
            self.remote.base_url = base_url;
        }

        if let Some(timeout) = lookup("LOGWATCH_TIMEOUT_SECS") {
            self.remote.timeout_secs = timeout
                .parse()
                .with_context(|| format!("LOGWATCH_TIMEOUT_SECS is not a number: {}", timeout))?;
        }

        if let Some(path) = lookup("LOGWATCH_DATABASE_PATH") {
            self.store.database_path = Some(PathBuf::from(path));
        }

        if let Some(target) = lookup("LOGWATCH_ALERT_TARGET") {
            self.alerts.target = Some(target);
        }

        if self.remote.timeout_secs == 0 {
            warn!("Remote timeout of 0s is not allowed, using 10s");
            self.remote.timeout_secs = 10;
        }

        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_content = toml::to_string_pretty(self)?;
        fs::write(path, toml_content)?;

        Ok(())
    }
}
