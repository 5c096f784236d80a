//! Runtime configuration: optional RON file, then environment overrides.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;
use watch_core::DEFAULT_WINDOW_CAPACITY;
use watch_engine::{PortalSettings, StateStore};

pub const DEFAULT_CONFIG_FILE: &str = "portal_watch.ron";
pub const CONFIG_ENV: &str = "PORTAL_WATCH_CONFIG";

const DEFAULT_LOGIN_URL: &str =
    "https://stdportal.tdtu.edu.vn/Login/SignIn?ReturnURL=https://stdportal.tdtu.edu.vn/home/index";
const DEFAULT_FEED_URL: &str = "https://stdportal.tdtu.edu.vn/home/LayThongBaoQuanTrongSinhVien";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config file is not valid RON: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("{key} has invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{0}")]
    Invalid(String),
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum LogDestination {
    File,
    Terminal,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub destination: LogDestination,
    pub level: String,
    pub file: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            destination: LogDestination::Terminal,
            level: "info".to_string(),
            file: PathBuf::from("portal_watch.log"),
        }
    }
}

impl LogSettings {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.level).map_err(|_| ConfigError::InvalidValue {
            key: "log.level",
            value: self.level.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub login_url: String,
    pub feed_url: String,
    pub username: String,
    pub password: String,
    pub state_file: PathBuf,
    pub window_capacity: usize,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub lock_state: bool,
    pub stale_lock_secs: u64,
    pub telegram: Option<TelegramConfig>,
    pub log: LogSettings,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            username: String::new(),
            password: String::new(),
            state_file: PathBuf::from("seen_notifications.json"),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            poll_interval_secs: 300,
            request_timeout_secs: 10,
            lock_state: true,
            stale_lock_secs: 600,
            telegram: None,
            log: LogSettings::default(),
        }
    }
}

impl WatchConfig {
    /// Reads the config file (explicit path, `PORTAL_WATCH_CONFIG`, or
    /// `portal_watch.ron` if present), applies the process environment and
    /// validates the result.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        let text = match named {
            Some(path) => Some(read_file(&path)?),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Some(read_file(fallback)?)
                } else {
                    None
                }
            }
        };

        let mut config = match text {
            Some(text) => Self::from_ron(&text)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Overrides fields from environment-style lookups. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("PORTAL_LOGIN_URL") {
            self.login_url = value;
        }
        if let Some(value) = get("PORTAL_FEED_URL") {
            self.feed_url = value;
        }
        if let Some(value) = get("PORTAL_USERNAME") {
            self.username = value;
        }
        if let Some(value) = get("PORTAL_PASSWORD") {
            self.password = value;
        }
        if let Some(value) = get("STATE_FILE") {
            self.state_file = PathBuf::from(value);
        }
        if let Some(value) = get("WINDOW_SIZE") {
            self.window_capacity = parse_number("WINDOW_SIZE", &value)?;
        }
        if let Some(value) = get("POLL_INTERVAL_SECS") {
            self.poll_interval_secs = parse_number("POLL_INTERVAL_SECS", &value)?;
        }

        match (get("TELEGRAM_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => self.telegram = Some(TelegramConfig { token, chat_id }),
            (None, None) => {}
            (Some(_), None) => return Err(ConfigError::Missing("TELEGRAM_CHAT_ID")),
            (None, Some(_)) => return Err(ConfigError::Missing("TELEGRAM_TOKEN")),
        }
        Ok(())
    }

    /// Checks everything except credentials, which only polling needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [("login_url", &self.login_url), ("feed_url", &self.feed_url)] {
            url::Url::parse(value).map_err(|_| ConfigError::InvalidValue {
                key,
                value: value.clone(),
            })?;
        }
        if self.window_capacity == 0 {
            return Err(ConfigError::Invalid("window_capacity must be at least 1".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be at least 1".into()));
        }
        if self.state_file.as_os_str().is_empty() {
            return Err(ConfigError::Missing("state_file"));
        }
        self.log.level_filter()?;
        Ok(())
    }

    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.username.is_empty() {
            return Err(ConfigError::Missing("PORTAL_USERNAME"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Missing("PORTAL_PASSWORD"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn portal_settings(&self) -> PortalSettings {
        let mut settings = PortalSettings::new(
            self.login_url.clone(),
            self.feed_url.clone(),
            self.username.clone(),
            self.password.clone(),
        );
        settings.request_timeout = self.request_timeout();
        settings.connect_timeout = self.request_timeout();
        settings
    }

    /// Age after which a leftover lock is broken. `stale_lock_secs: 0`
    /// means a lock is never broken.
    pub fn stale_lock_after(&self) -> Option<Duration> {
        (self.stale_lock_secs > 0).then(|| Duration::from_secs(self.stale_lock_secs))
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(self.state_file.clone(), self.window_capacity)
            .with_stale_lock_after(self.stale_lock_after())
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
