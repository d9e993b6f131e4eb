use crate::paths::AppDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub twitch: TwitchConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            logging: LoggingConfig::default(),
            search: SearchConfig::default(),
            twitch: TwitchConfig::default(),
            player: PlayerConfig::default(),
            cache: CacheConfig::default(),
            settings: SettingsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
    /// Mirror log lines to stderr. Stdout carries the plugin protocol.
    #[serde(default)]
    pub console: bool,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_log_files: default_max_log_files(),
            console: false,
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Ordering applied to channel search results before formatting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    /// Keep whatever order the API returned.
    #[default]
    Upstream,
    /// Descending view count.
    Views,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_icon_workers")]
    pub icon_workers: usize,
    #[serde(default = "default_games_scan_limit")]
    pub games_scan_limit: usize,
    #[serde(default)]
    pub channel_order: ChannelOrder,
    #[serde(default = "default_fallback_channels")]
    pub fallback_channels: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            icon_workers: default_icon_workers(),
            games_scan_limit: default_games_scan_limit(),
            channel_order: ChannelOrder::default(),
            fallback_channels: default_fallback_channels(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_auth_base")]
    pub auth_base: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            auth_base: default_auth_base(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_streamlink")]
    pub streamlink: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            streamlink: default_streamlink(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub icon_dir: Option<PathBuf>,
    #[serde(default = "default_cache_max_size_mb")]
    pub max_size_mb: u64,
    #[serde(default = "default_cache_max_age_days")]
    pub max_age_days: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            icon_dir: None,
            max_size_mb: default_cache_max_size_mb(),
            max_age_days: default_cache_max_age_days(),
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Icons live in a per-plugin temp directory unless configured otherwise.
    pub fn icon_dir(&self) -> PathBuf {
        self.icon_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(crate::APP_NAME))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Keep `client_secret` and `oauth_token` in the OS keyring instead of
    /// `settings.toml`.
    #[serde(default)]
    pub keyring: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(ValidationError),
    #[error("failed to prepare configuration directories: {0}")]
    Directories(#[from] crate::paths::DirsError),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported config_version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("search.icon_workers must be at least 1")]
    NoIconWorkers,
    #[error("{field} must end with '/' to be used as a base url")]
    BaseUrl { field: &'static str },
}

impl Config {
    pub fn load_or_default(dirs: &AppDirs) -> Result<Self, ConfigError> {
        dirs.ensure_exists()?;
        let path = Self::config_path(dirs);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    pub fn config_path(dirs: &AppDirs) -> PathBuf {
        dirs.config_dir().join("config.toml")
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_version != CURRENT_CONFIG_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.config_version,
                expected: CURRENT_CONFIG_VERSION,
            });
        }
        if self.search.icon_workers == 0 {
            return Err(ValidationError::NoIconWorkers);
        }
        if !self.twitch.api_base.ends_with('/') {
            return Err(ValidationError::BaseUrl {
                field: "twitch.api_base",
            });
        }
        if !self.twitch.auth_base.ends_with('/') {
            return Err(ValidationError::BaseUrl {
                field: "twitch.auth_base",
            });
        }
        Ok(())
    }
}

fn default_config_version() -> u32 {
    CURRENT_CONFIG_VERSION
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_max_log_files() -> usize {
    7
}

fn default_icon_workers() -> usize {
    10
}

fn default_games_scan_limit() -> usize {
    5000
}

fn default_fallback_channels() -> Vec<String> {
    [
        "twitch",
        "twitchgaming",
        "twitchpresents",
        "twitchrivals",
        "twitchmusic",
        "twitchsports",
        "twitchdev",
        "esl_csgo",
        "riotgames",
        "gamesdonequick",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_api_base() -> String {
    "https://api.twitch.tv/helix/".into()
}

fn default_auth_base() -> String {
    "https://id.twitch.tv/oauth2/".into()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_timeout() -> u64 {
    20
}

fn default_streamlink() -> String {
    "streamlink".into()
}

fn default_cache_max_size_mb() -> u64 {
    64
}

fn default_cache_max_age_days() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
