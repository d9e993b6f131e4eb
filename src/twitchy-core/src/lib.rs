pub mod api;
pub mod cache;
pub mod config;
pub mod logging;
pub mod models;
pub mod paths;
pub mod redact;
pub mod secrets;
pub mod settings;

pub use api::{ApiError, ApiResult, Connector, Credentials, TokenInfo, TwitchApi};
pub use config::{
    CacheConfig, ChannelOrder, Config, ConfigError, LogLevel, LoggingConfig, PlayerConfig,
    SearchConfig, SettingsConfig, TwitchConfig, ValidationError,
};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use paths::{AppDirs, DirsError};
pub use settings::{
    FileSettings, MemorySettings, SecureSettings, SettingKey, SettingsError, SettingsStore,
};

pub const APP_NAME: &str = "twitchy";
pub const APP_AUTHOR: &str = "Twitchy";
pub const APP_QUALIFIER: &str = "io";
