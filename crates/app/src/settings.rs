//! Handles settings for the application.
//!
//! Values are read from an optional `settings` file (any format known to
//! `config`) and then from `PRICE_TRACKER__*` environment variables, e.g.
//! `PRICE_TRACKER__TELEGRAM__TOKEN`.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    /// Password of the admin panel.
    #[serde(default)]
    pub admin_password: String,
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    pub token: String,
    /// Shared secret for `/add_user` and `/admin`.
    #[serde(default)]
    pub admin_key: String,
    /// Public base URL; updates are polled when unset.
    pub webhook_url: Option<Url>,
    #[serde(default = "default_conversation_timeout")]
    pub conversation_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Notifier {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Smallest absolute change notified, in kopecks.
    #[serde(default = "default_threshold")]
    pub threshold_minor: i64,
}

impl Default for Notifier {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            threshold_minor: default_threshold(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub database: Database,
    pub server: Option<Server>,
    pub telegram: Option<Telegram>,
    #[serde(default)]
    pub notifier: Notifier,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("PRICE_TRACKER").separator("__"))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values the bot cannot run with.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.notifier.interval_secs == 0 {
            return Err(ConfigError::Message(
                "notifier.interval_secs must be positive".to_string(),
            ));
        }
        if self.notifier.threshold_minor < 0 {
            return Err(ConfigError::Message(
                "notifier.threshold_minor must not be negative".to_string(),
            ));
        }
        if let Some(telegram) = &self.telegram
            && telegram.conversation_timeout_secs == 0
        {
            return Err(ConfigError::Message(
                "telegram.conversation_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_conversation_timeout() -> u64 {
    300
}

fn default_interval() -> u64 {
    3600
}

fn default_threshold() -> i64 {
    100
}
