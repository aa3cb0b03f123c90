use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use validator::Validate;
use crate::models::MatchingPolicy;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
}

/// Batching policy. Defaults are the production policy.
///
/// A mentee never holds more than five mentors, so `max_matches` may only be
/// lowered.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MatchingSettings {
    #[serde(default = "default_pool_limit")]
    #[validate(range(min = 1))]
    pub pool_limit: usize,
    #[serde(default = "default_poll_limit")]
    #[validate(range(min = 1))]
    pub poll_limit: u32,
    #[serde(default = "default_tick_interval_ms")]
    #[validate(range(min = 1))]
    pub tick_interval_ms: u64,
    #[serde(default = "default_max_mentees")]
    #[validate(range(min = 1))]
    pub max_mentees: u32,
    #[serde(default = "default_max_interests")]
    #[validate(range(min = 1))]
    pub max_interests: u32,
    #[serde(default = "default_max_matches")]
    #[validate(range(min = 1, max = 5))]
    pub max_matches: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            pool_limit: default_pool_limit(),
            poll_limit: default_poll_limit(),
            tick_interval_ms: default_tick_interval_ms(),
            max_mentees: default_max_mentees(),
            max_interests: default_max_interests(),
            max_matches: default_max_matches(),
        }
    }
}

fn default_pool_limit() -> usize { 10 }
fn default_poll_limit() -> u32 { 3 }
fn default_tick_interval_ms() -> u64 { 500 }
fn default_max_mentees() -> u32 { 5 }
fn default_max_interests() -> u32 { 5 }
fn default_max_matches() -> usize { 5 }

impl From<&MatchingSettings> for MatchingPolicy {
    fn from(settings: &MatchingSettings) -> Self {
        Self {
            pool_limit: settings.pool_limit,
            poll_limit: settings.poll_limit,
            tick_interval_ms: settings.tick_interval_ms,
            max_mentees: settings.max_mentees,
            max_interests: settings.max_interests,
            max_matches: settings.max_matches,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with MENTOR_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., MENTOR__MATCHING__POOL_LIMIT -> matching.pool_limit
            .add_source(
                Environment::with_prefix("MENTOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        validated(apply_database_url(settings)?.try_deserialize()?)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("MENTOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        validated(apply_database_url(settings)?.try_deserialize()?)
    }

    pub fn policy(&self) -> MatchingPolicy {
        MatchingPolicy::from(&self.matching)
    }
}

fn validated(settings: Settings) -> Result<Settings, ConfigError> {
    settings
        .matching
        .validate()
        .map_err(|e| ConfigError::Message(format!("invalid matching settings: {}", e)))?;
    Ok(settings)
}

/// `DATABASE_URL` wins over any configured `database.url`
fn apply_database_url(settings: Config) -> Result<Config, ConfigError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => Config::builder()
            .add_source(settings)
            .set_override("database.url", url)?
            .build(),
        Err(_) => Ok(settings),
    }
}
