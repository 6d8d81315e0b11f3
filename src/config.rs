use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::BROWSER_USER_AGENT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_path: PathBuf,

    // Forum
    pub forum_host: String,
    pub session_cookie: Option<String>,
    pub user_agent: String,

    // Check scheduling
    pub check_interval: Duration,
    pub check_delay_min_ms: u64,
    pub check_delay_max_ms: u64,

    // Scoring
    pub update_score_threshold: i32,

    // Web Server
    pub web_host: String,
    pub web_port: u16,

    // Store metadata
    pub steam_api_base: String,
    pub igdb_client_id: Option<String>,
    pub igdb_client_secret: Option<String>,
    pub igdb_api_base: String,
    pub twitch_oauth_base: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable has an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Database
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/tracker.sqlite")),

            // Forum
            forum_host: env_or_default("FORUM_HOST", "cs.rin.ru"),
            session_cookie: optional_env("FORUM_SESSION_COOKIE"),
            user_agent: env_or_default("FORUM_USER_AGENT", BROWSER_USER_AGENT),

            // Check scheduling
            check_interval: Duration::from_secs(parse_env_u64("CHECK_INTERVAL_SECS", 1800)?),
            check_delay_min_ms: parse_env_u64("CHECK_DELAY_MIN_MS", 1000)?,
            check_delay_max_ms: parse_env_u64("CHECK_DELAY_MAX_MS", 3000)?,

            // Scoring
            update_score_threshold: parse_env_i32("UPDATE_SCORE_THRESHOLD", 15)?,

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,

            // Store metadata
            steam_api_base: env_or_default("STEAM_API_BASE", "https://store.steampowered.com"),
            igdb_client_id: optional_env("IGDB_CLIENT_ID"),
            igdb_client_secret: optional_env("IGDB_CLIENT_SECRET"),
            igdb_api_base: env_or_default("IGDB_API_BASE", "https://api.igdb.com"),
            twitch_oauth_base: env_or_default("TWITCH_OAUTH_BASE", "https://id.twitch.tv"),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forum_host.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "FORUM_HOST".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.check_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "CHECK_INTERVAL_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.check_delay_min_ms > self.check_delay_max_ms {
            return Err(ConfigError::InvalidValue {
                name: "CHECK_DELAY_MIN_MS".to_string(),
                message: "must not exceed CHECK_DELAY_MAX_MS".to_string(),
            });
        }
        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_i32(name: &str, default: i32) -> Result<i32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
