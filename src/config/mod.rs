//! Configuration for the lifelog server.
//!
//! All configuration is loaded from environment variables (after reading an
//! optional `.env` file) with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;

/// Upper bounds keep `now + ttl` well inside the representable range.
pub const ACCESS_TTL_MAX_MINUTES: i64 = 24 * 60;
pub const REFRESH_TTL_MAX_HOURS: i64 = 24 * 366;

/// Which repository adapter backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

#[derive(Debug, Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Repository adapter
    pub store: StoreKind,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Login password; `None` disables login
    pub password: Option<String>,
    /// HMAC secret for access tokens; `None` means generate one per process
    pub jwt_secret: Option<String>,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = lookup("LIFELOG_DB_PATH")
            .unwrap_or_else(|| "./data/lifelog.sqlite".to_string())
            .into();

        let store = match lookup("LIFELOG_STORE").as_deref() {
            None | Some("sqlite") => StoreKind::Sqlite,
            Some("memory") => StoreKind::Memory,
            Some(other) => {
                return Err(ConfigError {
                    var: "LIFELOG_STORE",
                    value: other.to_string(),
                    reason: "expected \"sqlite\" or \"memory\"".to_string(),
                })
            }
        };

        let raw_addr = lookup("LIFELOG_BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let bind_addr = raw_addr.parse().map_err(|e| ConfigError {
            var: "LIFELOG_BIND_ADDR",
            value: raw_addr.clone(),
            reason: format!("{e}"),
        })?;

        let log_level = lookup("LIFELOG_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let password = lookup("LIFELOG_PASSWORD").filter(|p| !p.is_empty());
        let jwt_secret = lookup("LIFELOG_JWT_SECRET").filter(|s| !s.is_empty());

        let access_ttl = lifetime(
            &lookup,
            "LIFELOG_ACCESS_TTL_MINUTES",
            15,
            ACCESS_TTL_MAX_MINUTES,
            Duration::try_minutes,
        )?;
        let refresh_ttl = lifetime(
            &lookup,
            "LIFELOG_REFRESH_TTL_HOURS",
            168,
            REFRESH_TTL_MAX_HOURS,
            Duration::try_hours,
        )?;

        Ok(Self {
            db_path,
            store,
            bind_addr,
            log_level,
            password,
            jwt_secret,
            access_ttl,
            refresh_ttl,
        })
    }
}

/// A positive count of `unit`s no larger than `max`.
fn lifetime(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: i64,
    max: i64,
    unit: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    let raw = lookup(var);
    let count = match raw.as_deref().map(str::parse::<i64>) {
        None => default,
        Some(Ok(n)) if (1..=max).contains(&n) => n,
        _ => {
            return Err(ConfigError {
                var,
                value: raw.unwrap_or_default(),
                reason: format!("expected an integer between 1 and {max}"),
            })
        }
    };
    unit(count).ok_or_else(|| ConfigError {
        var,
        value: count.to_string(),
        reason: "lifetime out of range".to_string(),
    })
}
