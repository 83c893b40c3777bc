//! Configuration loaded from environment variables.

use std::time::Duration;

use bus::LockSettings;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Tracker configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL connection string; unset means in-memory storage
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `LOCK_LEASE_TTL_MS`: lease lifetime (default: `10000`)
/// - `LOCK_WAIT_TIMEOUT_MS`: bound on waiting for a held key (default: `2000`)
/// - `LOCK_RETRY_INTERVAL_MS`: pause between acquisition attempts (default: `50`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub lock: LockSettings,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    ///
    /// Values that fail to parse fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |name: &str, default: Duration| {
            lookup(name)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            lock: LockSettings {
                lease_ttl: millis("LOCK_LEASE_TTL_MS", defaults.lock.lease_ttl),
                wait_timeout: millis("LOCK_WAIT_TIMEOUT_MS", defaults.lock.wait_timeout),
                retry_interval: millis("LOCK_RETRY_INTERVAL_MS", defaults.lock.retry_interval),
            },
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 5,
            lock: LockSettings::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
