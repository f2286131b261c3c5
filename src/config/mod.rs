use std::env;
use std::time::Duration;

/// Upper bound accepted for `MAX_EXPIRATION_HOURS` (ten years)
pub const MAX_EXPIRATION_HOURS_CEILING: i64 = 24 * 365 * 10;

/// Runtime configuration for the record store, API and expiry sweeper
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection string (default: local SQLite file)
    pub database_url: String,

    /// Seconds between two expiry sweeps (default: 3600)
    pub sweep_interval_secs: u64,

    /// Maximum number of expired files handled per sweep (default: 100)
    pub sweep_batch_size: u64,

    /// Furthest expiry a new file may request, in hours (default: 720)
    pub max_expiration_hours: i64,

    /// Object storage backend: "noop" is the only one shipped (default: "noop")
    pub storage_backend: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://driftbox.db?mode=rwc".to_string(),
            sweep_interval_secs: 3600,
            sweep_batch_size: 100,
            max_expiration_hours: 24 * 30,
            storage_backend: "noop".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),

            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default.sweep_interval_secs),

            sweep_batch_size: env::var("SWEEP_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default.sweep_batch_size),

            max_expiration_hours: env::var("MAX_EXPIRATION_HOURS")
                .ok()
                .and_then(|v| parse_expiration_hours(&v))
                .unwrap_or(default.max_expiration_hours),

            storage_backend: env::var("STORAGE_BACKEND").unwrap_or(default.storage_backend),
        }
    }

    /// In-memory database and a fast sweep, for local runs and tests
    pub fn development() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            sweep_interval_secs: 5,
            sweep_batch_size: 100,
            max_expiration_hours: 24 * 30,
            storage_backend: "noop".to_string(),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Accepts `1..=MAX_EXPIRATION_HOURS_CEILING`; anything else falls back to the default
fn parse_expiration_hours(raw: &str) -> Option<i64> {
    let hours = raw.trim().parse::<i64>().ok()?;
    if hours < 1 || hours > MAX_EXPIRATION_HOURS_CEILING {
        tracing::warn!(
            "⚠️ Ignoring MAX_EXPIRATION_HOURS={} (allowed 1..={})",
            raw,
            MAX_EXPIRATION_HOURS_CEILING
        );
        return None;
    }
    Some(hours)
}
