use crate::error::{AppError, Result};

/// Upper bound applied to every caller-supplied row limit.
pub const MAX_QUERY_LIMIT: i64 = 1000;

/// Default number of +EV rows returned by `query_positive_ev`.
pub const DEFAULT_EV_LIMIT: i64 = 50;

/// Default minimum EV percentage for the per-sport +EV view.
pub const DEFAULT_SPORT_MIN_EV: f64 = 2.0;

/// Default number of rows returned by the per-sport +EV view.
pub const DEFAULT_SPORT_EV_LIMIT: i64 = 10;

/// Default number of quotes returned by `query_recent_odds`.
pub const DEFAULT_ODDS_LIMIT: i64 = 500;

/// Look-back window for `GET /fair-odds` when `hours` is omitted.
pub const DEFAULT_FAIR_ODDS_HOURS: i64 = 24;

pub const MS_PER_HOUR: i64 = 3_600 * 1_000;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Odds and EV rows older than this are pruned (RETENTION_DAYS, 0 = keep forever)
    pub retention_days: u32,
    /// Seconds between retention sweeps (CLEANUP_INTERVAL_SECS)
    pub cleanup_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "sharpedge.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            retention_days: std::env::var("RETENTION_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u32>()
                .map_err(|_| {
                    AppError::Config("RETENTION_DAYS must be a non-negative integer".to_string())
                })?,
            cleanup_interval_secs: std::env::var("CLEANUP_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse::<u64>()
                .unwrap_or(3600)
                .max(1),
        })
    }

    /// Retention window in milliseconds, or None when pruning is disabled.
    pub fn retention_ms(&self) -> Option<i64> {
        (self.retention_days > 0).then(|| i64::from(self.retention_days) * MS_PER_DAY)
    }
}

/// Clamp a caller-supplied limit into `1..=MAX_QUERY_LIMIT`.
pub fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, MAX_QUERY_LIMIT)
}
