// src/config.rs

use std::env;

use chrono::{FixedOffset, NaiveTime};
use dotenvy::dotenv;

use crate::error::AppError;

/// India Standard Time, the default partition for quiz days.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

/// Session lifetime when the caller does not ask for anything else.
pub const DEFAULT_JWT_EXPIRATION: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// When unset the service keeps its cache in process memory.
    pub redis_url: Option<String>,
    /// Required to self-register a superadmin. Unset disables it.
    pub admin_registration_key: Option<String>,
    /// Offset that defines the calendar day of the quiz.
    pub quiz_offset: FixedOffset,
    /// Local time (in `quiz_offset`) at which the day's questions are cached.
    pub cache_refresh_at: NaiveTime,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = parsed("JWT_EXPIRATION")?.unwrap_or(DEFAULT_JWT_EXPIRATION);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let offset_minutes: i32 =
            parsed("QUIZ_UTC_OFFSET_MINUTES")?.unwrap_or(DEFAULT_UTC_OFFSET_MINUTES);
        let quiz_offset = offset_from_minutes(offset_minutes)?;

        let cache_refresh_at = match env::var("CACHE_REFRESH_TIME") {
            Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
                AppError::Config(format!("Invalid value for CACHE_REFRESH_TIME: {}", e))
            })?,
            Err(_) => default_refresh_time(),
        };

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            redis_url: optional("REDIS_URL"),
            admin_registration_key: optional("ADMIN_REGISTRATION_KEY"),
            quiz_offset,
            cache_refresh_at,
            server_port: parsed("SERVER_PORT")?.unwrap_or(3000),
        })
    }
}

/// 00:01 local time, one minute after the quiz day rolls over.
pub fn default_refresh_time() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 1, 0).unwrap_or(NaiveTime::MIN)
}

pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, AppError> {
    FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
        AppError::Config(format!("UTC offset of {} minutes is out of range", minutes))
    })
}

fn required(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Config(format!("{} must be set", name)))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(name: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(None),
    }
}
