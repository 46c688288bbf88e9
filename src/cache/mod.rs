//! # Cache
//!
//! Key-value cache in front of question storage, plus the home of the
//! short-lived per-student records (question start markers, one-time codes).
//!
//! ## Keys
//!
//! - `quiz:<YYYY-MM-DD>`: JSON array of the day's questions in canonical order.
//!   Always written whole, never patched.
//! - `quiz:startTime:<userId>:<YYYY-MM-DD>:<index>`: epoch millis, first write wins, 24h TTL.
//! - `otp:<purpose>:<email>`: pending one-time code, 5 minute TTL.
//! - `otp:attempts:<purpose>:<email>`: wrong guesses against that code, same TTL.
//!
//! The cache is an optimization. Question content is always recoverable from storage.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::utils::time::format_day;

pub mod memory;
pub mod redis_cache;

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

#[derive(Debug)]
pub struct CacheError(pub String);

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache error: {}", self.0)
    }
}

impl std::error::Error for CacheError {}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError(format!("corrupt cache entry: {}", err))
    }
}

/// Capability interface over the shared cache.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Replaces the whole value in one operation.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Stores `value` only if `key` holds nothing live, and returns whatever
    /// the key holds afterwards. Concurrent callers all observe the first write.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<String, CacheError>;

    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// Reads and removes `key` in one step. Of several concurrent callers
    /// at most one gets the value.
    async fn take(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Adds one to the counter at `key` and returns the new count. A counter
    /// created by this call expires after `ttl`.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, CacheError>;
}

pub fn day_key(day: NaiveDate) -> String {
    format!("quiz:{}", format_day(day))
}

pub fn start_marker_key(user_id: i64, day: NaiveDate, index: usize) -> String {
    format!("quiz:startTime:{}:{}:{}", user_id, format_day(day), index)
}

pub fn otp_key(purpose: &str, email: &str) -> String {
    format!("otp:{}:{}", purpose, email)
}

pub fn otp_attempts_key(purpose: &str, email: &str) -> String {
    format!("otp:attempts:{}:{}", purpose, email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_conventions() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        assert_eq!(day_key(day), "quiz:2025-01-07");
        assert_eq!(start_marker_key(12, day, 3), "quiz:startTime:12:2025-01-07:3");
        assert_eq!(otp_key("login", "a@b.io"), "otp:login:a@b.io");
        assert_eq!(otp_attempts_key("login", "a@b.io"), "otp:attempts:login:a@b.io");
    }
}
