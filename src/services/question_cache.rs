//! Read-through cache of each day's ordered question list.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheError, KeyValueCache, day_key},
    error::AppError,
    models::question::Question,
    store::QuestionStore,
};

/// The list is written whole with one `set`; readers never observe a
/// half-applied edit. Its order is the storage canonical order
/// `(created_at, id)` and index N addresses position N of it.
#[derive(Clone)]
pub struct QuestionCache {
    kv: Arc<dyn KeyValueCache>,
    store: Arc<dyn QuestionStore>,
}

impl QuestionCache {
    pub fn new(kv: Arc<dyn KeyValueCache>, store: Arc<dyn QuestionStore>) -> Self {
        Self { kv, store }
    }

    /// Ordered questions of `day`. A miss, or an unreachable cache, loads
    /// from storage; a successful load is written back when non-empty.
    pub async fn questions_for_day(&self, day: NaiveDate) -> Result<Vec<Question>, AppError> {
        match self.read_cached(day).await {
            Ok(Some(list)) if !list.is_empty() => {
                debug!("Fetched {} questions for {} from cache", list.len(), day);
                return Ok(list);
            }
            Ok(_) => debug!("Cache empty for {}, fetching from storage", day),
            Err(e) => warn!("Cache unavailable for {}, falling back to storage: {}", day, e),
        }

        let list = self.store.questions_for_day(day).await?;
        if !list.is_empty() {
            if let Err(e) = self.replace_day(day, &list).await {
                warn!("Failed to populate cache for {}: {}", day, e);
            }
        }
        Ok(list)
    }

    /// Atomically replaces the cached list of `day`.
    pub async fn replace_day(&self, day: NaiveDate, list: &[Question]) -> Result<(), CacheError> {
        let payload = serde_json::to_string(list)?;
        self.kv.set(&day_key(day), &payload, None).await
    }

    pub async fn invalidate_day(&self, day: NaiveDate) -> Result<(), CacheError> {
        self.kv.invalidate(&day_key(day)).await
    }

    /// Reloads `day` from storage and swaps it into the cache.
    /// Used after every admin mutation and by the scheduled refresh.
    pub async fn refresh_day(&self, day: NaiveDate) -> Result<usize, AppError> {
        let list = self.store.questions_for_day(day).await?;
        if list.is_empty() {
            self.invalidate_day(day).await?;
        } else {
            self.replace_day(day, &list).await?;
        }
        info!("Cached {} questions for {}", list.len(), day);
        Ok(list.len())
    }

    async fn read_cached(&self, day: NaiveDate) -> Result<Option<Vec<Question>>, CacheError> {
        match self.kv.get(&day_key(day)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
