use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use async_trait::async_trait;

use super::{CacheError, KeyValueCache};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process cache used when no Redis is configured, and in tests.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError("memory cache lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.lock()?.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<String, CacheError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        if let Some(entry) = entries.get(key).filter(|e| e.is_live(now)) {
            return Ok(entry.value.clone());
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(value.to_string())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        Ok(self
            .lock()?
            .remove(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value))
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        let (count, expires_at) = match entries.get(key).filter(|e| e.is_live(now)) {
            Some(entry) => {
                let count = entry
                    .value
                    .parse::<i64>()
                    .map_err(|_| CacheError(format!("{} does not hold a counter", key)))?;
                (count + 1, entry.expires_at)
            }
            None => (1, Some(now + ttl)),
        };
        entries.insert(
            key.to_string(),
            Entry {
                value: count.to_string(),
                expires_at,
            },
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_write_wins() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);

        assert_eq!(cache.set_if_absent("k", "first", ttl).await.unwrap(), "first");
        assert_eq!(cache.set_if_absent("k", "second", ttl).await.unwrap(), "first");
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn expired_entries_disappear() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(
            cache
                .set_if_absent("k", "fresh", Duration::from_secs(5))
                .await
                .unwrap(),
            "fresh"
        );
    }

    #[tokio::test]
    async fn set_replaces_and_invalidate_removes() {
        let cache = MemoryCache::new();
        cache.set("day", "[1]", None).await.unwrap();
        cache.set("day", "[1,2]", None).await.unwrap();
        assert_eq!(cache.get("day").await.unwrap().as_deref(), Some("[1,2]"));

        cache.invalidate("day").await.unwrap();
        assert_eq!(cache.get("day").await.unwrap(), None);
    }

    #[tokio::test]
    async fn take_hands_out_a_value_once() {
        let cache = MemoryCache::new();
        cache.set("otp", "123456", Some(Duration::from_secs(60))).await.unwrap();

        assert_eq!(cache.take("otp").await.unwrap().as_deref(), Some("123456"));
        assert_eq!(cache.take("otp").await.unwrap(), None);
        assert_eq!(cache.get("otp").await.unwrap(), None);
    }

    #[tokio::test]
    async fn counters_count_up_until_they_expire() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_millis(20);

        assert_eq!(cache.increment("n", ttl).await.unwrap(), 1);
        assert_eq!(cache.increment("n", ttl).await.unwrap(), 2);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.increment("n", ttl).await.unwrap(), 1);
    }
}
