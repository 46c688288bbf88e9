use std::{sync::Arc, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::cache::{KeyValueCache, start_marker_key};

/// Start markers live for one day.
pub const START_MARKER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Server-side "question opened at" timestamps, one per (user, day, index).
#[derive(Clone)]
pub struct StartMarkers {
    kv: Arc<dyn KeyValueCache>,
}

impl StartMarkers {
    pub fn new(kv: Arc<dyn KeyValueCache>) -> Self {
        Self { kv }
    }

    /// Epoch millis at which the student first opened this question.
    ///
    /// First call fixes it, later calls read it back unchanged, so neither a
    /// reload nor re-polling moves the deadline. With the cache down there is
    /// nothing to pin the marker to and `now` is returned.
    pub async fn start_time(
        &self,
        user_id: i64,
        day: NaiveDate,
        index: usize,
        now: DateTime<Utc>,
    ) -> i64 {
        let key = start_marker_key(user_id, day, index);
        let candidate = now.timestamp_millis();

        match self
            .kv
            .set_if_absent(&key, &candidate.to_string(), START_MARKER_TTL)
            .await
        {
            Ok(stored) => match stored.parse::<i64>() {
                Ok(start) => {
                    if start == candidate {
                        info!("New startTime set for user {}, qIndex {}: {}", user_id, index, start);
                    }
                    start
                }
                Err(_) => {
                    warn!("Unreadable start marker {}: {:?}", key, stored);
                    candidate
                }
            },
            Err(e) => {
                warn!("Start marker unavailable for {}: {}", key, e);
                candidate
            }
        }
    }
}
