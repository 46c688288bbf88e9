use std::time::Duration;

use chrono::{DateTime, Days, FixedOffset, NaiveTime, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::{state::AppState, utils::time::quiz_day};

/// Time from `now` until the next `at` on the local clock of `offset`.
pub fn until_next_run(now: DateTime<Utc>, offset: &FixedOffset, at: NaiveTime) -> Duration {
    let local = now.with_timezone(offset);
    let today = local.date_naive().and_time(at);
    let next = if today > local.naive_local() {
        today
    } else {
        today.checked_add_days(Days::new(1)).unwrap_or(today)
    };
    (next - local.naive_local()).to_std().unwrap_or(Duration::ZERO)
}

/// Reloads the current quiz day into the cache once a day at the configured
/// local time. Failures are logged and retried at the next run.
pub fn spawn_cache_refresh(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let offset = state.config.quiz_offset;
        let at = state.config.cache_refresh_at;
        info!("Cache refresh scheduled daily at {} (UTC{})", at.format("%H:%M"), offset);

        loop {
            let wait = until_next_run(Utc::now(), &offset, at);
            tokio::time::sleep(wait).await;

            let day = quiz_day(Utc::now(), &offset);
            match state.question_cache.refresh_day(day).await {
                Ok(count) => info!("Scheduled refresh cached {} questions for {}", count, day),
                Err(e) => error!("Scheduled refresh for {} failed: {}", day, e),
            }
        }
    })
}
