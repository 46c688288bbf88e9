use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::{
    error::AppError, models::question::PublicQuestion, state::AppState, utils::time::quiz_day,
};

/// A question ready to be shown, without its answer key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServedQuestion {
    pub index: usize,
    pub total: usize,
    pub question: PublicQuestion,
    /// Epoch millis of the first fetch. The client derives the time left from it.
    pub start_time: i64,
}

#[derive(Debug, Clone)]
pub enum Delivery {
    NoQuizToday,
    /// Past the last question; the client treats this as "quiz complete".
    OutOfRange,
    AlreadyAttempted,
    Ready(ServedQuestion),
}

/// Resolves question `index` of the current quiz day for `user_id`.
pub async fn get_question(
    state: &AppState,
    user_id: i64,
    index: i64,
    now: DateTime<Utc>,
) -> Result<Delivery, AppError> {
    let day = quiz_day(now, &state.config.quiz_offset);
    question_for_day(state, user_id, day, index, now).await
}

async fn question_for_day(
    state: &AppState,
    user_id: i64,
    day: NaiveDate,
    index: i64,
    now: DateTime<Utc>,
) -> Result<Delivery, AppError> {
    let questions = state.question_cache.questions_for_day(day).await?;
    if questions.is_empty() {
        return Ok(Delivery::NoQuizToday);
    }

    let Some(position) = usize::try_from(index).ok().filter(|i| *i < questions.len()) else {
        debug!("Index {} out of range for {} ({} questions)", index, day, questions.len());
        return Ok(Delivery::OutOfRange);
    };
    let question = &questions[position];

    if state
        .attempts
        .find_attempt(user_id, question.id)
        .await?
        .is_some()
    {
        return Ok(Delivery::AlreadyAttempted);
    }

    let start_time = state
        .start_markers
        .start_time(user_id, day, position, now)
        .await;

    Ok(Delivery::Ready(ServedQuestion {
        index: position,
        total: questions.len(),
        question: PublicQuestion::from(question),
        start_time,
    }))
}
