use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::warn;

use crate::{
    error::AppError,
    models::{
        attempt::{SummaryEntry, Verdict},
        question::Question,
    },
    services::scoring::verdict_for,
    state::AppState,
};

/// Every answer `user_id` gave on `day`, in submission order, with verdicts.
///
/// Questions come from the day's cache; one that has since left it (edited
/// to another day, deleted) is looked up by id instead.
pub async fn get_summary(
    state: &AppState,
    user_id: i64,
    day: NaiveDate,
) -> Result<Vec<SummaryEntry>, AppError> {
    let attempts = state.attempts.attempts_for_user_day(user_id, day).await?;
    if attempts.is_empty() {
        return Ok(Vec::new());
    }

    let mut by_id: HashMap<i64, Question> = state
        .question_cache
        .questions_for_day(day)
        .await?
        .into_iter()
        .map(|q| (q.id, q))
        .collect();

    let mut summary = Vec::with_capacity(attempts.len());
    for attempt in attempts {
        if !by_id.contains_key(&attempt.question_id) {
            match state.questions.find_question(attempt.question_id).await? {
                Some(q) => {
                    by_id.insert(q.id, q);
                }
                None => warn!(
                    "Question {} referenced by user {} no longer exists",
                    attempt.question_id, user_id
                ),
            }
        }

        let entry = match by_id.get(&attempt.question_id) {
            Some(q) => SummaryEntry {
                question_id: q.id,
                question: q.text.clone(),
                question_type: Some(q.question_type),
                status: verdict_for(
                    q.question_type,
                    &attempt.answer,
                    q.correct_answer.as_deref(),
                    attempt.is_correct,
                ),
                user_answer: attempt.answer,
                correct_answer: q.correct_answer.clone(),
            },
            None => SummaryEntry {
                question_id: attempt.question_id,
                question: "Question not found".to_string(),
                question_type: None,
                status: attempt.is_correct.unwrap_or(Verdict::Pending),
                user_answer: attempt.answer,
                correct_answer: None,
            },
        };
        summary.push(entry);
    }

    Ok(summary)
}
