use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    error::AppError,
    models::{attempt::{NewAttempt, Verdict}, question::QuestionType},
    state::AppState,
    utils::time::quiz_day,
};

pub const NO_QUIZ_TODAY: &str = "No quiz found for today.";
pub const INDEX_OUT_OF_BOUNDS: &str = "Question index out of bounds.";
pub const ATTEMPT_RECORDED: &str = "Attempt recorded successfully.";
pub const ATTEMPT_ALREADY_RECORDED: &str = "Attempt already recorded.";

#[derive(Debug, Clone)]
pub struct Submission {
    pub user_id: i64,
    pub question_id: i64,
    /// Empty on timeout.
    pub answer: String,
    pub time_taken: f64,
    pub index: i64,
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// `false` when the pair already had an attempt and nothing was written.
    pub recorded: bool,
    pub correct_answer: Option<String>,
}

impl SubmitOutcome {
    pub fn message(&self) -> &'static str {
        if self.recorded {
            ATTEMPT_RECORDED
        } else {
            ATTEMPT_ALREADY_RECORDED
        }
    }
}

/// Records one answer against question `index` of the current day.
///
/// The answer key is taken from the day's cached list, i.e. from the question
/// the student was actually shown. Late submissions are accepted; the bonus
/// simply decays to zero.
pub async fn submit_attempt(
    state: &AppState,
    submission: Submission,
    now: DateTime<Utc>,
) -> Result<SubmitOutcome, AppError> {
    let time_taken = submission.time_taken;
    if !time_taken.is_finite() || time_taken < 0.0 {
        return Err(AppError::BadRequest(format!(
            "timeTaken must be a non-negative number of seconds, got {}",
            time_taken
        )));
    }

    let day = quiz_day(now, &state.config.quiz_offset);
    let questions = state.question_cache.questions_for_day(day).await?;
    if questions.is_empty() {
        return Err(AppError::NotFound(NO_QUIZ_TODAY.to_string()));
    }

    let question = usize::try_from(submission.index)
        .ok()
        .and_then(|i| questions.get(i))
        .ok_or_else(|| AppError::NotFound(INDEX_OUT_OF_BOUNDS.to_string()))?;

    if question.id != submission.question_id {
        return Err(AppError::BadRequest(format!(
            "Question {} is not at index {} today",
            submission.question_id, submission.index
        )));
    }

    let is_correct = match question.question_type {
        QuestionType::Descriptive => Some(Verdict::Pending),
        QuestionType::Mcq => None,
    };

    let recorded = state
        .attempts
        .insert_attempt(NewAttempt {
            user_id: submission.user_id,
            question_id: question.id,
            answer: submission.answer,
            date: day,
            time_taken,
            is_correct,
        })
        .await?;

    if recorded {
        info!(
            "Recorded attempt: user {} question {} ({}s)",
            submission.user_id, question.id, time_taken
        );
    } else {
        info!(
            "Duplicate submission ignored: user {} question {}",
            submission.user_id, question.id
        );
    }

    Ok(SubmitOutcome {
        recorded,
        correct_answer: question.correct_answer.clone(),
    })
}
