use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::info;

use crate::{
    error::AppError,
    models::{
        attempt::{AnswerDetail, ResultsPage, StudentAnswers, Verdict},
        question::{Question, QuestionType},
    },
    services::scoring::{paginate, rank_results, verdict_for},
    state::AppState,
};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;
pub const NO_ATTEMPTS_FOUND: &str = "No attempts found for this user on this date";

/// Ranked results of `day`. Ranking happens on the full (searched) cohort,
/// pagination afterwards.
pub async fn get_results(
    state: &AppState,
    day: NaiveDate,
    search: &str,
    page: Option<usize>,
    limit: Option<usize>,
) -> Result<ResultsPage, AppError> {
    let rows = state.attempts.result_rows_for_day(day).await?;
    let ranked = rank_results(&rows, search);

    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let (results, total_pages) = paginate(&ranked, page, limit);

    Ok(ResultsPage {
        date: day,
        results,
        total_results: ranked.len(),
        current_page: page,
        total_pages,
    })
}

/// A student's answers of `day` with full question bodies, for review.
pub async fn get_answers(
    state: &AppState,
    day: NaiveDate,
    user_id: i64,
) -> Result<StudentAnswers, AppError> {
    let attempts = state.attempts.attempts_for_user_day(user_id, day).await?;
    if attempts.is_empty() {
        return Err(AppError::NotFound(NO_ATTEMPTS_FOUND.to_string()));
    }

    let ids: Vec<i64> = attempts.iter().map(|a| a.question_id).collect();
    let questions: HashMap<i64, Question> = state
        .questions
        .find_questions(&ids)
        .await?
        .into_iter()
        .map(|q| (q.id, q))
        .collect();

    let name = state
        .users
        .find_user(user_id)
        .await?
        .map(|u| u.name)
        .unwrap_or_default();

    let answers = attempts
        .into_iter()
        .map(|attempt| match questions.get(&attempt.question_id) {
            Some(q) => AnswerDetail {
                question_id: q.id,
                question_text: Some(q.text.clone()),
                options: (q.question_type == QuestionType::Mcq).then(|| q.options.clone()),
                question_type: Some(q.question_type),
                is_correct: verdict_for(
                    q.question_type,
                    &attempt.answer,
                    q.correct_answer.as_deref(),
                    attempt.is_correct,
                ),
                user_answer: attempt.answer,
                correct_answer: q.correct_answer.clone(),
                time_taken: attempt.time_taken,
            },
            None => AnswerDetail {
                question_id: attempt.question_id,
                question_text: None,
                options: None,
                question_type: None,
                is_correct: attempt.is_correct.unwrap_or(Verdict::Pending),
                user_answer: attempt.answer,
                correct_answer: None,
                time_taken: attempt.time_taken,
            },
        })
        .collect();

    Ok(StudentAnswers {
        date: day,
        user_id,
        name,
        answers,
    })
}

/// Grades a descriptive attempt. Only `right` and `wrong` are accepted.
pub async fn mark_descriptive(
    state: &AppState,
    user_id: i64,
    question_id: i64,
    verdict: Verdict,
) -> Result<(), AppError> {
    if verdict == Verdict::Pending {
        return Err(AppError::BadRequest(
            "Status must be 'right' or 'wrong'".to_string(),
        ));
    }

    let question = state
        .questions
        .find_question(question_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
    if question.question_type != QuestionType::Descriptive {
        return Err(AppError::BadRequest(
            "Only descriptive answers can be marked".to_string(),
        ));
    }

    if !state
        .attempts
        .set_verdict(user_id, question_id, verdict)
        .await?
    {
        return Err(AppError::NotFound("Attempt not found".to_string()));
    }

    info!(
        "Marked descriptive answer of user {} for question {} as {}",
        user_id, question_id, verdict
    );
    Ok(())
}
