//! Admin question management. Every mutation refreshes the cached list of
//! each day it touches before returning.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::AppError,
    models::question::{Question, QuestionFilter, QuestionListParams, QuestionPayload},
    state::AppState,
    utils::time::parse_day,
};

const DEFAULT_LIST_LIMIT: u32 = 10;
const MAX_LIST_LIMIT: u32 = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPage {
    pub questions: Vec<Question>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_questions: i64,
}

pub async fn create_question(
    state: &AppState,
    payload: QuestionPayload,
) -> Result<Question, AppError> {
    let new = payload.into_new_question()?;
    let question = state.questions.create_question(new).await?;
    info!("Created {} question {} for {}", question.question_type, question.id, question.date);

    sync_day(state, question.date).await?;
    Ok(question)
}

pub async fn update_question(
    state: &AppState,
    id: i64,
    payload: QuestionPayload,
) -> Result<Question, AppError> {
    let new = payload.into_new_question()?;
    let previous = state
        .questions
        .find_question(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    let question = state
        .questions
        .update_question(id, new)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
    info!("Updated question {}", id);

    sync_day(state, question.date).await?;
    if previous.date != question.date {
        sync_day(state, previous.date).await?;
    }
    Ok(question)
}

pub async fn delete_question(state: &AppState, id: i64) -> Result<(), AppError> {
    let removed = state
        .questions
        .delete_question(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
    info!("Deleted question {} from {}", id, removed.date);

    sync_day(state, removed.date).await
}

/// Rebuilds the cached list of `day` after a mutation. When the rebuild
/// fails the entry is dropped so the next read goes to storage; only a
/// failure to drop it is an error.
async fn sync_day(state: &AppState, day: NaiveDate) -> Result<(), AppError> {
    if let Err(e) = state.question_cache.refresh_day(day).await {
        warn!("Cache refresh failed for {}, invalidating: {}", day, e);
        state.question_cache.invalidate_day(day).await?;
    }
    Ok(())
}

pub async fn list_questions(
    state: &AppState,
    params: QuestionListParams,
) -> Result<QuestionPage, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

    let filter = QuestionFilter {
        question_type: params
            .question_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(str::parse)
            .transpose()?,
        search: params.search.filter(|s| !s.trim().is_empty()),
        date: params
            .date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(parse_day)
            .transpose()?,
        offset: i64::from(page - 1) * i64::from(limit),
        limit: i64::from(limit),
    };

    let (questions, total) = state.questions.list_questions(&filter).await?;
    let total_pages = (total.max(0) as u64).div_ceil(u64::from(limit)) as u32;

    Ok(QuestionPage {
        questions,
        current_page: page,
        total_pages,
        total_questions: total,
    })
}
