use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::question::{QuestionListParams, QuestionPayload},
    services::questions,
    state::AppState,
};

/// Lists questions, newest first, with optional type/search/date filters.
pub async fn list_questions(
    State(state): State<AppState>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(questions::list_questions(&state, params).await?))
}

/// Creates a question and refreshes its day in the cache.
pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let question = questions::create_question(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(questions::update_question(&state, id, payload).await?))
}

pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    questions::delete_question(&state, id).await?;
    Ok(Json(json!({ "message": "Question deleted" })))
}
