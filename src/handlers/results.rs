use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::attempt::{MarkDescriptiveRequest, ResultsParams, Verdict, ViewAnswersParams},
    services::results,
    state::AppState,
    utils::time::parse_day,
};

/// Ranked results of a day. `date` is required.
pub async fn view_results(
    State(state): State<AppState>,
    Query(params): Query<ResultsParams>,
) -> Result<impl IntoResponse, AppError> {
    let date = params
        .date
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Date is required".to_string()))?;
    let day = parse_day(date)?;

    let page = results::get_results(
        &state,
        day,
        params.search.as_deref().unwrap_or_default(),
        params.page,
        params.limit,
    )
    .await?;

    Ok(Json(page))
}

/// One student's answers of a day, with full questions.
pub async fn view_answers(
    State(state): State<AppState>,
    Query(params): Query<ViewAnswersParams>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(date), Some(user_id)) = (params.date.as_deref(), params.user_id) else {
        return Err(AppError::BadRequest("Date and userId are required".to_string()));
    };
    let day = parse_day(date)?;

    Ok(Json(results::get_answers(&state, day, user_id).await?))
}

/// Grades a descriptive answer as right or wrong.
pub async fn mark_descriptive(
    State(state): State<AppState>,
    Json(req): Json<MarkDescriptiveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(user_id), Some(question_id), Some(status)) =
        (req.user_id, req.question_id, req.status.as_deref())
    else {
        return Err(AppError::BadRequest(
            "userId, questionId and status are required".to_string(),
        ));
    };
    let verdict: Verdict = status.parse()?;

    results::mark_descriptive(&state, user_id, question_id, verdict).await?;

    Ok(Json(json!({ "message": "Marked successfully" })))
}
