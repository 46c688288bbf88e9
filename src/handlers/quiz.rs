// src/handlers/quiz.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use crate::{
    error::AppError,
    models::attempt::{SubmitAttemptRequest, TodayQuestionRequest},
    services::{
        delivery::{self, Delivery},
        recorder::{self, INDEX_OUT_OF_BOUNDS, NO_QUIZ_TODAY, Submission},
        summary,
    },
    state::AppState,
    utils::{jwt::Claims, time::quiz_day},
};

/// The body names the student; it has to be the one holding the session.
fn session_user(claims: &Claims, user_id: Option<i64>) -> Result<i64, AppError> {
    let user_id = user_id.ok_or_else(|| AppError::BadRequest("User ID not found.".to_string()))?;
    if claims.subject_id()? != user_id {
        return Err(AppError::Forbidden(
            "Cannot act on behalf of another user".to_string(),
        ));
    }
    Ok(user_id)
}

/// Serves question `index` of today's quiz.
///
/// * `{attempted: true}` when the student already answered it.
/// * 404 "Question index out of bounds." past the last question.
/// * Otherwise the question without its answer key and a fixed `startTime`.
pub async fn today_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TodayQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = session_user(&claims, req.user_id)?;
    let index = req
        .index
        .ok_or_else(|| AppError::BadRequest("Question index is required.".to_string()))?;

    match delivery::get_question(&state, user_id, index, Utc::now()).await? {
        Delivery::NoQuizToday => Err(AppError::NotFound(NO_QUIZ_TODAY.to_string())),
        Delivery::OutOfRange => Err(AppError::NotFound(INDEX_OUT_OF_BOUNDS.to_string())),
        Delivery::AlreadyAttempted => Ok(Json(json!({ "attempted": true }))),
        Delivery::Ready(served) => Ok(Json(json!({
            "attempted": false,
            "index": served.index,
            "total": served.total,
            "question": served.question,
            "startTime": served.start_time,
        }))),
    }
}

/// Records the answer to question `index` and reveals the correct answer.
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = session_user(&claims, req.user_id)?;
    let (Some(question_id), Some(index)) = (req.question_id, req.index) else {
        return Err(AppError::BadRequest(
            "Missing required fields: questionId and index.".to_string(),
        ));
    };
    let Some(time_taken) = req.time_taken else {
        return Err(AppError::BadRequest("timeTaken is required.".to_string()));
    };

    let submission = Submission {
        user_id,
        question_id,
        answer: req.answer.map(|a| a.into_string()).unwrap_or_default(),
        time_taken,
        index,
    };
    let outcome = recorder::submit_attempt(&state, submission, Utc::now()).await?;

    Ok(Json(json!({
        "message": outcome.message(),
        "correctAnswer": outcome.correct_answer,
    })))
}

/// The session student's answers for today, with verdicts.
pub async fn today_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.subject_id()?;
    let day = quiz_day(Utc::now(), &state.config.quiz_offset);
    let summary = summary::get_summary(&state, user_id, day).await?;

    Ok(Json(json!({ "summary": summary })))
}
