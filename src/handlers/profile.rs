use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{error::AppError, state::AppState, utils::jwt::Claims};

/// Get current student's profile.
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users
        .find_user(claims.subject_id()?)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
