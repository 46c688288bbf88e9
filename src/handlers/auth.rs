// src/handlers/auth.rs

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{LoginRequest, OtpRequest, RegisterRequest, normalize_email},
    services::otp::{OtpPurpose, issue_otp, verify_otp},
    state::AppState,
    utils::jwt::{STUDENT_COOKIE, STUDENT_ROLE, clear_cookie, session_cookie, sign_jwt},
};

/// Sends a registration code to an email that has no account yet.
pub async fn send_otp(
    State(state): State<AppState>,
    Json(payload): Json<OtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    if state.users.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    issue_otp(&state, &email, OtpPurpose::Register).await?;
    Ok(Json(json!({ "message": "OTP sent to email" })))
}

/// Registers a new student.
///
/// Consumes the registration code, creates the user and opens a session.
/// Returns 201 Created with the user id and token.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let new_user = payload.new_user();

    verify_otp(&state, &new_user.email, &payload.otp, OtpPurpose::Register).await?;

    let user = state.users.create_user(new_user).await?;
    tracing::info!("Registered user {} ({})", user.id, user.email);

    let token = sign_jwt(
        user.id,
        STUDENT_ROLE,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;
    let cookie = session_cookie(STUDENT_COOKIE, &token, state.config.jwt_expiration);

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "userId": user.id, "token": token })),
    ))
}

/// Sends a login code to an existing student.
pub async fn send_login_otp(
    State(state): State<AppState>,
    Json(payload): Json<OtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    if state.users.find_user_by_email(&email).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    issue_otp(&state, &email, OtpPurpose::Login).await?;
    Ok(Json(json!({ "message": "OTP sent to email" })))
}

/// Authenticates a student by emailed code and returns a JWT token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    let user = state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    verify_otp(&state, &email, &payload.otp, OtpPurpose::Login).await?;

    let token = sign_jwt(
        user.id,
        STUDENT_ROLE,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;
    let cookie = session_cookie(STUDENT_COOKIE, &token, state.config.jwt_expiration);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "userId": user.id, "token": token })),
    ))
}

pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_cookie(STUDENT_COOKIE))],
        Json(json!({ "message": "Logged out" })),
    )
}
