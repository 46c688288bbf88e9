// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::admin::{AdminLoginRequest, AdminRegisterRequest, AdminRole, DashboardStats, NewAdmin},
    models::user::normalize_email,
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{ADMIN_COOKIE, Claims, clear_cookie, session_claims, session_cookie, sign_jwt},
        time::quiz_day,
    },
};

const REMEMBER_ME_SECONDS: u64 = 30 * 24 * 60 * 60;
const SESSION_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Registers an admin account.
///
/// * A superadmin needs the deployment's registration key.
/// * A moderator can only be created from a superadmin session.
pub async fn register_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AdminRegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let role: AdminRole = payload.role.parse()?;

    match role {
        AdminRole::Superadmin => {
            let expected = state.config.admin_registration_key.as_deref();
            if expected.is_none() || payload.secret_key.as_deref() != expected {
                return Err(AppError::Forbidden("Invalid secret key".to_string()));
            }
        }
        AdminRole::Moderator => {
            let is_superadmin = session_claims(&headers, &state.config.jwt_secret)
                .is_some_and(|c| c.role == AdminRole::Superadmin.as_str());
            if !is_superadmin {
                return Err(AppError::Forbidden(
                    "Only a superadmin can create moderators".to_string(),
                ));
            }
        }
    }

    let admin = state
        .admins
        .create_admin(NewAdmin {
            name: payload.name.trim().to_string(),
            email: normalize_email(&payload.email),
            password: hash_password(&payload.password)?,
            role,
        })
        .await?;
    tracing::info!("Registered {} {}", admin.role, admin.email);

    Ok((StatusCode::CREATED, Json(admin)))
}

/// Authenticates an admin by email or name and password.
pub async fn login_admin(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let identifier = payload.identifier.trim();
    let admin = match state.admins.find_admin_by_identifier(identifier).await? {
        Some(admin) => Some(admin),
        None => {
            state
                .admins
                .find_admin_by_identifier(&normalize_email(identifier))
                .await?
        }
    }
    .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &admin.password)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let lifetime = if payload.remember_me {
        REMEMBER_ME_SECONDS
    } else {
        SESSION_SECONDS
    };
    let token = sign_jwt(
        admin.id,
        admin.role.as_str(),
        &state.config.jwt_secret,
        lifetime,
    )?;
    let cookie = session_cookie(ADMIN_COOKIE, &token, lifetime);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "token": token,
            "type": "Bearer",
            "role": admin.role,
        })),
    ))
}

pub async fn logout_admin() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_cookie(ADMIN_COOKIE))],
        Json(json!({ "message": "Logged out" })),
    )
}

pub async fn admin_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let admin = state
        .admins
        .find_admin(claims.subject_id()?)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;

    Ok(Json(admin))
}

/// Counters for the current quiz day.
pub async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let day = quiz_day(Utc::now(), &state.config.quiz_offset);

    let todays_quizzes = state.question_cache.questions_for_day(day).await?.len();
    let total_users = state.users.count_users().await?;
    let pending_reviews = state.attempts.count_pending(day).await?;

    Ok(Json(DashboardStats {
        date: day,
        todays_quizzes,
        total_users,
        pending_reviews,
    }))
}
