// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, profile, questions, quiz, results},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, student_middleware},
};

/// Assembles the main application router.
///
/// * Public: student OTP auth, admin register/login.
/// * Student session: quiz delivery, attempts, summary, profile.
/// * Admin session: questions, results, review, dashboard.
/// * Global middleware: Trace, CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let auth_routes = Router::new()
        .route("/send-otp", post(auth::send_otp))
        .route("/register", post(auth::register))
        .route("/send-login-otp", post(auth::send_login_otp))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    // Auth first, then the role check (layers run outside in).
    let student_routes = Router::new()
        .route("/today", post(quiz::today_question))
        .route("/attempt", post(quiz::submit_attempt))
        .route("/today/summary", get(quiz::today_summary))
        .layer(middleware::from_fn(student_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let user_routes = Router::new()
        .route("/profile", get(profile::get_me))
        .layer(middleware::from_fn(student_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let protected_admin_routes = Router::new()
        .route("/profile", get(admin::admin_profile))
        .route("/dashboard", get(admin::dashboard))
        .route(
            "/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route(
            "/questions/{id}",
            put(questions::update_question).delete(questions::delete_question),
        )
        .route("/results", get(results::view_results))
        .route("/view-answers", get(results::view_answers))
        .route("/mark-descriptive", put(results::mark_descriptive))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/register", post(admin::register_admin))
        .route("/login", post(admin::login_admin))
        .route("/logout", post(admin::logout_admin))
        .merge(protected_admin_routes);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/user", user_routes)
        .nest("/api/quiz", student_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied top to bottom)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
