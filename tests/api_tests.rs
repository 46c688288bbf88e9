// tests/api_tests.rs

use std::sync::Arc;

use chrono::Utc;
use daily_quiz::{
    cache::{MemoryCache, otp_key},
    config::{Config, default_refresh_time, offset_from_minutes},
    routes,
    services::otp::LogMailer,
    state::AppState,
    store::MemoryStore,
    utils::time::{format_day, quiz_day},
};
use serde_json::{Value, json};

const REGISTRATION_KEY: &str = "test_registration_key";

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345") and the shared state.
async fn spawn_app() -> (String, AppState) {
    let config = Config {
        database_url: String::new(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        redis_url: None,
        admin_registration_key: Some(REGISTRATION_KEY.to_string()),
        quiz_offset: offset_from_minutes(330).unwrap(),
        cache_refresh_at: default_refresh_time(),
        server_port: 0,
    };

    let state = AppState::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryCache::new()),
        Arc::new(LogMailer),
    );

    let app = routes::create_router(state.clone());

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, state)
}

fn today(state: &AppState) -> String {
    format_day(quiz_day(Utc::now(), &state.config.quiz_offset))
}

/// Registers a student through the OTP flow. Returns (user id, token).
async fn register_student(
    client: &reqwest::Client,
    address: &str,
    state: &AppState,
    name: &str,
) -> (i64, String) {
    let email = format!("{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/auth/send-otp", address))
        .json(&json!({ "email": email }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let code = state
        .cache
        .get(&otp_key("register", &email))
        .await
        .unwrap()
        .expect("OTP should be cached");

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "name": name,
            "email": email,
            "phone": "9876543210",
            "college": "IIT",
            "otp": code
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    assert!(response.headers().get("set-cookie").is_some());

    let body: Value = response.json().await.unwrap();
    (
        body["userId"].as_i64().unwrap(),
        body["token"].as_str().unwrap().to_string(),
    )
}

/// Registers a superadmin and logs in. Returns the token.
async fn admin_token(client: &reqwest::Client, address: &str) -> String {
    let name = format!("admin_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/admin/register", address))
        .json(&json!({
            "name": name,
            "email": format!("{}@example.com", name),
            "password": "password123",
            "role": "superadmin",
            "secretKey": REGISTRATION_KEY
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    let response = client
        .post(format!("{}/api/admin/login", address))
        .json(&json!({ "identifier": name, "password": "password123", "rememberMe": true }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn create_question(client: &reqwest::Client, address: &str, token: &str, body: Value) -> Value {
    let response = client
        .post(format!("{}/api/admin/questions", address))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.unwrap()
}

async fn first_question(client: &reqwest::Client, address: &str, token: &str, user_id: i64) -> Value {
    client
        .post(format!("{}/api/quiz/today", address))
        .bearer_auth(token)
        .json(&json!({ "userId": user_id, "index": 0 }))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_check_404() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn quiz_requires_a_student_session() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/quiz/today", address))
        .json(&json!({ "userId": 1, "index": 0 }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let admin = admin_token(&client, &address).await;
    let response = client
        .post(format!("{}/api/quiz/today", address))
        .bearer_auth(&admin)
        .json(&json!({ "userId": 1, "index": 0 }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn admin_routes_reject_students() {
    let (address, state) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_student(&client, &address, &state, "Asha").await;

    let response = client
        .get(format!("{}/api/admin/dashboard", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn register_rejects_wrong_otp() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();
    let email = "someone@example.com";

    client
        .post(format!("{}/api/auth/send-otp", address))
        .json(&json!({ "email": email }))
        .send()
        .await
        .expect("Failed to execute request");

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "name": "Someone",
            "email": email,
            "phone": "9876543210",
            "otp": "000000x"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn login_with_otp_flow() {
    let (address, state) = spawn_app().await;
    let client = reqwest::Client::new();
    let (user_id, _) = register_student(&client, &address, &state, "Ravi").await;
    let email = state.users.find_user(user_id).await.unwrap().unwrap().email;

    // Unknown email cannot request a login code.
    let response = client
        .post(format!("{}/api/auth/send-login-otp", address))
        .json(&json!({ "email": "nobody@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .post(format!("{}/api/auth/send-login-otp", address))
        .json(&json!({ "email": email }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": email, "otp": "12345a" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid OTP");

    let code = state
        .cache
        .get(&otp_key("login", &email))
        .await
        .unwrap()
        .unwrap();
    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": email, "otp": code }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["userId"].as_i64(), Some(user_id));
    let token = body["token"].as_str().unwrap().to_string();

    // The code is single use.
    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": email, "otp": code }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No OTP sent or expired");

    let response = client
        .get(format!("{}/api/user/profile", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Ravi");
}

#[tokio::test]
async fn admin_registration_is_guarded() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/admin/register", address))
        .json(&json!({
            "name": "intruder",
            "email": "intruder@example.com",
            "password": "password123",
            "role": "superadmin",
            "secretKey": "guess"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);

    let moderator = json!({
        "name": "moddy",
        "email": "moddy@example.com",
        "password": "password123",
        "role": "moderator"
    });
    let response = client
        .post(format!("{}/api/admin/register", address))
        .json(&moderator)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);

    let token = admin_token(&client, &address).await;
    let response = client
        .post(format!("{}/api/admin/register", address))
        .bearer_auth(&token)
        .json(&moderator)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["role"], "moderator");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn question_validation() {
    let (address, state) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &address).await;

    let bad = [
        json!({ "type": "mcq", "text": "Q", "options": ["only"], "correctAnswer": 0, "date": today(&state) }),
        json!({ "type": "mcq", "text": "Q", "options": ["a", "b"], "correctAnswer": 2, "date": today(&state) }),
        json!({ "type": "mcq", "text": "Q", "options": ["a", "b"], "correctAnswer": 0, "date": "14/02/2025" }),
        json!({ "type": "descriptive", "text": "Q", "date": today(&state), "timeWindow": 3 }),
        json!({ "type": "essay", "text": "Q", "date": today(&state) }),
    ];
    for body in bad {
        let response = client
            .post(format!("{}/api/admin/questions", address))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 400, "accepted {}", body);
    }
}

#[tokio::test]
async fn full_quiz_day_flow() {
    let (address, state) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &address).await;
    let day = today(&state);

    // No questions yet.
    let (user_id, token) = register_student(&client, &address, &state, "Asha").await;
    let response = client
        .post(format!("{}/api/quiz/today", address))
        .bearer_auth(&token)
        .json(&json!({ "userId": user_id, "index": 0 }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No quiz found for today.");

    let q1 = create_question(
        &client,
        &address,
        &admin,
        json!({
            "type": "mcq",
            "text": "2 + 2 = ?",
            "options": ["3", "4", "5"],
            "correctAnswer": 1,
            "date": day,
            "timeWindow": 20
        }),
    )
    .await;
    let q2 = create_question(
        &client,
        &address,
        &admin,
        json!({ "type": "descriptive", "text": "Explain ownership.", "date": day }),
    )
    .await;
    assert_eq!(q2["timeWindow"], 20);

    // Someone else's userId is refused.
    let response = client
        .post(format!("{}/api/quiz/today", address))
        .bearer_auth(&token)
        .json(&json!({ "userId": user_id + 1000, "index": 0 }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);

    // Fetching twice keeps the same start time and never leaks the key.
    let mut start_times = Vec::new();
    for _ in 0..2 {
        let response = client
            .post(format!("{}/api/quiz/today", address))
            .bearer_auth(&token)
            .json(&json!({ "userId": user_id, "index": 0 }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["attempted"], false);
        assert_eq!(body["total"], 2);
        assert_eq!(body["question"]["text"], "2 + 2 = ?");
        assert!(body["question"].get("correctAnswer").is_none());
        start_times.push(body["startTime"].as_i64().unwrap());
    }
    assert_eq!(start_times[0], start_times[1]);

    // Answer arrives as a string, key is stored as an index.
    let response = client
        .post(format!("{}/api/quiz/attempt", address))
        .bearer_auth(&token)
        .json(&json!({
            "userId": user_id,
            "questionId": q1["id"],
            "answer": "1",
            "timeTaken": 10,
            "index": 0
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["correctAnswer"], "1");
    assert_eq!(body["message"], "Attempt recorded successfully.");

    // Resubmitting is harmless.
    let response = client
        .post(format!("{}/api/quiz/attempt", address))
        .bearer_auth(&token)
        .json(&json!({
            "userId": user_id,
            "questionId": q1["id"],
            "answer": 2,
            "timeTaken": 1,
            "index": 0
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Attempt already recorded.");

    let response = client
        .post(format!("{}/api/quiz/today", address))
        .bearer_auth(&token)
        .json(&json!({ "userId": user_id, "index": 0 }))
        .send()
        .await
        .expect("Failed to execute request");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "attempted": true }));

    let response = client
        .post(format!("{}/api/quiz/attempt", address))
        .bearer_auth(&token)
        .json(&json!({
            "userId": user_id,
            "questionId": q2["id"],
            "answer": "foo",
            "timeTaken": 10,
            "index": 1
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    // Past the last question.
    let response = client
        .post(format!("{}/api/quiz/today", address))
        .bearer_auth(&token)
        .json(&json!({ "userId": user_id, "index": 2 }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Question index out of bounds.");

    let response = client
        .get(format!("{}/api/quiz/today/summary", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    let summary = body["summary"].as_array().unwrap();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0]["status"], "right");
    assert_eq!(summary[1]["status"], "pending");
    assert_eq!(summary[1]["type"], "descriptive");

    // Admin side: results, drill-down, marking.
    let response = client
        .get(format!("{}/api/admin/dashboard", address))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to execute request");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["todaysQuizzes"], 2);
    assert_eq!(body["pendingReviews"], 1);

    let results_url = format!("{}/api/admin/results?date={}", address, day);
    let body: Value = client
        .get(&results_url)
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(body["totalResults"], 1);
    assert_eq!(body["results"][0]["score"], 5.5);
    assert_eq!(body["results"][0]["percentage"], 45.83);
    assert_eq!(body["results"][0]["rank"], 1);

    let response = client
        .get(format!(
            "{}/api/admin/view-answers?date={}&userId={}",
            address, day, user_id
        ))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Asha");
    assert_eq!(body["answers"][0]["correctAnswer"], "1");
    assert_eq!(body["answers"][0]["options"], json!(["3", "4", "5"]));
    assert_eq!(body["answers"][1]["isCorrect"], "pending");

    let response = client
        .put(format!("{}/api/admin/mark-descriptive", address))
        .bearer_auth(&admin)
        .json(&json!({ "userId": user_id, "questionId": q2["id"], "status": "right" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = client
        .get(&results_url)
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(body["results"][0]["score"], 11.0);
}

#[tokio::test]
async fn admin_edit_reaches_the_next_delivery() {
    let (address, state) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &address).await;
    let day = today(&state);
    let (user_id, token) = register_student(&client, &address, &state, "Asha").await;

    let q1 = create_question(
        &client,
        &address,
        &admin,
        json!({ "type": "mcq", "text": "Before", "options": ["a", "b"], "correctAnswer": 0, "date": day }),
    )
    .await;

    assert_eq!(first_question(&client, &address, &token, user_id).await["question"]["text"], "Before");

    let response = client
        .put(format!("{}/api/admin/questions/{}", address, q1["id"]))
        .bearer_auth(&admin)
        .json(&json!({ "type": "mcq", "text": "After", "options": ["a", "b"], "correctAnswer": 1, "date": day }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    assert_eq!(first_question(&client, &address, &token, user_id).await["question"]["text"], "After");

    let body: Value = client
        .get(format!("{}/api/admin/questions?date={}", address, day))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(body["totalQuestions"], 1);
    assert_eq!(body["questions"][0]["correctAnswer"], "1");

    let response = client
        .delete(format!("{}/api/admin/questions/{}", address, q1["id"]))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let body = first_question(&client, &address, &token, user_id).await;
    assert_eq!(body["error"], "No quiz found for today.");
}

#[tokio::test]
async fn attempt_requires_a_valid_time_taken() {
    let (address, state) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &address).await;
    let day = today(&state);
    let (user_id, token) = register_student(&client, &address, &state, "Asha").await;

    let q1 = create_question(
        &client,
        &address,
        &admin,
        json!({ "type": "mcq", "text": "Q1", "options": ["a", "b"], "correctAnswer": 0, "date": day }),
    )
    .await;
    first_question(&client, &address, &token, user_id).await;

    let missing = json!({ "userId": user_id, "questionId": q1["id"], "index": 0, "answer": 0 });
    let negative = json!({ "userId": user_id, "questionId": q1["id"], "index": 0, "answer": 0, "timeTaken": -500 });
    for body in [missing, negative] {
        let response = client
            .post(format!("{}/api/quiz/attempt", address))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 400);
    }

    let response = client
        .post(format!("{}/api/quiz/attempt", address))
        .bearer_auth(&token)
        .json(&json!({ "userId": user_id, "questionId": q1["id"], "index": 0, "answer": 0, "timeTaken": 4 }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Attempt recorded successfully.");
}
