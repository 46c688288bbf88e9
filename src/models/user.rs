// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Represents the 'users' table in the database.
/// Students sign in with an emailed one-time code, so there is no password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub college: Option<String>,
    pub course: Option<String>,
    pub year: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub college: Option<String>,
    pub course: Option<String>,
    pub year: Option<String>,
}

/// DTO for requesting a one-time code.
#[derive(Debug, Deserialize, Validate)]
pub struct OtpRequest {
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
}

/// DTO for creating a new student (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
    #[validate(length(min = 5, max = 20, message = "Phone number is invalid."))]
    pub phone: String,
    #[validate(length(max = 200))]
    pub college: Option<String>,
    #[validate(length(max = 100))]
    pub course: Option<String>,
    #[validate(length(max = 20))]
    pub year: Option<String>,
    #[validate(length(equal = 6, message = "OTP must be 6 digits."))]
    pub otp: String,
}

impl RegisterRequest {
    pub fn new_user(&self) -> NewUser {
        NewUser {
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            phone: self.phone.trim().to_string(),
            college: self.college.clone(),
            course: self.course.clone(),
            year: self.year.clone(),
        }
    }
}

/// DTO for student login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits."))]
    pub otp: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
