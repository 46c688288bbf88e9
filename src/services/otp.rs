//! Emailed one-time codes for student sign-up and sign-in.

use std::time::Duration;

use argon2::password_hash::rand_core::{OsRng, RngCore};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    cache::{otp_attempts_key, otp_key},
    error::AppError,
    state::AppState,
};

pub const OTP_TTL: Duration = Duration::from_secs(5 * 60);
/// Wrong guesses allowed against one code before it is discarded.
pub const MAX_OTP_ATTEMPTS: i64 = 5;

pub const OTP_EXPIRED: &str = "No OTP sent or expired";
pub const OTP_INVALID: &str = "Invalid OTP";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Register,
    Login,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Register => "register",
            OtpPurpose::Login => "login",
        }
    }
}

/// Delivers codes to students.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(&self, email: &str, code: &str, purpose: OtpPurpose)
    -> Result<(), AppError>;
}

/// Writes codes to the log instead of sending mail. Used when no mail
/// transport is configured.
pub struct LogMailer;

#[async_trait]
impl OtpMailer for LogMailer {
    async fn send_otp(
        &self,
        email: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), AppError> {
        info!("OTP for {} ({}): {}", email, purpose.as_str(), code);
        Ok(())
    }
}

fn generate_code() -> String {
    format!("{:06}", OsRng.next_u32() % 1_000_000)
}

/// Creates a fresh code for `email`, replacing any earlier one, and mails it.
pub async fn issue_otp(state: &AppState, email: &str, purpose: OtpPurpose) -> Result<(), AppError> {
    let code = generate_code();
    state
        .cache
        .set(&otp_key(purpose.as_str(), email), &code, Some(OTP_TTL))
        .await?;
    state
        .cache
        .invalidate(&otp_attempts_key(purpose.as_str(), email))
        .await?;
    state.mailer.send_otp(email, &code, purpose).await
}

/// Checks and consumes the code.
///
/// A code can be used once, even by concurrent requests. After
/// [`MAX_OTP_ATTEMPTS`] wrong guesses it is discarded and a new one must be
/// requested.
pub async fn verify_otp(
    state: &AppState,
    email: &str,
    code: &str,
    purpose: OtpPurpose,
) -> Result<(), AppError> {
    let key = otp_key(purpose.as_str(), email);
    let attempts_key = otp_attempts_key(purpose.as_str(), email);
    let stored = state
        .cache
        .get(&key)
        .await?
        .ok_or_else(|| AppError::BadRequest(OTP_EXPIRED.to_string()))?;

    if stored != code.trim() {
        let failures = state.cache.increment(&attempts_key, OTP_TTL).await?;
        if failures >= MAX_OTP_ATTEMPTS {
            state.cache.invalidate(&key).await?;
            warn!(
                "Discarded {} OTP for {} after {} wrong attempts",
                purpose.as_str(),
                email,
                failures
            );
        }
        return Err(AppError::BadRequest(OTP_INVALID.to_string()));
    }

    // Whoever removes the code first wins; the rest see it as used.
    match state.cache.take(&key).await? {
        Some(taken) if taken == stored => {}
        _ => return Err(AppError::BadRequest(OTP_EXPIRED.to_string())),
    }
    state.cache.invalidate(&attempts_key).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
