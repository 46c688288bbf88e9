//! Persistent storage behind async traits.
//!
//! `PgStore` is the production implementation; `MemoryStore` backs tests and
//! local runs. Both return a day's questions in the canonical order
//! `(created_at ASC, id ASC)`, which is what index addressing relies on.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::AppError,
    models::{
        admin::{Admin, NewAdmin},
        attempt::{Attempt, NewAttempt, ResultRow, Verdict},
        question::{NewQuestion, Question, QuestionFilter},
        user::{NewUser, User},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn create_question(&self, new: NewQuestion) -> Result<Question, AppError>;

    /// Full replacement of an existing question. `None` when the id is unknown.
    async fn update_question(&self, id: i64, new: NewQuestion)
    -> Result<Option<Question>, AppError>;

    /// Returns the deleted question, `None` when the id is unknown.
    async fn delete_question(&self, id: i64) -> Result<Option<Question>, AppError>;

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError>;

    async fn find_questions(&self, ids: &[i64]) -> Result<Vec<Question>, AppError>;

    /// All questions of `day` in canonical order.
    async fn questions_for_day(&self, day: NaiveDate) -> Result<Vec<Question>, AppError>;

    /// Newest first. Returns the page and the total number of matches.
    async fn list_questions(&self, filter: &QuestionFilter)
    -> Result<(Vec<Question>, i64), AppError>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Inserts unless the (user, question) pair already has an attempt.
    /// Returns `true` when a row was written.
    async fn insert_attempt(&self, new: NewAttempt) -> Result<bool, AppError>;

    async fn find_attempt(&self, user_id: i64, question_id: i64)
    -> Result<Option<Attempt>, AppError>;

    /// In submission order.
    async fn attempts_for_user_day(
        &self,
        user_id: i64,
        day: NaiveDate,
    ) -> Result<Vec<Attempt>, AppError>;

    /// Every attempt of `day` joined with user name and question answer key.
    async fn result_rows_for_day(&self, day: NaiveDate) -> Result<Vec<ResultRow>, AppError>;

    /// Stores the verdict of the (user, question) attempt. `false` when no such
    /// attempt. Callers check that the question is descriptive.
    async fn set_verdict(
        &self,
        user_id: i64,
        question_id: i64,
        verdict: Verdict,
    ) -> Result<bool, AppError>;

    /// Unmarked attempts of `day` on questions that are descriptive now.
    async fn count_pending(&self, day: NaiveDate) -> Result<i64, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `AppError::Conflict` when the email is taken.
    async fn create_user(&self, new: NewUser) -> Result<User, AppError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn count_users(&self) -> Result<i64, AppError>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    /// `AppError::Conflict` when the email is taken.
    async fn create_admin(&self, new: NewAdmin) -> Result<Admin, AppError>;

    async fn find_admin(&self, id: i64) -> Result<Option<Admin>, AppError>;

    /// Matches either the email or the name.
    async fn find_admin_by_identifier(&self, identifier: &str)
    -> Result<Option<Admin>, AppError>;
}
