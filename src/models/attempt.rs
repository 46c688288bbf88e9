// src/models/attempt.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::question::{AnswerValue, QuestionType},
};

/// Correctness of an answer. Stored only for descriptive attempts; MCQ
/// correctness is derived on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pending,
    Right,
    Wrong,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pending => "pending",
            Verdict::Right => "right",
            Verdict::Wrong => "wrong",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "p" => Ok(Verdict::Pending),
            "right" | "r" => Ok(Verdict::Right),
            "wrong" | "w" => Ok(Verdict::Wrong),
            other => Err(AppError::BadRequest(format!("Unknown status '{}'", other))),
        }
    }
}

/// Represents the 'attempts' table in the database.
/// One row per (user, question); the ledger never holds a second one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    /// Empty when the student ran out of time.
    pub answer: String,
    pub date: NaiveDate,
    pub time_taken: f64,
    pub is_correct: Option<Verdict>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: i64,
    pub question_id: i64,
    pub answer: String,
    pub date: NaiveDate,
    pub time_taken: f64,
    pub is_correct: Option<Verdict>,
}

/// One attempt joined with its user's name and its question's answer key.
/// Input row for the results aggregation.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub user_id: i64,
    pub name: String,
    pub question_type: QuestionType,
    pub correct_answer: Option<String>,
    pub time_window: i32,
    pub answer: String,
    pub time_taken: f64,
    pub is_correct: Option<Verdict>,
}

/// DTO for fetching today's question by index.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayQuestionRequest {
    pub user_id: Option<i64>,
    pub index: Option<i64>,
}

/// DTO for submitting an answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    pub user_id: Option<i64>,
    pub question_id: Option<i64>,
    pub answer: Option<AnswerValue>,
    pub time_taken: Option<f64>,
    pub index: Option<i64>,
}

/// One reviewed question in a student's day summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub question_id: i64,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    pub user_answer: String,
    pub correct_answer: Option<String>,
    pub status: Verdict,
}

/// One row of the ranked admin results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResult {
    pub user_id: i64,
    pub name: String,
    pub score: f64,
    pub percentage: f64,
    pub total_questions: usize,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsPage {
    pub date: NaiveDate,
    pub results: Vec<RankedResult>,
    pub total_results: usize,
    pub current_page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Deserialize)]
pub struct ResultsParams {
    pub date: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewAnswersParams {
    pub date: Option<String>,
    pub user_id: Option<i64>,
}

/// A student's answer expanded with the full question, for admin review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    pub question_id: i64,
    pub question_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    pub user_answer: String,
    pub correct_answer: Option<String>,
    pub is_correct: Verdict,
    pub time_taken: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnswers {
    pub date: NaiveDate,
    pub user_id: i64,
    pub name: String,
    pub answers: Vec<AnswerDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkDescriptiveRequest {
    pub user_id: Option<i64>,
    pub question_id: Option<i64>,
    pub status: Option<String>,
}
