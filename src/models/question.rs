// src/models/question.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{error::AppError, utils::time::parse_day};

pub const DEFAULT_TIME_WINDOW: i32 = 20;
pub const MIN_TIME_WINDOW: i32 = 5;
pub const MAX_TIME_WINDOW: i32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Descriptive,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Descriptive => "descriptive",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcq" => Ok(QuestionType::Mcq),
            "descriptive" => Ok(QuestionType::Descriptive),
            other => Err(AppError::BadRequest(format!(
                "Unknown question type '{}'",
                other
            ))),
        }
    }
}

/// A quiz question as stored and as cached for its day.
///
/// The cached day list serializes this struct verbatim, so `correct_answer`
/// is present here and must be stripped (see [`PublicQuestion`]) before a
/// question reaches a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    pub text: String,

    /// Ordered choices; empty for descriptive questions.
    #[serde(default)]
    pub options: Vec<String>,

    /// MCQ: the index of the right option, as a string.
    /// Descriptive: an optional reference answer.
    pub correct_answer: Option<String>,

    /// Quiz day this question belongs to.
    pub date: NaiveDate,

    /// Seconds allowed to answer.
    pub time_window: i32,

    pub created_at: DateTime<Utc>,
}

/// DTO for sending a question to a student (no answer key).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub options: Vec<String>,
    pub date: NaiveDate,
    pub time_window: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question_type: q.question_type,
            text: q.text.clone(),
            options: q.options.clone(),
            date: q.date,
            time_window: q.time_window,
        }
    }
}

/// A validated question ready to be written to storage.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_type: QuestionType,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    pub date: NaiveDate,
    pub time_window: i32,
}

/// Clients send MCQ answers as numbers and free text as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl AnswerValue {
    pub fn into_string(self) -> String {
        match self {
            AnswerValue::Int(n) => n.to_string(),
            AnswerValue::Float(n) => n.to_string(),
            AnswerValue::Text(s) => s,
        }
    }
}

/// DTO for creating or editing a question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 20))]
    pub question_type: String,
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<AnswerValue>,
    #[validate(length(min = 1, max = 10))]
    pub date: String,
    #[validate(range(min = MIN_TIME_WINDOW, max = MAX_TIME_WINDOW))]
    pub time_window: Option<i32>,
}

impl QuestionPayload {
    /// Applies the per-type rules on top of the field validation.
    pub fn into_new_question(self) -> Result<NewQuestion, AppError> {
        self.validate()?;

        let question_type: QuestionType = self.question_type.parse()?;
        let date = parse_day(&self.date)?;
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::BadRequest("Question text is required".to_string()));
        }

        let (options, correct_answer) = match question_type {
            QuestionType::Mcq => {
                let options = self.options.unwrap_or_default();
                if options.len() < 2 {
                    return Err(AppError::BadRequest(
                        "MCQ must have at least 2 options".to_string(),
                    ));
                }
                let index = self
                    .correct_answer
                    .map(AnswerValue::into_string)
                    .and_then(|raw| raw.trim().parse::<usize>().ok())
                    .filter(|i| *i < options.len())
                    .ok_or_else(|| {
                        AppError::BadRequest("Invalid correct answer index".to_string())
                    })?;
                (options, Some(index.to_string()))
            }
            QuestionType::Descriptive => {
                let reference = self
                    .correct_answer
                    .map(AnswerValue::into_string)
                    .filter(|s| !s.trim().is_empty());
                (Vec::new(), reference)
            }
        };

        Ok(NewQuestion {
            question_type,
            text,
            options,
            correct_answer,
            date,
            time_window: self.time_window.unwrap_or(DEFAULT_TIME_WINDOW),
        })
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// Query parameters for the admin question list.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "type")]
    pub question_type: Option<String>,
    pub search: Option<String>,
    pub date: Option<String>,
}

/// Storage-level filter built from [`QuestionListParams`].
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    pub question_type: Option<QuestionType>,
    pub search: Option<String>,
    pub date: Option<NaiveDate>,
    pub offset: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(kind: &str, options: Option<Vec<&str>>, answer: Option<AnswerValue>) -> QuestionPayload {
        QuestionPayload {
            question_type: kind.to_string(),
            text: "What is 2 + 2?".to_string(),
            options: options.map(|o| o.into_iter().map(String::from).collect()),
            correct_answer: answer,
            date: "2025-01-15".to_string(),
            time_window: None,
        }
    }

    #[test]
    fn mcq_answer_is_stored_as_canonical_index() {
        let q = payload("mcq", Some(vec!["3", "4"]), Some(AnswerValue::Text(" 1 ".into())))
            .into_new_question()
            .unwrap();
        assert_eq!(q.correct_answer.as_deref(), Some("1"));
        assert_eq!(q.time_window, DEFAULT_TIME_WINDOW);
    }

    #[test]
    fn mcq_rejects_out_of_range_answer() {
        let err = payload("mcq", Some(vec!["3", "4"]), Some(AnswerValue::Int(2)))
            .into_new_question()
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn mcq_needs_two_options() {
        let err = payload("mcq", Some(vec!["only"]), Some(AnswerValue::Int(0)))
            .into_new_question()
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn descriptive_drops_options() {
        let q = payload("descriptive", Some(vec!["x", "y"]), None)
            .into_new_question()
            .unwrap();
        assert!(q.options.is_empty());
        assert_eq!(q.correct_answer, None);
    }

    #[test]
    fn time_window_is_bounded() {
        let mut p = payload("descriptive", None, None);
        p.time_window = Some(121);
        assert!(p.into_new_question().is_err());
    }
}
