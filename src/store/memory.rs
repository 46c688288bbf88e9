use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::{AdminStore, AttemptStore, QuestionStore, UserStore};
use crate::{
    error::AppError,
    models::{
        admin::{Admin, NewAdmin},
        attempt::{Attempt, NewAttempt, ResultRow, Verdict},
        question::{NewQuestion, Question, QuestionFilter, QuestionType},
        user::{NewUser, User},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    admins: Vec<Admin>,
    questions: Vec<Question>,
    attempts: Vec<Attempt>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local storage with the same contracts as [`super::PgStore`].
///
/// Every operation runs under one lock, which gives the (user, question)
/// uniqueness check the same atomicity the database constraint has.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::InternalServerError("memory store lock poisoned".to_string()))
    }
}

fn canonical_order(a: &Question, b: &Question) -> std::cmp::Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

fn matches_filter(q: &Question, filter: &QuestionFilter) -> bool {
    filter.question_type.is_none_or(|t| t == q.question_type)
        && filter.date.is_none_or(|d| d == q.date)
        && filter.search.as_ref().is_none_or(|s| {
            q.text.to_lowercase().contains(&s.to_lowercase())
        })
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn create_question(&self, new: NewQuestion) -> Result<Question, AppError> {
        let mut t = self.tables()?;
        let question = Question {
            id: t.next_id(),
            question_type: new.question_type,
            text: new.text,
            options: new.options,
            correct_answer: new.correct_answer,
            date: new.date,
            time_window: new.time_window,
            created_at: Utc::now(),
        };
        t.questions.push(question.clone());
        Ok(question)
    }

    async fn update_question(
        &self,
        id: i64,
        new: NewQuestion,
    ) -> Result<Option<Question>, AppError> {
        let mut t = self.tables()?;
        let Some(q) = t.questions.iter_mut().find(|q| q.id == id) else {
            return Ok(None);
        };
        q.question_type = new.question_type;
        q.text = new.text;
        q.options = new.options;
        q.correct_answer = new.correct_answer;
        q.date = new.date;
        q.time_window = new.time_window;
        Ok(Some(q.clone()))
    }

    async fn delete_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let mut t = self.tables()?;
        let Some(pos) = t.questions.iter().position(|q| q.id == id) else {
            return Ok(None);
        };
        Ok(Some(t.questions.remove(pos)))
    }

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        Ok(self.tables()?.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn find_questions(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        Ok(self
            .tables()?
            .questions
            .iter()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn questions_for_day(&self, day: NaiveDate) -> Result<Vec<Question>, AppError> {
        let mut list: Vec<Question> = self
            .tables()?
            .questions
            .iter()
            .filter(|q| q.date == day)
            .cloned()
            .collect();
        list.sort_by(canonical_order);
        Ok(list)
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<(Vec<Question>, i64), AppError> {
        let mut matched: Vec<Question> = self
            .tables()?
            .questions
            .iter()
            .filter(|q| matches_filter(q, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| canonical_order(b, a));

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn insert_attempt(&self, new: NewAttempt) -> Result<bool, AppError> {
        let mut t = self.tables()?;
        if t
            .attempts
            .iter()
            .any(|a| a.user_id == new.user_id && a.question_id == new.question_id)
        {
            return Ok(false);
        }
        let attempt = Attempt {
            id: t.next_id(),
            user_id: new.user_id,
            question_id: new.question_id,
            answer: new.answer,
            date: new.date,
            time_taken: new.time_taken,
            is_correct: new.is_correct,
            created_at: Utc::now(),
        };
        t.attempts.push(attempt);
        Ok(true)
    }

    async fn find_attempt(
        &self,
        user_id: i64,
        question_id: i64,
    ) -> Result<Option<Attempt>, AppError> {
        Ok(self
            .tables()?
            .attempts
            .iter()
            .find(|a| a.user_id == user_id && a.question_id == question_id)
            .cloned())
    }

    async fn attempts_for_user_day(
        &self,
        user_id: i64,
        day: NaiveDate,
    ) -> Result<Vec<Attempt>, AppError> {
        Ok(self
            .tables()?
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.date == day)
            .cloned()
            .collect())
    }

    async fn result_rows_for_day(&self, day: NaiveDate) -> Result<Vec<ResultRow>, AppError> {
        let t = self.tables()?;
        let rows = t
            .attempts
            .iter()
            .filter(|a| a.date == day)
            .filter_map(|a| {
                let user = t.users.iter().find(|u| u.id == a.user_id)?;
                let question = t.questions.iter().find(|q| q.id == a.question_id)?;
                Some(ResultRow {
                    user_id: a.user_id,
                    name: user.name.clone(),
                    question_type: question.question_type,
                    correct_answer: question.correct_answer.clone(),
                    time_window: question.time_window,
                    answer: a.answer.clone(),
                    time_taken: a.time_taken,
                    is_correct: a.is_correct,
                })
            })
            .collect();
        Ok(rows)
    }

    async fn set_verdict(
        &self,
        user_id: i64,
        question_id: i64,
        verdict: Verdict,
    ) -> Result<bool, AppError> {
        let mut t = self.tables()?;
        match t
            .attempts
            .iter_mut()
            .find(|a| a.user_id == user_id && a.question_id == question_id)
        {
            Some(attempt) => {
                attempt.is_correct = Some(verdict);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_pending(&self, day: NaiveDate) -> Result<i64, AppError> {
        let t = self.tables()?;
        Ok(t.attempts
            .iter()
            .filter(|a| a.date == day)
            .filter(|a| matches!(a.is_correct, None | Some(Verdict::Pending)))
            .filter(|a| {
                t.questions.iter().any(|q| {
                    q.id == a.question_id && q.question_type == QuestionType::Descriptive
                })
            })
            .count() as i64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        let mut t = self.tables()?;
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(AppError::Conflict(format!(
                "User '{}' already exists",
                new.email
            )));
        }
        let user = User {
            id: t.next_id(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            college: new.college,
            course: new.course,
            year: new.year,
            created_at: Utc::now(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .tables()?
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        Ok(self.tables()?.users.len() as i64)
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn create_admin(&self, new: NewAdmin) -> Result<Admin, AppError> {
        let mut t = self.tables()?;
        if t.admins.iter().any(|a| a.email == new.email) {
            return Err(AppError::Conflict("Admin already exists".to_string()));
        }
        let admin = Admin {
            id: t.next_id(),
            name: new.name,
            email: new.email,
            password: new.password,
            role: new.role,
            created_at: Utc::now(),
        };
        t.admins.push(admin.clone());
        Ok(admin)
    }

    async fn find_admin(&self, id: i64) -> Result<Option<Admin>, AppError> {
        Ok(self.tables()?.admins.iter().find(|a| a.id == id).cloned())
    }

    async fn find_admin_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Admin>, AppError> {
        Ok(self
            .tables()?
            .admins
            .iter()
            .find(|a| a.email == identifier || a.name == identifier)
            .cloned())
    }
}
