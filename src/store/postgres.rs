use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};

use super::{AdminStore, AttemptStore, QuestionStore, UserStore};
use crate::{
    error::AppError,
    models::{
        admin::{Admin, NewAdmin},
        attempt::{Attempt, NewAttempt, ResultRow, Verdict},
        question::{NewQuestion, Question, QuestionFilter},
        user::{NewUser, User},
    },
};

/// PostgreSQL implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw 'questions' row. `type` is a reserved keyword in Rust.
#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    #[sqlx(rename = "type")]
    question_type: String,
    text: String,
    options: Json<Vec<String>>,
    correct_answer: Option<String>,
    quiz_date: NaiveDate,
    time_window: i32,
    created_at: DateTime<Utc>,
}

impl QuestionRow {
    fn into_question(self) -> Result<Question, AppError> {
        Ok(Question {
            id: self.id,
            question_type: self.question_type.parse().map_err(corrupt)?,
            text: self.text,
            options: self.options.0,
            correct_answer: self.correct_answer,
            date: self.quiz_date,
            time_window: self.time_window,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct AttemptRow {
    id: i64,
    user_id: i64,
    question_id: i64,
    answer: String,
    quiz_date: NaiveDate,
    time_taken: f64,
    is_correct: Option<String>,
    created_at: DateTime<Utc>,
}

impl AttemptRow {
    fn into_attempt(self) -> Result<Attempt, AppError> {
        Ok(Attempt {
            id: self.id,
            user_id: self.user_id,
            question_id: self.question_id,
            answer: self.answer,
            date: self.quiz_date,
            time_taken: self.time_taken,
            is_correct: parse_verdict(self.is_correct)?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ResultRecord {
    user_id: i64,
    name: String,
    question_type: String,
    correct_answer: Option<String>,
    time_window: i32,
    answer: String,
    time_taken: f64,
    is_correct: Option<String>,
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    phone: String,
    college: Option<String>,
    course: Option<String>,
    year: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            college: row.college,
            course: row.course,
            year: row.year,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AdminRow {
    id: i64,
    name: String,
    email: String,
    password: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl AdminRow {
    fn into_admin(self) -> Result<Admin, AppError> {
        Ok(Admin {
            id: self.id,
            name: self.name,
            email: self.email,
            password: self.password,
            role: self.role.parse().map_err(corrupt)?,
            created_at: self.created_at,
        })
    }
}

/// A value the schema should never have let through.
fn corrupt(err: AppError) -> AppError {
    AppError::InternalServerError(format!("Corrupt row: {}", err))
}

fn parse_verdict(raw: Option<String>) -> Result<Option<Verdict>, AppError> {
    raw.map(|s| s.parse::<Verdict>())
        .transpose()
        .map_err(corrupt)
}

/// Postgres error code for unique violation is 23505.
fn unique_violation(err: sqlx::Error, message: String) -> AppError {
    if err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        AppError::Conflict(message)
    } else {
        tracing::error!("Database error: {:?}", err);
        AppError::from(err)
    }
}

fn push_question_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &QuestionFilter) {
    if let Some(question_type) = filter.question_type {
        builder.push(" AND type = ").push_bind(question_type.as_str());
    }
    if let Some(search) = &filter.search {
        builder
            .push(" AND text ILIKE ")
            .push_bind(format!("%{}%", search));
    }
    if let Some(day) = filter.date {
        builder.push(" AND quiz_date = ").push_bind(day);
    }
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn create_question(&self, new: NewQuestion) -> Result<Question, AppError> {
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            INSERT INTO questions (type, text, options, correct_answer, quiz_date, time_window)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, type, text, options, correct_answer, quiz_date, time_window, created_at
            "#,
        )
        .bind(new.question_type.as_str())
        .bind(&new.text)
        .bind(Json(&new.options))
        .bind(&new.correct_answer)
        .bind(new.date)
        .bind(new.time_window)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create question: {:?}", e);
            AppError::from(e)
        })?;

        row.into_question()
    }

    async fn update_question(
        &self,
        id: i64,
        new: NewQuestion,
    ) -> Result<Option<Question>, AppError> {
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            UPDATE questions
            SET type = $2, text = $3, options = $4, correct_answer = $5,
                quiz_date = $6, time_window = $7, updated_at = now()
            WHERE id = $1
            RETURNING id, type, text, options, correct_answer, quiz_date, time_window, created_at
            "#,
        )
        .bind(id)
        .bind(new.question_type.as_str())
        .bind(&new.text)
        .bind(Json(&new.options))
        .bind(&new.correct_answer)
        .bind(new.date)
        .bind(new.time_window)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update question: {:?}", e);
            AppError::from(e)
        })?;

        row.map(QuestionRow::into_question).transpose()
    }

    async fn delete_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            DELETE FROM questions
            WHERE id = $1
            RETURNING id, type, text, options, correct_answer, quiz_date, time_window, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::from(e)
        })?;

        row.map(QuestionRow::into_question).transpose()
    }

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, type, text, options, correct_answer, quiz_date, time_window, created_at
            FROM questions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuestionRow::into_question).transpose()
    }

    async fn find_questions(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, type, text, options, correct_answer, quiz_date, time_window, created_at
            FROM questions
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QuestionRow::into_question).collect()
    }

    async fn questions_for_day(&self, day: NaiveDate) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, type, text, options, correct_answer, quiz_date, time_window, created_at
            FROM questions
            WHERE quiz_date = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load questions for {}: {:?}", day, e);
            AppError::from(e)
        })?;

        rows.into_iter().map(QuestionRow::into_question).collect()
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<(Vec<Question>, i64), AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM questions WHERE TRUE");
        push_question_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(
            "SELECT id, type, text, options, correct_answer, quiz_date, time_window, created_at \
             FROM questions WHERE TRUE",
        );
        push_question_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows: Vec<QuestionRow> = select.build_query_as().fetch_all(&self.pool).await?;
        let questions = rows
            .into_iter()
            .map(QuestionRow::into_question)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((questions, total))
    }
}

#[async_trait]
impl AttemptStore for PgStore {
    async fn insert_attempt(&self, new: NewAttempt) -> Result<bool, AppError> {
        // The unique (user_id, question_id) constraint is the re-entry guard;
        // concurrent duplicates collapse into a no-op here.
        let result = sqlx::query(
            r#"
            INSERT INTO attempts (user_id, question_id, answer, quiz_date, time_taken, is_correct)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, question_id) DO NOTHING
            "#,
        )
        .bind(new.user_id)
        .bind(new.question_id)
        .bind(&new.answer)
        .bind(new.date)
        .bind(new.time_taken)
        .bind(new.is_correct.map(|v| v.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert attempt: {:?}", e);
            AppError::from(e)
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_attempt(
        &self,
        user_id: i64,
        question_id: i64,
    ) -> Result<Option<Attempt>, AppError> {
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT id, user_id, question_id, answer, quiz_date, time_taken, is_correct, created_at
            FROM attempts
            WHERE user_id = $1 AND question_id = $2
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AttemptRow::into_attempt).transpose()
    }

    async fn attempts_for_user_day(
        &self,
        user_id: i64,
        day: NaiveDate,
    ) -> Result<Vec<Attempt>, AppError> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT id, user_id, question_id, answer, quiz_date, time_taken, is_correct, created_at
            FROM attempts
            WHERE user_id = $1 AND quiz_date = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AttemptRow::into_attempt).collect()
    }

    async fn result_rows_for_day(&self, day: NaiveDate) -> Result<Vec<ResultRow>, AppError> {
        let rows = sqlx::query_as::<_, ResultRecord>(
            r#"
            SELECT
                a.user_id,
                u.name,
                q.type AS question_type,
                q.correct_answer,
                q.time_window,
                a.answer,
                a.time_taken,
                a.is_correct
            FROM attempts a
            JOIN users u ON u.id = a.user_id
            JOIN questions q ON q.id = a.question_id
            WHERE a.quiz_date = $1
            "#,
        )
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch results for {}: {:?}", day, e);
            AppError::from(e)
        })?;

        rows.into_iter()
            .map(|r| -> Result<ResultRow, AppError> {
                Ok(ResultRow {
                    user_id: r.user_id,
                    name: r.name,
                    question_type: r.question_type.parse().map_err(corrupt)?,
                    correct_answer: r.correct_answer,
                    time_window: r.time_window,
                    answer: r.answer,
                    time_taken: r.time_taken,
                    is_correct: parse_verdict(r.is_correct)?,
                })
            })
            .collect()
    }

    async fn set_verdict(
        &self,
        user_id: i64,
        question_id: i64,
        verdict: Verdict,
    ) -> Result<bool, AppError> {
        // Callers check the question's current type.
        let result = sqlx::query(
            r#"
            UPDATE attempts
            SET is_correct = $3
            WHERE user_id = $1 AND question_id = $2
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .bind(verdict.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_pending(&self, day: NaiveDate) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM attempts a
            JOIN questions q ON q.id = a.question_id
            WHERE a.quiz_date = $1
              AND q.type = 'descriptive'
              AND (a.is_correct IS NULL OR a.is_correct = 'pending')
            "#,
        )
        .bind(day)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, email, phone, college, course, year)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, phone, college, course, year, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.college)
        .bind(&new.course)
        .bind(&new.year)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, format!("User '{}' already exists", new.email)))?;

        Ok(row.into())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, phone, college, course, year, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, phone, college, course, year, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl AdminStore for PgStore {
    async fn create_admin(&self, new: NewAdmin) -> Result<Admin, AppError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"
            INSERT INTO admins (name, email, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password, role, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "Admin already exists".to_string()))?;

        row.into_admin()
    }

    async fn find_admin(&self, id: i64) -> Result<Option<Admin>, AppError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, name, email, password, role, created_at FROM admins WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AdminRow::into_admin).transpose()
    }

    async fn find_admin_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Admin>, AppError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"
            SELECT id, name, email, password, role, created_at
            FROM admins
            WHERE email = $1 OR name = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AdminRow::into_admin).transpose()
    }
}
