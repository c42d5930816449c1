use crate::error::Result;
use crate::models::question::Question;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

/// Row store for generated questions and the agent system prompts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Highest persisted `order` for `topic`, if any question exists.
    async fn last_order(&self, topic: i64) -> Result<Option<i64>>;

    /// Appends one question and returns it with its assigned id.
    async fn insert_question(&self, question: &Question) -> Result<Question>;

    /// System prompt stored for an agent destination such as `generate_question`.
    async fn agent_instructions(&self, destination: &str) -> Result<Option<String>>;
}

#[derive(Clone)]
pub struct PgQuestionStore {
    pool: PgPool,
}

impl PgQuestionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionStore for PgQuestionStore {
    async fn last_order(&self, topic: i64) -> Result<Option<i64>> {
        let row = sqlx::query(
            r#"SELECT "order" FROM questions WHERE topic = $1 ORDER BY "order" DESC LIMIT 1"#,
        )
        .bind(topic)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(row.try_get::<Option<i64>, _>("order")?),
            None => Ok(None),
        }
    }

    async fn insert_question(&self, question: &Question) -> Result<Question> {
        let created_at = question.created_at.unwrap_or_else(Utc::now);
        let row = sqlx::query(
            r#"
            INSERT INTO questions (
                academy, topic, question, answer1, answer2, answer3, answer4,
                solution, tip, "order", question_prompt, llm_model, by_llm, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, true, $13)
            RETURNING id, created_at
            "#,
        )
        .bind(question.academy)
        .bind(question.topic)
        .bind(&question.question)
        .bind(&question.answer1)
        .bind(&question.answer2)
        .bind(&question.answer3)
        .bind(&question.answer4)
        .bind(question.solution)
        .bind(&question.tip)
        .bind(question.order)
        .bind(&question.question_prompt)
        .bind(&question.llm_model)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        let mut saved = question.clone();
        saved.id = Some(row.try_get::<i64, _>("id")?);
        saved.created_at = Some(row.try_get::<DateTime<Utc>, _>("created_at")?);
        Ok(saved)
    }

    async fn agent_instructions(&self, destination: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            r#"SELECT prompt_system FROM gpt_prompts WHERE destination = $1 LIMIT 1"#,
        )
        .bind(destination)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(row
                .try_get::<Option<String>, _>("prompt_system")?
                .filter(|p| !p.trim().is_empty())),
            None => Ok(None),
        }
    }
}
