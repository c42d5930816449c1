#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use quiz_forge::{
    dto::generation_dto::GenerationDefaults,
    error::{Error, Result},
    middleware::auth::{Claims, JwtAuth, AUDIENCE},
    models::question::Question,
    routes,
    services::{
        llm_service::{AgentRole, AgentRunner, ReasoningEffort, TextCompleter},
        question_service::QuestionService,
        question_store::QuestionStore,
    },
    AppState,
};
use serde_json::{json, Value as JsonValue};
use std::sync::{Arc, Mutex};

pub const SECRET: &str = "integration-secret";

/// Answers every agent role with well-formed output sized from the prompt.
pub struct FakeAgent {
    pub fail_generation: bool,
}

fn number_after(prompt: &str, marker: &str) -> usize {
    prompt
        .split(marker)
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl AgentRunner for FakeAgent {
    async fn run(&self, role: AgentRole, prompt: &str, _model: Option<&str>) -> Result<JsonValue> {
        match role {
            AgentRole::Chunker => Ok(json!({"chunks": ["only chunk"]})),
            AgentRole::QuestionWriter if self.fail_generation => {
                Err(Error::Llm("provider unavailable".into()))
            }
            AgentRole::QuestionWriter => {
                let n = number_after(prompt, "Generate ");
                let items: Vec<JsonValue> = (0..n)
                    .map(|i| {
                        json!({
                            "question": format!("Question {}", i),
                            "answer1": "one", "answer2": "two", "answer3": "three",
                            "answer4": null,
                            "solution": 2,
                            "tip": ""
                        })
                    })
                    .collect();
                Ok(json!({ "questions": items }))
            }
            AgentRole::FeedbackWriter => {
                let n = number_after(prompt, "these ");
                let feedbacks: Vec<String> = (0..n).map(|i| format!("because {}", i)).collect();
                Ok(json!({ "feedbacks": feedbacks }))
            }
        }
    }
}

pub struct FakeCompleter;

#[async_trait]
impl TextCompleter for FakeCompleter {
    async fn complete(
        &self,
        instructions: &str,
        input: &str,
        model: &str,
        effort: ReasoningEffort,
    ) -> Result<String> {
        Ok(format!("{}|{}|{}|{}", instructions, input, model, effort.as_str()))
    }
}

/// Row store kept in memory.
#[derive(Default)]
pub struct InMemoryStore {
    pub rows: Mutex<Vec<Question>>,
    pub seed_last_order: Option<i64>,
    pub broken: bool,
}

#[async_trait]
impl QuestionStore for InMemoryStore {
    async fn last_order(&self, topic: i64) -> Result<Option<i64>> {
        if self.broken {
            return Err(Error::Internal("store offline".into()));
        }
        let rows = self.rows.lock().unwrap();
        let persisted = rows.iter().filter(|q| q.topic == topic).map(|q| q.order).max();
        Ok(persisted.or(self.seed_last_order))
    }

    async fn insert_question(&self, question: &Question) -> Result<Question> {
        let mut rows = self.rows.lock().unwrap();
        let mut saved = question.clone();
        saved.id = Some(rows.len() as i64 + 1);
        rows.push(saved.clone());
        Ok(saved)
    }

    async fn agent_instructions(&self, _destination: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

pub fn defaults() -> GenerationDefaults {
    GenerationDefaults {
        llm_model: "gpt-5-2025-08-07".into(),
        batch_size: 3,
        max_questions_per_request: 10,
        rag_enabled: false,
    }
}

pub fn app(agent: FakeAgent, store: Arc<InMemoryStore>) -> Router {
    let service = QuestionService::new(Arc::new(agent), store);
    let state = AppState::from_parts(service, Arc::new(FakeCompleter), defaults());
    routes::router(state, JwtAuth::new(SECRET), 1000)
}

pub fn bearer() -> String {
    let claims = Claims {
        sub: "tester".into(),
        exp: (chrono::Utc::now().timestamp() + 600) as usize,
        aud: Some(AUDIENCE.into()),
        role: None,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}
