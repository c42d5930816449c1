pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::dto::generation_dto::GenerationDefaults;
use crate::error::{Error, Result};
use crate::services::{
    embed_service::{dimension_for, EmbedService},
    llm_service::{LlmService, TextCompleter},
    question_service::QuestionService,
    question_store::{PgQuestionStore, QuestionStore},
    rag_service::RagService,
    vector_search_service::PgVectorSearch,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub question_service: QuestionService,
    pub completer: Arc<dyn TextCompleter>,
    pub defaults: GenerationDefaults,
}

impl AppState {
    pub fn new(pool: PgPool) -> Result<Self> {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let store: Arc<dyn QuestionStore> = Arc::new(PgQuestionStore::new(pool.clone()));
        let llm = Arc::new(
            LlmService::new(
                config.openai_api_key.clone(),
                http_client.clone(),
                config.openai_base_url.clone(),
            )?
            .with_agent_model(config.agent_model.clone())
            .with_max_retries(config.llm_max_retries)
            .with_timeout(Duration::from_secs(config.llm_timeout_secs))
            .with_prompt_store(Arc::clone(&store)),
        );

        let mut question_service = QuestionService::new(llm.clone(), store)
            .with_feedback_merge(config.feedback_merge);
        if config.rag_enabled {
            let embedder = EmbedService::new(
                config.openai_api_key.clone(),
                http_client,
                config.openai_base_url.clone(),
                config.embedding_model.clone(),
            )?;
            tracing::info!(
                model = embedder.model(),
                dimension = dimension_for(embedder.model()),
                top_k = config.rag_top_k,
                "Context enrichment enabled"
            );
            let rag = RagService::new(Arc::new(embedder), Arc::new(PgVectorSearch::new(pool)))
                .with_min_similarity(config.rag_min_similarity);
            question_service = question_service.with_rag(rag, config.rag_top_k);
        }

        let defaults = GenerationDefaults {
            llm_model: config.default_llm_model.clone(),
            batch_size: config.batch_size,
            max_questions_per_request: config.max_questions_per_request,
            rag_enabled: config.rag_enabled,
        };

        Ok(Self::from_parts(question_service, llm, defaults))
    }

    /// Assembles the state from already-built services.
    pub fn from_parts(
        question_service: QuestionService,
        completer: Arc<dyn TextCompleter>,
        defaults: GenerationDefaults,
    ) -> Self {
        Self {
            question_service,
            completer,
            defaults,
        }
    }
}
