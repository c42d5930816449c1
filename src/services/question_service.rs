use crate::config::FeedbackMerge;
use crate::error::{Error, Result};
use crate::models::generation_request::GenerationRequest;
use crate::models::question::Question;
use crate::services::chunk_service::ChunkService;
use crate::services::feedback_service::FeedbackService;
use crate::services::llm_service::AgentRunner;
use crate::services::question_generator::{QuestionBatchRequest, QuestionGenerator};
use crate::services::question_store::QuestionStore;
use crate::services::rag_service::RagService;
use std::sync::Arc;

/// Runs one generation request end to end:
/// enrich, chunk, generate, then feedback.
#[derive(Clone)]
pub struct QuestionService {
    store: Arc<dyn QuestionStore>,
    chunker: ChunkService,
    generator: QuestionGenerator,
    feedback: FeedbackService,
    rag: Option<RagService>,
    rag_top_k: usize,
}

impl QuestionService {
    pub fn new(agent: Arc<dyn AgentRunner>, store: Arc<dyn QuestionStore>) -> Self {
        Self {
            store,
            chunker: ChunkService::new(Arc::clone(&agent)),
            generator: QuestionGenerator::new(Arc::clone(&agent)),
            feedback: FeedbackService::new(agent),
            rag: None,
            rag_top_k: 5,
        }
    }

    /// Enables context enrichment for requests that ask for it.
    pub fn with_rag(mut self, rag: RagService, top_k: usize) -> Self {
        self.rag = Some(rag);
        self.rag_top_k = top_k;
        self
    }

    pub fn with_feedback_merge(mut self, merge: FeedbackMerge) -> Self {
        self.feedback = self.feedback.with_merge(merge);
        self
    }

    pub fn rag_enabled(&self) -> bool {
        self.rag.is_some()
    }

    /// Generates `num_of_q` questions with tips.
    ///
    /// Worker failures only shorten the result. Anything else that goes wrong
    /// comes back as [`Error::Generation`].
    pub async fn generate_questions_and_feedback(
        &self,
        req: &GenerationRequest,
    ) -> Result<Vec<Question>> {
        self.run_pipeline(req).await.map_err(|e| {
            tracing::error!(topic = req.topic, academy = req.academy, error = %e, "Question generation failed");
            Error::Generation(e.to_string())
        })
    }

    /// Appends the questions to the row store in list order.
    pub async fn persist(&self, questions: &[Question]) -> Result<Vec<Question>> {
        let mut saved = Vec::with_capacity(questions.len());
        for question in questions {
            saved.push(self.store.insert_question(question).await?);
        }
        tracing::info!(count = saved.len(), "Questions persisted");
        Ok(saved)
    }

    async fn run_pipeline(&self, req: &GenerationRequest) -> Result<Vec<Question>> {
        let mut context = req
            .context
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(str::to_string);

        if let Some(rag) = self.rag.as_ref().filter(|_| req.use_rag) {
            if let Some(ctx) = context.take() {
                context = Some(rag.enrich(&ctx, req.topic, req.academy, self.rag_top_k).await);
            }
        }

        let chunked = self
            .chunker
            .chunk(context.as_deref(), req.max_tokens_per_chunk, req.batch_size)
            .await;
        let used_chunks = chunked.used && !chunked.chunks.is_empty();
        if chunked.used && !used_chunks {
            tracing::warn!(topic = req.topic, "Chunking produced nothing, generating from the prompt only");
        }

        let start_order = self.store.last_order(req.topic).await?.unwrap_or(0) + 1;
        tracing::debug!(topic = req.topic, start_order, "Order sequence seeded");

        let questions = self
            .generator
            .generate(&QuestionBatchRequest {
                prompt: &req.prompt,
                chunks: &chunked.chunks,
                used_chunks,
                num_of_q: req.num_of_q,
                batch_size: req.batch_size,
                academy: req.academy,
                topic: req.topic,
                llm_model: &req.llm_model,
                has4questions: req.has4questions,
                start_order,
            })
            .await;

        if questions.is_empty() {
            tracing::warn!(topic = req.topic, "No questions generated, skipping feedback");
            return Ok(questions);
        }

        Ok(self
            .feedback
            .generate_feedback(&questions, req.academy, req.topic, req.batch_size)
            .await)
    }
}
