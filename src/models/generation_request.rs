/// Input to one orchestration run. Built per request, dropped afterwards.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: i64,
    pub academy: i64,
    pub prompt: String,
    pub context: Option<String>,
    pub has4questions: bool,
    pub num_of_q: usize,
    pub llm_model: String,
    pub max_tokens_per_chunk: usize,
    pub batch_size: usize,
    pub use_rag: bool,
}
