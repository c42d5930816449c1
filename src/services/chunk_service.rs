use crate::services::llm_service::{AgentRole, AgentRunner};
use crate::utils::fanout::run_all;
use crate::utils::llm_output::parse_string_list;
use crate::utils::text::{estimate_tokens, split_sections};
use std::sync::Arc;

/// Characters of context per chunking section.
const CHARS_PER_SECTION: usize = 2000;

/// Contexts up to this factor over the chunk budget are used whole.
const NO_CHUNK_TOLERANCE: f64 = 1.2;

/// Result of chunking. `used` is false only when there was no context at all,
/// in which case generation runs from the prompt alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedContext {
    pub chunks: Vec<String>,
    pub used: bool,
}

#[derive(Clone)]
pub struct ChunkService {
    agent: Arc<dyn AgentRunner>,
}

impl ChunkService {
    pub fn new(agent: Arc<dyn AgentRunner>) -> Self {
        Self { agent }
    }

    /// Splits `context` into pieces of at most `max_tokens` tokens.
    ///
    /// Small contexts come back as a single chunk without an LLM call. Larger
    /// ones are cut into up to `max_parallel_sections` sections that the
    /// chunker agent subdivides concurrently; a failed section is logged and
    /// contributes nothing.
    pub async fn chunk(
        &self,
        context: Option<&str>,
        max_tokens: usize,
        max_parallel_sections: usize,
    ) -> ChunkedContext {
        let context = match context {
            Some(c) if !c.trim().is_empty() => c,
            _ => return ChunkedContext::default(),
        };

        let tokens = estimate_tokens(context);
        if tokens <= max_tokens as f64 * NO_CHUNK_TOLERANCE {
            tracing::debug!(tokens, max_tokens, "Context fits one chunk");
            return ChunkedContext {
                chunks: vec![context.to_string()],
                used: true,
            };
        }

        let chars = context.chars().count();
        let sections = (chars / CHARS_PER_SECTION).max(1).min(max_parallel_sections.max(1));
        tracing::info!(chars, tokens, sections, "Chunking context in parallel");

        let tasks = split_sections(context, sections)
            .into_iter()
            .enumerate()
            .map(|(idx, section)| {
                tracing::debug!(section = idx, chars = section.chars().count(), "Section queued for chunking");
                let agent = Arc::clone(&self.agent);
                let prompt = chunk_prompt(section, max_tokens);
                async move {
                    let raw = agent.run(AgentRole::Chunker, &prompt, None).await?;
                    parse_string_list(&raw, "chunks")
                }
            });

        let mut chunks = Vec::new();
        for (idx, result) in run_all(tasks).await.into_iter().enumerate() {
            match result {
                Ok(section_chunks) => {
                    let before = chunks.len();
                    chunks.extend(section_chunks.into_iter().filter(|c| !c.trim().is_empty()));
                    tracing::debug!(section = idx, chunks = chunks.len() - before, "Section chunked");
                }
                Err(e) => {
                    tracing::warn!(section = idx, error = %e, "Chunking section failed, dropping it");
                }
            }
        }

        tracing::info!(chunks = chunks.len(), sections, "Parallel chunking finished");
        ChunkedContext { chunks, used: true }
    }
}

fn chunk_prompt(section: &str, max_tokens: usize) -> String {
    format!(
        r#"Split this section of context into chunks of at most {max_tokens} tokens each:

{section}

IMPORTANT: return EXACTLY this JSON format:
{{
    "chunks": [
        "chunk 1",
        "chunk 2"
    ]
}}"#
    )
}
