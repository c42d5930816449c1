use crate::error::{Error, Result};
use crate::services::question_store::QuestionStore;
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// The three structured-output agents the pipeline talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Chunker,
    QuestionWriter,
    FeedbackWriter,
}

impl AgentRole {
    /// Key of the role's system prompt in `gpt_prompts`, when it has one.
    pub fn prompt_destination(self) -> Option<&'static str> {
        match self {
            AgentRole::Chunker => None,
            AgentRole::QuestionWriter => Some("generate_question"),
            AgentRole::FeedbackWriter => Some("feedback"),
        }
    }

    fn default_instructions(self) -> &'static str {
        match self {
            AgentRole::Chunker => {
                "Split the text so that several exam questions can be drawn from it. \
                 Every piece must be coherent and stay within the requested size. \
                 Always answer with a JSON object {\"chunks\": [string, ...]} keeping the original order."
            }
            AgentRole::QuestionWriter => {
                "You write multiple-choice exam questions. Every question has one correct answer \
                 and plausible distractors. Always answer with a JSON object {\"questions\": [...]} \
                 following exactly the schema given in the request."
            }
            AgentRole::FeedbackWriter => {
                "You explain exam answers. For each question state, formally and objectively, why \
                 the correct option is right and, when useful, why the others are not. \
                 Always answer with a JSON object {\"feedbacks\": [string, ...]}, one entry per question, same order."
            }
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentRole::Chunker => "chunker",
            AgentRole::QuestionWriter => "question_writer",
            AgentRole::FeedbackWriter => "feedback_writer",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    #[default]
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl FromStr for ReasoningEffort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            other => Err(Error::BadRequest(format!("Unknown reasoning effort: {}", other))),
        }
    }
}

/// Structured generation: one prompt in, one JSON document out.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// `model` overrides the runner's default agent model.
    async fn run(&self, role: AgentRole, prompt: &str, model: Option<&str>) -> Result<JsonValue>;
}

/// Free-text completion.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(
        &self,
        instructions: &str,
        input: &str,
        model: &str,
        effort: ReasoningEffort,
    ) -> Result<String>;
}

/// OpenAI client backing both [`AgentRunner`] and [`TextCompleter`].
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    api_key: String,
    base_url: String,
    agent_model: String,
    max_retries: u32,
    timeout: Duration,
    prompts: Option<Arc<dyn QuestionStore>>,
}

impl LlmService {
    pub fn new(api_key: String, client: Client, base_url: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("Missing OPENAI_API_KEY".to_string()));
        }
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            agent_model: "gpt-4o".to_string(),
            max_retries: 0,
            timeout: Duration::from_secs(120),
            prompts: None,
        })
    }

    pub fn with_agent_model(mut self, model: impl Into<String>) -> Self {
        self.agent_model = model.into();
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// System prompts for the question and feedback agents are read from here.
    pub fn with_prompt_store(mut self, store: Arc<dyn QuestionStore>) -> Self {
        self.prompts = Some(store);
        self
    }

    async fn instructions_for(&self, role: AgentRole) -> String {
        if let (Some(store), Some(destination)) = (&self.prompts, role.prompt_destination()) {
            match store.agent_instructions(destination).await {
                Ok(Some(instructions)) => return instructions,
                Ok(None) => {
                    tracing::debug!(%role, "No stored instructions, using built-in prompt")
                }
                Err(e) => {
                    tracing::warn!(%role, error = %e, "Failed to load agent instructions")
                }
            }
        }
        role.default_instructions().to_string()
    }

    async fn post_json(&self, path: &str, payload: &JsonValue) -> Result<JsonValue> {
        let mut attempt = 0u32;
        loop {
            let result = self.post_json_once(path, payload).await;
            match result {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let backoff = Duration::from_millis(500 * 2u64.pow(attempt))
                        + Duration::from_millis(rand::thread_rng().gen_range(0..250));
                    tracing::warn!(
                        path,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Transient OpenAI failure, retrying in {:?}",
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn post_json_once(&self, path: &str, payload: &JsonValue) -> Result<JsonValue> {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Upstream { status, body });
        }

        Ok(res.json().await?)
    }

    async fn chat_json(&self, model: &str, system: &str, user: &str) -> Result<JsonValue> {
        let payload = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "response_format": { "type": "json_object" }
        });

        let body = self.post_json("/chat/completions", &payload).await?;
        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| Error::Llm("Invalid OpenAI response format".to_string()))?;

        serde_json::from_str(content)
            .map_err(|e| Error::MalformedOutput(format!("message content is not JSON: {}", e)))
    }
}

/// Text of a Responses API body: `output_text` when present, otherwise every
/// `output_text` part of every message joined together.
pub fn extract_output_text(body: &JsonValue) -> Option<String> {
    if let Some(text) = body.get("output_text").and_then(|t| t.as_str()) {
        return Some(text.to_string());
    }
    let parts: Vec<&str> = body
        .get("output")?
        .as_array()?
        .iter()
        .filter(|item| item.get("type").and_then(|t| t.as_str()) == Some("message"))
        .filter_map(|item| item.get("content").and_then(|c| c.as_array()))
        .flatten()
        .filter(|part| part.get("type").and_then(|t| t.as_str()) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.concat())
    }
}

#[async_trait]
impl AgentRunner for LlmService {
    async fn run(&self, role: AgentRole, prompt: &str, model: Option<&str>) -> Result<JsonValue> {
        let instructions = self.instructions_for(role).await;
        let model = model.unwrap_or(&self.agent_model);
        tracing::debug!(%role, model, prompt_chars = prompt.len(), "Running agent");
        self.chat_json(model, &instructions, prompt).await
    }
}

#[async_trait]
impl TextCompleter for LlmService {
    async fn complete(
        &self,
        instructions: &str,
        input: &str,
        model: &str,
        effort: ReasoningEffort,
    ) -> Result<String> {
        let payload = serde_json::json!({
            "model": model,
            "reasoning": { "effort": effort.as_str() },
            "instructions": instructions,
            "input": input,
        });
        let body = self.post_json("/responses", &payload).await?;
        extract_output_text(&body)
            .ok_or_else(|| Error::Llm("Responses API returned no text output".to_string()))
    }
}
