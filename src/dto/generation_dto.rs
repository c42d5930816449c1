use crate::models::generation_request::GenerationRequest;
use serde::{Deserialize, Serialize};
use validator::Validate;

fn default_num_of_q() -> usize {
    5
}

fn default_max_tokens_per_chunk() -> usize {
    100
}

fn default_persist() -> bool {
    true
}

/// Body of `POST /generate_questions`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateQuestionsPayload {
    pub topic: i64,
    pub academy: i64,
    #[validate(length(min = 1))]
    pub prompt: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub has4questions: bool,
    #[validate(range(min = 1))]
    #[serde(default = "default_num_of_q")]
    pub num_of_q: usize,
    #[serde(default)]
    pub llm_model: Option<String>,
    #[validate(range(min = 1, max = 100000))]
    #[serde(default = "default_max_tokens_per_chunk")]
    pub max_tokens_per_chunk: usize,
    #[validate(range(min = 1, max = 32))]
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub use_rag: Option<bool>,
    #[serde(default = "default_persist")]
    pub persist: bool,
}

/// Server-side defaults and limits applied to a payload.
#[derive(Debug, Clone)]
pub struct GenerationDefaults {
    pub llm_model: String,
    pub batch_size: usize,
    pub max_questions_per_request: usize,
    pub rag_enabled: bool,
}

impl GenerateQuestionsPayload {
    /// Fills unset fields from `defaults` and clamps `num_of_q`.
    pub fn into_request(self, defaults: &GenerationDefaults) -> GenerationRequest {
        let num_of_q = self.num_of_q.min(defaults.max_questions_per_request.max(1));
        if num_of_q < self.num_of_q {
            tracing::info!(
                requested = self.num_of_q,
                allowed = num_of_q,
                "num_of_q clamped to the per-request limit"
            );
        }
        GenerationRequest {
            topic: self.topic,
            academy: self.academy,
            prompt: self.prompt,
            context: self.context,
            has4questions: self.has4questions,
            num_of_q,
            llm_model: self
                .llm_model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| defaults.llm_model.clone()),
            max_tokens_per_chunk: self.max_tokens_per_chunk,
            batch_size: self.batch_size.unwrap_or(defaults.batch_size).max(1),
            use_rag: self.use_rag.unwrap_or(defaults.rag_enabled),
        }
    }
}

/// Query of `GET /create`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTextQuery {
    #[validate(length(min = 1))]
    pub prompt: String,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub effort: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> GenerationDefaults {
        GenerationDefaults {
            llm_model: "gpt-5-2025-08-07".into(),
            batch_size: 3,
            max_questions_per_request: 50,
            rag_enabled: false,
        }
    }

    #[test]
    fn missing_fields_take_defaults() {
        let payload: GenerateQuestionsPayload =
            serde_json::from_value(json!({"topic": 1, "academy": 2, "prompt": "p"})).unwrap();
        assert!(payload.validate().is_ok());
        assert!(payload.persist);

        let req = payload.into_request(&defaults());
        assert_eq!(req.num_of_q, 5);
        assert_eq!(req.max_tokens_per_chunk, 100);
        assert_eq!(req.batch_size, 3);
        assert_eq!(req.llm_model, "gpt-5-2025-08-07");
        assert!(!req.has4questions);
        assert!(!req.use_rag);
        assert!(req.context.is_none());
    }

    #[test]
    fn num_of_q_is_clamped() {
        let payload: GenerateQuestionsPayload = serde_json::from_value(json!({
            "topic": 1, "academy": 2, "prompt": "p", "num_of_q": 500, "llm_model": "gpt-4o"
        }))
        .unwrap();
        let req = payload.into_request(&defaults());
        assert_eq!(req.num_of_q, 50);
        assert_eq!(req.llm_model, "gpt-4o");
    }

    #[test]
    fn zero_questions_or_blank_prompt_fail_validation() {
        let zero: GenerateQuestionsPayload = serde_json::from_value(json!({
            "topic": 1, "academy": 2, "prompt": "p", "num_of_q": 0
        }))
        .unwrap();
        assert!(zero.validate().is_err());

        let blank: GenerateQuestionsPayload =
            serde_json::from_value(json!({"topic": 1, "academy": 2, "prompt": ""})).unwrap();
        assert!(blank.validate().is_err());
    }
}
