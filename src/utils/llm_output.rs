//! Typed validation of structured LLM output.
//!
//! The model is asked for a fixed JSON shape but nothing guarantees it. Every
//! parser here either returns well-formed values or `Error::MalformedOutput`,
//! which callers treat as a failure of that one call.

use crate::error::{Error, Result};
use crate::models::question::Question;
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

/// Values stamped onto generated questions when the model leaves them blank.
#[derive(Debug, Clone)]
pub struct QuestionDefaults<'a> {
    pub academy: i64,
    pub topic: i64,
    pub llm_model: &'a str,
    pub has4questions: bool,
    pub question_prompt: String,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(default, deserialize_with = "lenient_i64")]
    academy: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    topic: Option<i64>,
    #[serde(default)]
    question: String,
    #[serde(default)]
    answer1: String,
    #[serde(default)]
    answer2: String,
    #[serde(default)]
    answer3: String,
    #[serde(default)]
    answer4: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    solution: Option<i64>,
    #[serde(default)]
    tip: Option<String>,
    #[serde(default)]
    llm_model: Option<String>,
}

/// Accepts `3`, `"3"`, `null` or `""`.
fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(n)) => Ok(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))),
        Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(None),
        Some(JsonValue::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected integer, got {}",
            other
        ))),
    }
}

/// Finds the list payload: `{"<key>": [...]}`, a bare array, or either of those
/// encoded inside a JSON string.
fn list_payload(raw: &JsonValue, key: &str) -> Result<Vec<JsonValue>> {
    match raw {
        JsonValue::Array(items) => Ok(items.clone()),
        JsonValue::Object(map) => match map.get(key) {
            Some(JsonValue::Array(items)) => Ok(items.clone()),
            Some(other) => Err(Error::MalformedOutput(format!(
                "field '{}' is not an array: {}",
                key, other
            ))),
            None => Err(Error::MalformedOutput(format!(
                "object has no '{}' field",
                key
            ))),
        },
        JsonValue::String(text) => {
            let nested: JsonValue = serde_json::from_str(text.trim()).map_err(|e| {
                Error::MalformedOutput(format!("text output is not JSON: {}", e))
            })?;
            if nested.is_string() {
                return Err(Error::MalformedOutput("doubly encoded string".to_string()));
            }
            list_payload(&nested, key)
        }
        other => Err(Error::MalformedOutput(format!(
            "expected a '{}' list, got {}",
            key, other
        ))),
    }
}

/// Parses an ordered list of strings, e.g. chunks or feedbacks.
pub fn parse_string_list(raw: &JsonValue, key: &str) -> Result<Vec<String>> {
    list_payload(raw, key)?
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            JsonValue::String(s) => Ok(s),
            other => Err(Error::MalformedOutput(format!(
                "'{}'[{}] is not a string: {}",
                key, idx, other
            ))),
        })
        .collect()
}

/// Parses generated questions and fills the blanks from `defaults`.
///
/// Items that do not deserialize, or whose `solution` does not point at a
/// present answer, are dropped individually. `order` is left at zero for the
/// caller to assign.
pub fn parse_questions(raw: &JsonValue, defaults: &QuestionDefaults<'_>) -> Result<Vec<Question>> {
    let items = list_payload(raw, "questions")?;
    let mut questions = Vec::with_capacity(items.len());

    for (idx, item) in items.into_iter().enumerate() {
        let parsed: RawQuestion = match serde_json::from_value(item) {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(index = idx, error = %e, "Dropping unparseable question");
                continue;
            }
        };

        let answer4 = if defaults.has4questions {
            parsed.answer4.filter(|a| !a.trim().is_empty() && a != "null")
        } else {
            None
        };
        let llm_model = parsed
            .llm_model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| defaults.llm_model.to_string());

        let question = Question {
            id: None,
            academy: parsed.academy.unwrap_or(defaults.academy),
            topic: parsed.topic.unwrap_or(defaults.topic),
            question: parsed.question,
            answer1: parsed.answer1,
            answer2: parsed.answer2,
            answer3: parsed.answer3,
            answer4,
            solution: parsed.solution.unwrap_or(1).clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            tip: parsed.tip.filter(|t| !t.trim().is_empty()),
            order: 0,
            question_prompt: defaults.question_prompt.clone(),
            llm_model,
            created_at: Some(Utc::now()),
        };

        if question.question.trim().is_empty() {
            tracing::warn!(index = idx, "Dropping question with empty text");
            continue;
        }
        if !question.has_valid_solution() {
            tracing::warn!(
                index = idx,
                solution = question.solution,
                answers = question.answer_count(),
                "Dropping question whose solution is out of range"
            );
            continue;
        }
        questions.push(question);
    }

    Ok(questions)
}
