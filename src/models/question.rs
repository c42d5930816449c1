use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Multiple-choice exam question produced by the generation pipeline.
///
/// `id` stays `None` until the row store assigns one. `tip` is filled by the
/// feedback phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: Option<i64>,
    pub academy: i64,
    pub topic: i64,
    pub question: String,
    pub answer1: String,
    pub answer2: String,
    pub answer3: String,
    #[serde(default)]
    pub answer4: Option<String>,
    pub solution: i32,
    #[serde(default)]
    pub tip: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub question_prompt: String,
    pub llm_model: String,
    #[serde(rename = "createdAt", alias = "created_at", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Question {
    pub fn answers(&self) -> [Option<&str>; 4] {
        [
            Some(self.answer1.as_str()),
            Some(self.answer2.as_str()),
            Some(self.answer3.as_str()),
            self.answer4.as_deref(),
        ]
    }

    pub fn answer_count(&self) -> usize {
        self.answers().iter().filter(|a| a.is_some()).count()
    }

    pub fn has_valid_solution(&self) -> bool {
        self.solution >= 1 && (self.solution as usize) <= self.answer_count()
    }

    /// Copy with a new tip; the original is left untouched.
    pub fn with_tip(&self, tip: String) -> Self {
        Self {
            tip: Some(tip),
            ..self.clone()
        }
    }
}

/// What a feedback worker sees: the question without its tip.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackItem<'a> {
    pub question: &'a str,
    pub answer1: &'a str,
    pub answer2: &'a str,
    pub answer3: &'a str,
    pub answer4: Option<&'a str>,
    pub solution: i32,
}

impl<'a> From<&'a Question> for FeedbackItem<'a> {
    fn from(q: &'a Question) -> Self {
        Self {
            question: &q.question,
            answer1: &q.answer1,
            answer2: &q.answer2,
            answer3: &q.answer3,
            answer4: q.answer4.as_deref(),
            solution: q.solution,
        }
    }
}
