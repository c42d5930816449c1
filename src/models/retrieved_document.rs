use serde::{Deserialize, Serialize};

/// A stored document returned by the vector similarity backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: String,
    pub content: String,
    pub similarity: f32,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub rank: usize,
}

impl RetrievedDocument {
    pub fn label(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.id)
    }
}

/// Optional metadata scope for a similarity search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub topic: Option<i64>,
    pub academy: Option<i64>,
}
