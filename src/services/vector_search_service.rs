use crate::error::Result;
use crate::models::retrieved_document::{RetrievedDocument, SearchFilters};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

/// Nearest-neighbour lookup over stored document embeddings.
///
/// Results come back ordered by descending similarity; callers keep that order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        filters: SearchFilters,
    ) -> Result<Vec<RetrievedDocument>>;
}

/// pgvector-backed search through the `law_frame.search_law_items` function.
#[derive(Clone)]
pub struct PgVectorSearch {
    pool: PgPool,
}

impl PgVectorSearch {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorSearch for PgVectorSearch {
    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        filters: SearchFilters,
    ) -> Result<Vec<RetrievedDocument>> {
        if embedding.is_empty() {
            tracing::warn!("Empty embedding, skipping vector search");
            return Ok(Vec::new());
        }
        if filters != SearchFilters::default() {
            tracing::debug!(?filters, "search_law_items has no metadata scope, filters ignored");
        }

        let rows = sqlx::query(
            r#"
            SELECT id::text AS id, content, similarity::real AS similarity
            FROM law_frame.search_law_items($1::real[]::vector, $2)
            "#,
        )
        .bind(embedding)
        .bind(limit as i32)
        .fetch_all(&self.pool)
        .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            documents.push(RetrievedDocument {
                id: row.try_get::<Option<String>, _>("id")?.unwrap_or_default(),
                content: row.try_get::<Option<String>, _>("content")?.unwrap_or_default(),
                similarity: row.try_get::<Option<f32>, _>("similarity")?.unwrap_or(1.0),
                source: None,
                rank: 0,
            });
        }
        tracing::debug!(dimension = embedding.len(), results = documents.len(), "Vector search done");
        Ok(documents)
    }
}
