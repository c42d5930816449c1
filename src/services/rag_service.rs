use crate::error::Result;
use crate::models::retrieved_document::{RetrievedDocument, SearchFilters};
use crate::services::embed_service::EmbeddingProvider;
use crate::services::vector_search_service::VectorSearch;
use std::fmt::Write as _;
use std::sync::Arc;

/// Retrieval-augmented context: embedding + similarity search over stored documents.
#[derive(Clone)]
pub struct RagService {
    embedder: Arc<dyn EmbeddingProvider>,
    search: Arc<dyn VectorSearch>,
    min_similarity: f32,
}

impl RagService {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, search: Arc<dyn VectorSearch>) -> Self {
        Self {
            embedder,
            search,
            min_similarity: 0.0,
        }
    }

    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    /// Documents similar to `query`, best first, with a 1-based `rank`.
    /// Results below `min_similarity` are dropped when it is positive.
    pub async fn search_similar_documents(
        &self,
        query: &str,
        limit: usize,
        min_similarity: f32,
        filters: SearchFilters,
    ) -> Result<Vec<RetrievedDocument>> {
        let embedding = self.embedder.embed(query).await?;
        tracing::debug!(dimension = embedding.len(), "Query embedding computed");

        let mut documents = self.search.search(&embedding, limit, filters).await?;
        if min_similarity > 0.0 {
            documents.retain(|doc| doc.similarity >= min_similarity);
        }
        for (i, doc) in documents.iter_mut().enumerate() {
            doc.rank = i + 1;
        }
        Ok(documents)
    }

    /// Appends the `top_k` most similar stored documents to `context`.
    ///
    /// Never fails: any embedding or search error, or an empty result, yields
    /// `context` unchanged.
    pub async fn enrich(&self, context: &str, topic: i64, academy: i64, top_k: usize) -> String {
        let filters = SearchFilters {
            topic: Some(topic),
            academy: Some(academy),
        };
        let documents = match self
            .search_similar_documents(context, top_k, self.min_similarity, filters)
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, topic, academy, "Context enrichment failed, using original context");
                return context.to_string();
            }
        };

        if documents.is_empty() {
            tracing::info!(topic, academy, "No related documents found, context left as is");
            return context.to_string();
        }

        tracing::info!(topic, academy, documents = documents.len(), "Context enriched");
        format_enriched_context(context, &documents)
    }
}

/// Original context followed by each document with its label and score, in
/// the order given.
pub fn format_enriched_context(context: &str, documents: &[RetrievedDocument]) -> String {
    let mut out = String::with_capacity(
        context.len() + documents.iter().map(|d| d.content.len() + 48).sum::<usize>(),
    );
    out.push_str(context);
    out.push_str("\n\nRelated documents:\n");
    for doc in documents {
        let _ = write!(
            out,
            "\n[Document {} - Similarity: {:.3}]\n{}\n",
            doc.label(),
            doc.similarity,
            doc.content
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::services::embed_service::MockEmbeddingProvider;
    use crate::services::vector_search_service::MockVectorSearch;

    fn doc(id: &str, content: &str, similarity: f32) -> RetrievedDocument {
        RetrievedDocument {
            id: id.into(),
            content: content.into(),
            similarity,
            source: None,
            rank: 0,
        }
    }

    fn embedder() -> MockEmbeddingProvider {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed()
            .returning(|_| Ok(vec![0.1, 0.2, 0.3]));
        embedder
    }

    #[tokio::test]
    async fn search_failure_returns_context_unchanged() {
        let mut search = MockVectorSearch::new();
        search
            .expect_search()
            .returning(|_, _, _| Err(Error::Internal("backend down".into())));

        let rag = RagService::new(Arc::new(embedder()), Arc::new(search));
        assert_eq!(rag.enrich("Article 1", 7, 2, 5).await, "Article 1");
    }

    #[tokio::test]
    async fn embedding_failure_returns_context_unchanged() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed()
            .returning(|_| Err(Error::Upstream { status: 500, body: "oops".into() }));
        let mut search = MockVectorSearch::new();
        search.expect_search().never();

        let rag = RagService::new(Arc::new(embedder), Arc::new(search));
        assert_eq!(rag.enrich("Article 1", 7, 2, 5).await, "Article 1");
    }

    #[tokio::test]
    async fn empty_search_returns_context_unchanged() {
        let mut search = MockVectorSearch::new();
        search.expect_search().returning(|_, _, _| Ok(vec![]));

        let rag = RagService::new(Arc::new(embedder()), Arc::new(search));
        assert_eq!(rag.enrich("Article 1", 7, 2, 5).await, "Article 1");
    }

    #[tokio::test]
    async fn enriched_context_keeps_backend_order_and_scores() {
        let mut search = MockVectorSearch::new();
        search
            .expect_search()
            .withf(|embedding, limit, filters| {
                embedding.len() == 3 && *limit == 2 && filters.topic == Some(7)
            })
            .returning(|_, _, _| {
                Ok(vec![
                    doc("12", "Second article text", 0.91234),
                    doc("4", "Fourth article text", 0.5),
                ])
            });

        let rag = RagService::new(Arc::new(embedder()), Arc::new(search));
        let enriched = rag.enrich("Base context", 7, 2, 2).await;

        assert!(enriched.starts_with("Base context"));
        let first = enriched.find("[Document 12 - Similarity: 0.912]").unwrap();
        let second = enriched.find("[Document 4 - Similarity: 0.500]").unwrap();
        assert!(first < second);
        assert!(enriched.contains("Fourth article text"));
    }

    #[tokio::test]
    async fn min_similarity_filters_and_ranks() {
        let mut search = MockVectorSearch::new();
        search.expect_search().returning(|_, _, _| {
            Ok(vec![doc("a", "x", 0.9), doc("b", "y", 0.2), doc("c", "z", 0.7)])
        });

        let rag = RagService::new(Arc::new(embedder()), Arc::new(search));
        let docs = rag
            .search_similar_documents("q", 10, 0.5, SearchFilters::default())
            .await
            .unwrap();
        let ids: Vec<(&str, usize)> = docs.iter().map(|d| (d.id.as_str(), d.rank)).collect();
        assert_eq!(ids, vec![("a", 1), ("c", 2)]);
    }

    #[test]
    fn source_label_wins_over_id() {
        let mut d = doc("9", "body", 0.25);
        d.source = Some("Constitution art. 9".into());
        let text = format_enriched_context("ctx", &[d]);
        assert!(text.contains("[Document Constitution art. 9 - Similarity: 0.250]"));
    }
}
