use crate::error::{Error, Result};
use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::Client;

/// OpenAI accepts at most this many inputs per embeddings request.
const MAX_INPUTS_PER_REQUEST: usize = 2048;

/// Turns text into vectors. Dimension depends on the model behind it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Clone)]
pub struct EmbedService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl EmbedService {
    pub fn new(api_key: String, client: Client, base_url: String, model: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("Missing OPENAI_API_KEY".to_string()));
        }
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(serde::Serialize)]
        struct EmbReq<'a> {
            model: &'a str,
            input: &'a [String],
        }
        #[derive(serde::Deserialize)]
        struct EmbData {
            index: Option<usize>,
            embedding: Vec<f32>,
        }
        #[derive(serde::Deserialize)]
        struct EmbResp {
            data: Vec<EmbData>,
        }

        let body = EmbReq {
            model: &self.model,
            input,
        };
        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("embeddings request failed")?;

        let status = resp.status();
        let txt = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: txt,
            });
        }
        let mut parsed: EmbResp = serde_json::from_str(&txt).context("embeddings parse failed")?;
        parsed.data.sort_by_key(|d| d.index.unwrap_or(0));
        if parsed.data.len() != input.len() {
            return Err(anyhow::anyhow!(
                "embeddings count mismatch: sent {}, got {}",
                input.len(),
                parsed.data.len()
            )
            .into());
        }
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Vector size of well-known embedding models; 768 for anything else.
pub fn dimension_for(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        "all-MiniLM-L6-v2" => 384,
        _ => 768,
    }
}

#[async_trait]
impl EmbeddingProvider for EmbedService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Internal("embeddings response was empty".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            all.extend(self.request(batch).await?);
        }
        Ok(all)
    }
}
