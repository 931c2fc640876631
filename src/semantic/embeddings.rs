use anyhow::{anyhow, bail};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::{self, EmbeddingsConfig};
use crate::items::Item;

/// Inputs are cut here before hitting the endpoint's size limit.
const EMBED_INPUT_MAX_CHARS: usize = 8000;
const EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of fixed-length embedding vectors. The trait seam keeps the
/// network out of tests.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// OpenAI-compatible `/v1/embeddings` client.
pub struct HttpEmbeddings {
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbeddings {
    pub fn from_config(config: &EmbeddingsConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config::api_key(),
            model: config.model.clone(),
        }
    }
}

impl EmbeddingProvider for HttpEmbeddings {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            bail!("empty text provided for embedding");
        }

        let input: String = text.chars().take(EMBED_INPUT_MAX_CHARS).collect();
        log::debug!("generating embedding for text ({} chars)", input.chars().count());

        let client = reqwest::blocking::Client::builder()
            .timeout(EMBED_TIMEOUT)
            .build()?;

        let mut request = client
            .post(format!("{}/v1/embeddings", self.base_url))
            .json(&json!({ "model": self.model, "input": input }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send()?;
        let status = resp.status();
        if !status.is_success() {
            bail!("embedding endpoint returned {status}");
        }

        let body: Value = resp.json()?;
        let embedding: Vec<f32> = body["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| anyhow!("invalid response format from embedding endpoint"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or_default() as f32)
            .collect();

        if embedding.is_empty() {
            bail!("embedding endpoint returned an empty vector");
        }

        log::debug!("generated embedding: {} dimensions", embedding.len());
        Ok(embedding)
    }
}

/// The text an item is embedded from: title, content, tags, any video
/// summary, and any OCR text, in that order.
pub fn item_text(item: &Item) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(title) = &item.title {
        parts.push(title.clone());
    }
    if let Some(content) = &item.content {
        parts.push(content.clone());
    }
    if !item.tags.is_empty() {
        parts.push(format!("Tags: {}", item.tags.join(", ")));
    }
    if let Some(summary) = &item.metadata.summary {
        parts.push(summary.clone());
    }
    if let Some(ocr_text) = &item.ocr_text {
        parts.push(format!("Image Text: {ocr_text}"));
    }

    parts.join("\n\n")
}
