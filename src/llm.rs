use anyhow::{anyhow, bail};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::{self, LlmConfig};

const LLM_TIMEOUT: Duration = Duration::from_secs(60);
const API_VERSION: &str = "2023-06-01";

/// Transcripts are cut here before summarization to respect the model's
/// context budget.
const TRANSCRIPT_MAX_CHARS: usize = 50_000;

/// Thin blocking client for the messages endpoint. Constructed per call
/// site; absent credentials mean "no client", and every caller has a
/// deterministic fallback for that case.
#[derive(Clone)]
pub struct LlmClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LlmClient {{ base_url: {:?}, api_key: [REDACTED], model: {:?}, max_tokens: {} }}",
            self.base_url, self.model, self.max_tokens
        )
    }
}

impl LlmClient {
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        let api_key = config::api_key()?;

        Some(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Single-turn completion; returns the first text block.
    pub fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(LLM_TIMEOUT)
            .build()?;

        let resp = client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            bail!("model endpoint returned {status}");
        }

        let body: Value = resp.json()?;
        body["content"][0]["text"]
            .as_str()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| anyhow!("model response carried no text block"))
    }

    /// Structured summary of a video transcript: main topic, 3-5 key
    /// points, takeaways.
    pub fn video_summary(&self, title: &str, transcript: &str) -> anyhow::Result<String> {
        let transcript = if transcript.chars().count() > TRANSCRIPT_MAX_CHARS {
            let cut: String = transcript.chars().take(TRANSCRIPT_MAX_CHARS).collect();
            format!("{cut}...")
        } else {
            transcript.to_string()
        };

        let prompt = format!(
            "Please provide a comprehensive summary of this video transcript. Include:\n\
             1. Main topic/theme\n\
             2. Key points (3-5 bullet points)\n\
             3. Important insights or takeaways\n\
             4. Any action items or conclusions\n\
             \n\
             Video Title: {title}\n\
             \n\
             Transcript:\n\
             {transcript}\n\
             \n\
             Provide the summary in a clear, structured format."
        );

        self.complete(&prompt)
    }
}

/// First balanced `{...}` substring of a model response, string-literal
/// aware. Models like to wrap JSON in prose; this digs it out.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}
