use anyhow::{anyhow, bail};
use serde_json::Value;
use std::time::Duration;

use crate::items::{Item, ItemDraft};

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct UploadedImage {
    pub image_url: String,
    pub ocr_text: Option<String>,
}

/// Blocking client for the backend REST surface.
#[derive(Clone, Debug)]
pub struct ApiClient {
    api_url: String,
}

impl ApiClient {
    pub fn new(api_url: &str) -> ApiClient {
        let api_url = api_url.strip_suffix('/').unwrap_or(api_url).to_string();

        ApiClient { api_url }
    }

    pub fn create_item(&self, draft: &ItemDraft) -> anyhow::Result<Item> {
        let resp = reqwest::blocking::Client::builder()
            .timeout(SUBMIT_TIMEOUT)
            .build()?
            .post(format!("{}/items", self.api_url))
            .json(draft)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            bail!("backend returned {status}");
        }

        let body: Value = resp.json()?;
        Ok(serde_json::from_value(body["item"].clone())?)
    }

    pub fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> anyhow::Result<UploadedImage> {
        let part = reqwest::blocking::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::blocking::multipart::Form::new().part("image", part);

        let resp = reqwest::blocking::Client::builder()
            .timeout(SUBMIT_TIMEOUT)
            .build()?
            .post(format!("{}/items/upload", self.api_url))
            .multipart(form)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            bail!("upload failed with {status}");
        }

        let body: Value = resp.json()?;
        let image_url = body["imageUrl"]
            .as_str()
            .ok_or_else(|| anyhow!("upload response carried no imageUrl"))?;

        Ok(UploadedImage {
            image_url: self.absolute_url(image_url),
            ocr_text: body["ocrText"].as_str().map(String::from),
        })
    }

    /// Connectivity probe against the health endpoint. Any failure reads
    /// as "offline".
    pub fn is_online(&self) -> bool {
        reqwest::blocking::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .ok()
            .and_then(|client| client.get(format!("{}/health", self.api_url)).send().ok())
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }

    /// Upload paths come back server-relative; captured items carry the
    /// absolute form.
    fn absolute_url(&self, path: &str) -> String {
        let origin = self.api_url.strip_suffix("/api").unwrap_or(&self.api_url);
        format!("{origin}{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_url_strips_api_suffix() {
        let client = ApiClient::new("http://localhost:5000/api");
        assert_eq!(
            client.absolute_url("/uploads/x.png"),
            "http://localhost:5000/uploads/x.png"
        );
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let client = ApiClient::new("http://localhost:5000/api/");
        assert_eq!(
            client.absolute_url("/uploads/x.png"),
            "http://localhost:5000/uploads/x.png"
        );
    }
}
