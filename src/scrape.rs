use anyhow::bail;
use std::{error::Error, time::Duration};

use crate::config::ScrapeConfig;

fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

pub struct PageFetch {
    pub html: String,
}

/// Fetch a page once with the configured budget. Extraction failures are a
/// normal outcome upstream, so there is deliberately no retry here.
pub fn fetch_page(url: &str, config: &ScrapeConfig) -> anyhow::Result<PageFetch> {
    let mut url = url.to_string();
    if url.starts_with("//") {
        url = format!("https:{}", url);
    }

    let url_parsed = reqwest::Url::parse(&url)?;
    let host = url_parsed.host_str().unwrap_or_default();
    let path = url_parsed.path();
    let iden = format!("{host}{path}");

    let client = reqwest::blocking::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    log::debug!("{iden}: requesting");

    let resp = match client.get(&url).send() {
        Ok(resp) => resp,
        Err(err) => {
            log::debug!("{iden}: {}", get_error(&err));
            return Err(err.into());
        }
    };

    let status = resp.status();
    if !status.is_success() {
        log::debug!("{iden}: {}", status);
        bail!("{iden}: unexpected status {status}");
    }

    let bytes = resp.bytes()?;

    Ok(PageFetch {
        html: String::from_utf8_lossy(&bytes).to_string(),
    })
}
