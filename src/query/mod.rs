use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::items::{ItemQuery, ItemType};
use crate::llm::{self, LlmClient};

/// Filler words dropped by the deterministic fallback tokenizer.
const STOP_WORDS: [&str; 27] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "about", "all", "some", "any", "this", "that", "these", "those", "show", "find",
    "get", "give",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Structured filter derived from free text. Ephemeral: produced per
/// search request and compiled straight into a store query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedQuery {
    pub keywords: Option<Vec<String>>,
    pub content_types: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub date_range: Option<DateRange>,
    pub authors: Option<Vec<String>>,
    pub urls: Option<Vec<String>>,
    pub intent: Option<String>,
}

/// Translate a natural-language query into a structured filter. The model
/// path is best-effort; any failure lands on the deterministic fallback,
/// which always produces a usable filter.
pub fn translate(query: &str, llm: Option<&LlmClient>) -> ParsedQuery {
    if let Some(llm) = llm {
        match translate_with_model(query, llm) {
            Ok(parsed) => {
                log::debug!("parsed query {query:?} -> {parsed:?}");
                return parsed;
            }
            Err(err) => log::warn!("query translation failed, using fallback: {err}"),
        }
    }

    fallback(query)
}

fn translate_with_model(query: &str, llm: &LlmClient) -> anyhow::Result<ParsedQuery> {
    let response = llm.complete(&build_prompt(query))?;
    let json = llm::extract_json_object(&response)
        .ok_or_else(|| anyhow!("no JSON object in model response"))?;

    Ok(serde_json::from_str(json)?)
}

fn build_prompt(query: &str) -> String {
    let today = Utc::now().format("%Y-%m-%d");

    format!(
        r#"You are a search query parser for a second brain/knowledge management system. Parse the following natural language search query and extract structured parameters.

Search Query: "{query}"

Extract and return ONLY a valid JSON object with these fields (use null if not mentioned):
{{
  "keywords": ["keyword1", "keyword2"],
  "contentTypes": ["article", "video", "note", "todo", "image"],
  "tags": ["tag1", "tag2"],
  "dateRange": {{
    "start": "YYYY-MM-DD",
    "end": "YYYY-MM-DD"
  }},
  "authors": ["author1"],
  "urls": ["domain.com"],
  "intent": "search"
}}

Important:
- For "last month", calculate the actual date range
- For "this week", use the current week's date range
- For "today", use today's date
- contentTypes should be lowercase: article, video, note, todo, image, product
- Extract keywords intelligently (ignore filler words like "about", "from", "the")
- Return ONLY the JSON object, no explanations

Current date: {today}"#
    )
}

/// Deterministic fallback: tokenize, drop short tokens and stop words, and
/// treat whatever remains as keywords. Never fails: a query made entirely
/// of stop words keeps all of its original tokens.
pub fn fallback(query: &str) -> ParsedQuery {
    let keywords: Vec<String> = query
        .split_whitespace()
        .filter(|word| {
            word.chars().count() > 2 && !STOP_WORDS.contains(&word.to_lowercase().as_str())
        })
        .map(|word| word.to_string())
        .collect();

    let keywords = if keywords.is_empty() {
        query.split_whitespace().map(String::from).collect()
    } else {
        keywords
    };

    ParsedQuery {
        keywords: Some(keywords),
        intent: Some("search".to_string()),
        ..Default::default()
    }
}

/// Compile the structured filter into a store query. Every present
/// condition is ANDed; keywords are a conjunction of per-keyword
/// disjunctions handled by the store matcher.
pub fn compile(parsed: &ParsedQuery) -> ItemQuery {
    let mut query = ItemQuery::default();

    if let Some(keywords) = &parsed.keywords {
        query.keywords = keywords.clone();
    }

    if let Some(content_types) = &parsed.content_types {
        let types: Vec<ItemType> = content_types
            .iter()
            .filter_map(|value| ItemType::parse(value))
            .collect();
        if !types.is_empty() {
            query.types = Some(types);
        }
    }

    if let Some(tags) = &parsed.tags {
        if !tags.is_empty() {
            query.tags = Some(tags.clone());
        }
    }

    if let Some(range) = &parsed.date_range {
        if let Some(start) = range.start.as_deref().and_then(parse_date) {
            query.created_after = start.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
        if let Some(end) = range.end.as_deref().and_then(parse_date) {
            // the range is inclusive through the last instant of that day
            query.created_before = end.and_hms_milli_opt(23, 59, 59, 999).map(|dt| dt.and_utc());
        }
    }

    if let Some(authors) = &parsed.authors {
        if !authors.is_empty() {
            query.authors = Some(authors.clone());
        }
    }

    if let Some(urls) = &parsed.urls {
        if !urls.is_empty() {
            query.url_patterns = Some(urls.clone());
        }
    }

    query
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(err) => {
            log::debug!("unparseable date {value:?} in parsed query: {err}");
            None
        }
    }
}
