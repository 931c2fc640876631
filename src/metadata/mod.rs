pub mod extractors;
pub mod marketplace;
pub mod transcript;
pub mod types;
pub mod youtube;

pub use types::{PageMeta, DESCRIPTION_MAX_LEN, TITLE_MAX_LEN};

use crate::config::ScrapeConfig;
use crate::items::ItemType;
use crate::llm::LlmClient;
use crate::scrape;
use transcript::TranscriptClient;

/// Collaborators the normalizer may lean on. All optional; absence just
/// means the corresponding enrichment is skipped.
#[derive(Clone, Debug, Default)]
pub struct MetaDeps {
    pub scrape: ScrapeConfig,
    pub llm: Option<LlmClient>,
    pub transcript: Option<TranscriptClient>,
}

/// Main entry point for metadata extraction. Always returns a record
/// (possibly an empty one) and never raises: extraction failure degrades,
/// it does not abort item creation.
pub fn fetch_meta(url: &str, deps: &MetaDeps) -> PageMeta {
    let html = match scrape::fetch_page(url, &deps.scrape) {
        Ok(page) => Some(page.html),
        Err(err) => {
            log::warn!("page fetch failed for {url}: {err}");
            None
        }
    };

    let mut meta = PageMeta::default();

    if let Some(html) = &html {
        meta = extractors::ExtractorRegistry::new().extract(url, html);
    }

    // recognized-domain rules key off the URL alone, so a dead page still
    // gets the right type and video id
    youtube::enrich(url, &mut meta, deps);
    marketplace::enrich(url, html.as_deref(), &mut meta);

    if let Some(html) = &html {
        article_fallback(html, &mut meta);
    }

    types::truncate_fields(&mut meta);

    meta
}

/// Terminal heuristic: pages that look like articles get the article type
/// and, when present, an author.
fn article_fallback(html: &str, meta: &mut PageMeta) {
    if meta.item_type.is_some() {
        return;
    }

    let document = scraper::Html::parse_document(html);
    let article_selector = scraper::Selector::parse("article").unwrap();
    let published_selector =
        scraper::Selector::parse(r#"meta[property="article:published_time"]"#).unwrap();

    let looks_like_article = document.select(&article_selector).next().is_some()
        || document.select(&published_selector).next().is_some();

    if !looks_like_article {
        return;
    }

    meta.item_type = Some(ItemType::Article);

    if meta.author.is_none() {
        let author_selector = scraper::Selector::parse(r#"meta[name="author"]"#).unwrap();
        let og_author_selector =
            scraper::Selector::parse(r#"meta[property="article:author"]"#).unwrap();

        meta.author = document
            .select(&author_selector)
            .next()
            .and_then(|el| el.attr("content"))
            .or_else(|| {
                document
                    .select(&og_author_selector)
                    .next()
                    .and_then(|el| el.attr("content"))
            })
            .map(|author| author.trim().to_string())
            .filter(|author| !author.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_markup_assigns_type_and_author() {
        let html = r#"<html><head>
            <meta name="author" content="Jane Writer">
        </head><body><article>words</article></body></html>"#;
        let mut meta = PageMeta::default();
        article_fallback(html, &mut meta);
        assert_eq!(meta.item_type, Some(ItemType::Article));
        assert_eq!(meta.author.as_deref(), Some("Jane Writer"));
    }

    #[test]
    fn published_time_meta_counts_as_article() {
        let html = r#"<html><head>
            <meta property="article:published_time" content="2024-01-01">
        </head><body></body></html>"#;
        let mut meta = PageMeta::default();
        article_fallback(html, &mut meta);
        assert_eq!(meta.item_type, Some(ItemType::Article));
    }

    #[test]
    fn fallback_never_overrides_an_assigned_type() {
        let html = "<html><body><article>words</article></body></html>";
        let mut meta = PageMeta {
            item_type: Some(ItemType::Video),
            ..Default::default()
        };
        article_fallback(html, &mut meta);
        assert_eq!(meta.item_type, Some(ItemType::Video));
    }

    #[test]
    fn plain_page_stays_untyped() {
        let html = "<html><body><p>words</p></body></html>";
        let mut meta = PageMeta::default();
        article_fallback(html, &mut meta);
        assert_eq!(meta.item_type, None);
    }
}
