use crate::metadata::extractors::MetadataExtractor;
use crate::metadata::types::PageMeta;

/// Plain HTML fallback: `<title>` text and the standard description meta.
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for HtmlExtractor {
    fn extract(&self, _url: &str, html: &str) -> anyhow::Result<Option<PageMeta>> {
        let document = scraper::Html::parse_document(html);
        let title_selector = scraper::Selector::parse("title").unwrap();
        let meta_title_selector = scraper::Selector::parse(r#"meta[name="title"]"#).unwrap();
        let description_selector = scraper::Selector::parse(r#"meta[name="description"]"#).unwrap();

        let mut meta = PageMeta::default();

        if let Some(element) = document.select(&title_selector).next() {
            let text = element.text().collect::<String>();
            let text = text.trim();
            if !text.is_empty() {
                meta.title = Some(text.to_string());
            }
        }

        if meta.title.is_none() {
            if let Some(content) = document
                .select(&meta_title_selector)
                .next()
                .and_then(|el| el.attr("content"))
            {
                let content = content.trim();
                if !content.is_empty() {
                    meta.title = Some(content.to_string());
                }
            }
        }

        if let Some(content) = document
            .select(&description_selector)
            .next()
            .and_then(|el| el.attr("content"))
        {
            let content = content.trim();
            if !content.is_empty() {
                meta.description = Some(content.to_string());
            }
        }

        if meta.has_any_data() {
            Ok(Some(meta))
        } else {
            Ok(None)
        }
    }

    fn name(&self) -> &'static str {
        "Html"
    }

    fn priority(&self) -> u8 {
        2
    }
}
