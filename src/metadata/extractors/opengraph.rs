use crate::metadata::extractors::MetadataExtractor;
use crate::metadata::types::PageMeta;

/// Open Graph / Twitter card tags from the document head.
pub struct OpenGraphExtractor;

impl OpenGraphExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for OpenGraphExtractor {
    fn extract(&self, _url: &str, html: &str) -> anyhow::Result<Option<PageMeta>> {
        let document = scraper::Html::parse_document(html);
        let head_selector = scraper::Selector::parse("head").unwrap();
        let meta_selector = scraper::Selector::parse("meta").unwrap();

        let Some(head) = document.select(&head_selector).next() else {
            return Ok(None);
        };

        let mut meta = PageMeta::default();

        for element in head.select(&meta_selector) {
            let meta_prop = element.attr("property").unwrap_or_default();
            let meta_key = element.attr("name").or(Some(meta_prop)).unwrap_or_default();
            let meta_value = element.attr("content").unwrap_or_default().trim();

            if meta_value.is_empty() {
                continue;
            }

            if meta.title.is_none()
                && ["og:title", "twitter:title"]
                    .into_iter()
                    .any(|name| name == meta_key)
            {
                meta.title = Some(meta_value.to_string());
            }

            if meta.description.is_none()
                && ["og:description", "twitter:description"]
                    .into_iter()
                    .any(|name| name == meta_key)
            {
                meta.description = Some(meta_value.to_string());
            }

            if meta.image.is_none()
                && ["og:image", "twitter:image"]
                    .into_iter()
                    .any(|name| name == meta_key)
            {
                meta.image = Some(meta_value.to_string());
            }

            if meta.site_name.is_none() && meta_key == "og:site_name" {
                meta.site_name = Some(meta_value.to_string());
            }

            if meta.og_type.is_none() && meta_key == "og:type" {
                meta.og_type = Some(meta_value.to_string());
            }
        }

        if meta.has_any_data() {
            Ok(Some(meta))
        } else {
            Ok(None)
        }
    }

    fn name(&self) -> &'static str {
        "OpenGraph"
    }

    fn priority(&self) -> u8 {
        1
    }
}
