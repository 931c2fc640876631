pub mod html;
pub mod opengraph;

use crate::metadata::types::PageMeta;

/// One independent metadata extraction strategy. A strategy may fail on
/// its own (parse miss, malformed markup) without affecting the others;
/// the registry logs the outcome and moves on.
pub trait MetadataExtractor: Send + Sync {
    /// Returns Ok(None) when the strategy has nothing to contribute.
    fn extract(&self, url: &str, html: &str) -> anyhow::Result<Option<PageMeta>>;

    fn name(&self) -> &'static str;

    /// Merge ordering. Lower = higher priority (its fields win).
    fn priority(&self) -> u8;
}

pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn MetadataExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: vec![
                Box::new(opengraph::OpenGraphExtractor::new()),
                Box::new(html::HtmlExtractor::new()),
            ],
        }
    }

    /// Run every strategy over the same fetched document and merge the
    /// contributions by priority.
    pub fn extract(&self, url: &str, html: &str) -> PageMeta {
        let mut results: Vec<(u8, PageMeta)> = Vec::new();

        for extractor in &self.extractors {
            let name = extractor.name();
            match extractor.extract(url, html) {
                Ok(Some(meta)) => {
                    log::debug!(
                        "extractor={name} outcome=success fields=[{}]",
                        describe_fields(&meta)
                    );
                    results.push((extractor.priority(), meta));
                }
                Ok(None) => log::debug!("extractor={name} outcome=skip"),
                Err(err) => log::warn!("extractor={name} outcome=error err={err}"),
            }
        }

        merge_results(results)
    }
}

/// Merge by priority: for each field, the first non-empty value wins.
fn merge_results(mut results: Vec<(u8, PageMeta)>) -> PageMeta {
    results.sort_by_key(|(priority, _)| *priority);

    let mut merged = PageMeta::default();

    for (_priority, m) in &results {
        if merged.title.is_none() {
            merged.title.clone_from(&m.title);
        }
        if merged.description.is_none() {
            merged.description.clone_from(&m.description);
        }
        if merged.image.is_none() {
            merged.image.clone_from(&m.image);
        }
        if merged.price.is_none() {
            merged.price.clone_from(&m.price);
        }
        if merged.author.is_none() {
            merged.author.clone_from(&m.author);
        }
        if merged.site_name.is_none() {
            merged.site_name.clone_from(&m.site_name);
        }
        if merged.og_type.is_none() {
            merged.og_type.clone_from(&m.og_type);
        }
        if merged.video_id.is_none() {
            merged.video_id.clone_from(&m.video_id);
        }
        if merged.item_type.is_none() {
            merged.item_type = m.item_type;
        }
    }

    merged
}

fn describe_fields(m: &PageMeta) -> String {
    let mut fields = Vec::new();
    if m.title.is_some() {
        fields.push("title");
    }
    if m.description.is_some() {
        fields.push("description");
    }
    if m.image.is_some() {
        fields.push("image");
    }
    if m.price.is_some() {
        fields.push("price");
    }
    if m.author.is_some() {
        fields.push("author");
    }
    if m.site_name.is_some() {
        fields.push("site_name");
    }
    if m.og_type.is_some() {
        fields.push("og_type");
    }
    fields.join(",")
}
