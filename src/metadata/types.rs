use crate::items::{ItemMetadata, ItemType};

pub const TITLE_MAX_LEN: usize = 500;
pub const DESCRIPTION_MAX_LEN: usize = 1000;

/// What metadata extraction learned about one page. Each extraction
/// strategy contributes a partial record; the merged result is folded into
/// the item at creation time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Option<String>,
    pub author: Option<String>,
    pub site_name: Option<String>,
    pub og_type: Option<String>,
    pub video_id: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,

    /// Type inferred by domain rules or the article heuristic. Distinct
    /// from `og_type`, which is the raw og:type hint.
    pub item_type: Option<ItemType>,
}

impl PageMeta {
    pub fn has_any_data(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.image.is_some()
            || self.price.is_some()
            || self.author.is_some()
            || self.site_name.is_some()
            || self.og_type.is_some()
            || self.video_id.is_some()
            || self.item_type.is_some()
    }

    pub fn to_item_metadata(&self) -> ItemMetadata {
        ItemMetadata {
            description: self.description.clone(),
            image: self.image.clone(),
            price: self.price.clone(),
            author: self.author.clone(),
            site_name: self.site_name.clone(),
            og_type: self.og_type.clone(),
            video_id: self.video_id.clone(),
            transcript: self.transcript.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Character-safe prefix truncation.
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Trim and cap the free-text fields before the record leaves the
/// normalizer.
pub fn truncate_fields(meta: &mut PageMeta) {
    if let Some(title) = &meta.title {
        meta.title = Some(truncate_chars(title.trim(), TITLE_MAX_LEN));
    }
    if let Some(description) = &meta.description {
        meta.description = Some(truncate_chars(description.trim(), DESCRIPTION_MAX_LEN));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_caps_title_and_description() {
        let mut meta = PageMeta {
            title: Some("t".repeat(600)),
            description: Some("d".repeat(1200)),
            ..Default::default()
        };
        truncate_fields(&mut meta);
        assert_eq!(meta.title.as_ref().unwrap().chars().count(), TITLE_MAX_LEN);
        assert_eq!(
            meta.description.as_ref().unwrap().chars().count(),
            DESCRIPTION_MAX_LEN
        );
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        let title = "é".repeat(501);
        let mut meta = PageMeta {
            title: Some(title),
            ..Default::default()
        };
        truncate_fields(&mut meta);
        assert_eq!(meta.title.as_ref().unwrap().chars().count(), 500);
    }

    #[test]
    fn short_fields_pass_through_trimmed() {
        let mut meta = PageMeta {
            title: Some("  A Title  ".into()),
            description: Some(" desc ".into()),
            ..Default::default()
        };
        truncate_fields(&mut meta);
        assert_eq!(meta.title.as_deref(), Some("A Title"));
        assert_eq!(meta.description.as_deref(), Some("desc"));
    }
}
