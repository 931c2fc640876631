use crate::items::ItemType;

const VIDEO_DOMAINS: [&str; 2] = ["youtube.com", "youtu.be"];
const MARKETPLACE_DOMAINS: [&str; 2] = ["amazon", "flipkart"];

/// Content below this length with no URL reads as a quick note.
const NOTE_LENGTH_THRESHOLD: usize = 200;

/// Fallback content-type detector. Callers prefer an explicitly supplied
/// type, then whatever metadata extraction inferred; this runs last and
/// never fails.
pub fn detect_type(url: Option<&str>, content: Option<&str>) -> ItemType {
    if let Some(url) = url.filter(|url| !url.is_empty()) {
        if VIDEO_DOMAINS.iter().any(|domain| url.contains(domain)) {
            return ItemType::Video;
        }
        if MARKETPLACE_DOMAINS.iter().any(|domain| url.contains(domain)) {
            return ItemType::Product;
        }
        return ItemType::Article;
    }

    if let Some(content) = content.filter(|content| !content.is_empty()) {
        if content.starts_with('-') || content.starts_with('*') {
            return ItemType::Todo;
        }
        if content.chars().count() < NOTE_LENGTH_THRESHOLD {
            return ItemType::Note;
        }
    }

    ItemType::Other
}
