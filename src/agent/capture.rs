//! Canonical payload builders for every capture surface. Each returns an
//! `ItemDraft` that goes through the same submit-or-queue entry point, so
//! offline handling is uniform regardless of where the capture came from.

use crate::items::{ItemDraft, ItemType};

const TITLE_PREVIEW_LEN: usize = 50;

fn preview(text: &str) -> String {
    if text.chars().count() > TITLE_PREVIEW_LEN {
        let cut: String = text.chars().take(TITLE_PREVIEW_LEN).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

fn truncated(text: &str) -> String {
    text.chars().take(TITLE_PREVIEW_LEN).collect()
}

/// Whole-page save.
pub fn page(title: &str, url: &str) -> ItemDraft {
    ItemDraft {
        title: Some(title.to_string()),
        url: Some(url.to_string()),
        content: Some(String::new()),
        ..Default::default()
    }
}

/// Selected text from a page.
pub fn selection(page_title: &str, url: &str, text: &str) -> ItemDraft {
    ItemDraft {
        title: Some(format!("Selection from {}", truncated(page_title))),
        content: Some(text.to_string()),
        url: Some(url.to_string()),
        tags: vec!["selection".to_string()],
        item_type: Some(ItemType::Note),
        ..Default::default()
    }
}

/// Quick note, optionally tagged.
pub fn note(text: &str, tags: Vec<String>) -> ItemDraft {
    ItemDraft {
        title: Some(preview(text)),
        content: Some(text.to_string()),
        tags,
        item_type: Some(ItemType::Note),
        ..Default::default()
    }
}

/// Clipboard contents saved as a note.
pub fn clipboard_note(text: &str, url: Option<&str>) -> ItemDraft {
    ItemDraft {
        title: Some(preview(text)),
        content: Some(text.to_string()),
        url: url.map(String::from),
        tags: vec!["clipboard".to_string()],
        item_type: Some(ItemType::Note),
        ..Default::default()
    }
}

/// A link picked off a page.
pub fn link(link_url: &str, link_text: Option<&str>, page_title: &str) -> ItemDraft {
    ItemDraft {
        title: Some(
            link_text
                .filter(|text| !text.is_empty())
                .unwrap_or("Saved Link")
                .to_string(),
        ),
        url: Some(link_url.to_string()),
        content: Some(format!("Saved from {page_title}")),
        tags: vec!["link".to_string()],
        ..Default::default()
    }
}

/// An image picked off a page.
pub fn image(src_url: &str, page_url: &str, page_title: &str) -> ItemDraft {
    ItemDraft {
        title: Some("Saved Image".to_string()),
        image_url: Some(src_url.to_string()),
        url: Some(page_url.to_string()),
        content: Some(format!("Image from {page_title}")),
        item_type: Some(ItemType::Image),
        tags: vec!["image".to_string()],
        ..Default::default()
    }
}

/// A captured screenshot, after its image has been uploaded.
pub fn screenshot(
    page_title: &str,
    page_url: &str,
    image_url: String,
    ocr_text: Option<String>,
) -> ItemDraft {
    ItemDraft {
        title: Some(format!("Screenshot - {page_title}")),
        content: Some(format!("Screenshot captured from {page_url}")),
        url: Some(page_url.to_string()),
        image_url: Some(image_url),
        item_type: Some(ItemType::Image),
        tags: vec!["screenshot".to_string()],
        ocr_text,
        ..Default::default()
    }
}

/// A full conversation captured from a recognized AI-chat site.
pub fn conversation(site_name: &str, page_title: &str, url: &str, text: &str) -> ItemDraft {
    ItemDraft {
        title: Some(format!("{site_name} - {page_title}")),
        content: Some(text.to_string()),
        url: Some(url.to_string()),
        tags: vec![
            "ai-chat".to_string(),
            site_name.to_lowercase(),
            "conversation".to_string(),
        ],
        item_type: Some(ItemType::Note),
        ..Default::default()
    }
}

/// Reading-mode extraction: the page's main text, classified server-side.
pub fn reading(title: &str, url: &str, text: &str) -> ItemDraft {
    ItemDraft {
        title: Some(title.to_string()),
        url: Some(url.to_string()),
        content: Some(text.to_string()),
        tags: vec!["reading-mode".to_string()],
        ..Default::default()
    }
}
