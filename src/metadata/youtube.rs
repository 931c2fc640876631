use once_cell::sync::Lazy;
use regex::Regex;

use crate::items::ItemType;
use crate::metadata::types::PageMeta;
use crate::metadata::MetaDeps;

/// One fixed pattern covering the known URL shapes; the id segment is
/// always exactly 11 characters.
static VIDEO_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/|[?&]v=)([A-Za-z0-9_-]{11})",
    )
    .expect("failed to compile video id regex")
});

pub fn is_video_url(url: &str) -> bool {
    url.contains("youtube.com") || url.contains("youtu.be")
}

/// First 11-character id found in a recognized position; None otherwise.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_owned()))
}

fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/maxresdefault.jpg")
}

/// Video-hosting rule: force the type, derive the id, synthesize a
/// thumbnail, and optionally enrich with a transcript and its summary.
/// Runs on the URL alone so a dead page still classifies correctly; the
/// transcript and summary are best-effort and never block item creation.
pub fn enrich(url: &str, meta: &mut PageMeta, deps: &MetaDeps) {
    if !is_video_url(url) {
        return;
    }

    meta.item_type = Some(ItemType::Video);

    let Some(video_id) = extract_video_id(url) else {
        log::debug!("no video id in {url}");
        return;
    };

    meta.image = Some(thumbnail_url(&video_id));
    meta.video_id = Some(video_id.clone());

    let Some(transcripts) = &deps.transcript else {
        return;
    };
    let Some(transcript) = transcripts.fetch(&video_id) else {
        return;
    };

    if let Some(llm) = &deps.llm {
        let title = meta.title.as_deref().unwrap_or("Untitled video");
        match llm.video_summary(title, &transcript) {
            Ok(summary) => meta.summary = Some(summary),
            Err(err) => log::warn!("video summary failed for {video_id}: {err}"),
        }
    }

    meta.transcript = Some(transcript);
}
