use quick_xml::events::Event;
use quick_xml::Reader;
use std::time::Duration;

const TIMEDTEXT_URL: &str = "https://video.google.com/timedtext";
const TRANSCRIPT_TIMEOUT: Duration = Duration::from_secs(15);

/// Best-effort caption fetcher. Everything that can go wrong here turns
/// into None; a missing transcript is a normal state for a video.
#[derive(Clone, Debug, Default)]
pub struct TranscriptClient;

impl TranscriptClient {
    pub fn new() -> Self {
        Self
    }

    pub fn fetch(&self, video_id: &str) -> Option<String> {
        log::debug!("fetching transcript for {video_id}");

        let client = match reqwest::blocking::Client::builder()
            .timeout(TRANSCRIPT_TIMEOUT)
            .build()
        {
            Ok(client) => client,
            Err(err) => {
                log::warn!("transcript client build failed: {err}");
                return None;
            }
        };

        let resp = match client
            .get(TIMEDTEXT_URL)
            .query(&[("lang", "en"), ("v", video_id)])
            .send()
        {
            Ok(resp) => resp,
            Err(err) => {
                log::warn!("transcript fetch failed for {video_id}: {err}");
                return None;
            }
        };

        if !resp.status().is_success() {
            log::debug!("transcript endpoint returned {} for {video_id}", resp.status());
            return None;
        }

        let xml = resp.text().ok()?;
        let transcript = parse_timedtext(&xml)?;

        log::debug!(
            "transcript fetched for {video_id} ({} chars)",
            transcript.len()
        );
        Some(transcript)
    }
}

/// Joins every `<text>` segment into one whitespace-normalized string.
fn parse_timedtext(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut segments: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"text" => in_text = true,
            Ok(Event::End(e)) if e.name().as_ref() == b"text" => in_text = false,
            Ok(Event::Text(t)) if in_text => {
                if let Ok(text) = t.unescape() {
                    segments.push(text.into_owned());
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                log::debug!("transcript parse error: {err}");
                return None;
            }
            _ => {}
        }
    }

    let joined = segments.join(" ");
    let normalized = joined.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
