use std::path::Path;

/// Best-effort text extraction from an uploaded image. Any failure,
/// including the feature being compiled out, yields None; uploads never
/// block on OCR.
#[cfg(feature = "ocr")]
pub fn extract_text(path: &Path) -> Option<String> {
    log::debug!("starting OCR for {}", path.display());

    let mut engine = match leptess::LepTess::new(None, "eng") {
        Ok(engine) => engine,
        Err(err) => {
            log::warn!("ocr engine init failed: {err}");
            return None;
        }
    };

    if let Err(err) = engine.set_image(path) {
        log::warn!("ocr could not read {}: {err}", path.display());
        return None;
    }

    match engine.get_utf8_text() {
        Ok(text) => {
            let text = text.trim().to_string();
            log::debug!("extracted {} characters from image", text.chars().count());
            Some(text)
        }
        Err(err) => {
            log::warn!("ocr failed for {}: {err}", path.display());
            None
        }
    }
}

#[cfg(not(feature = "ocr"))]
pub fn extract_text(path: &Path) -> Option<String> {
    log::debug!("ocr support not compiled in, skipping {}", path.display());
    None
}
