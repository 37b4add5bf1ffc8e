use anyhow::{Context, Result};
use eframe::egui::ColorImage;

/// Downloads and decodes the thumbnail advertised in the video metadata.
pub fn fetch_thumbnail(url: &str) -> Result<ColorImage> {
    // Blocking GET; callers run this on a blocking thread
    let resp = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("thumbnail request failed: {url}"))?
        .bytes()
        .context("thumbnail body could not be read")?;
    decode_thumbnail(&resp)
}

/// Converts encoded image bytes (JPEG, PNG, WebP) into an egui image.
pub fn decode_thumbnail(bytes: &[u8]) -> Result<ColorImage> {
    let img = image::load_from_memory(bytes)
        .context("thumbnail is not a supported image")?
        .to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, &img))
}
