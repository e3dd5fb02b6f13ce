use image::imageops::FilterType;
use serde::Serialize;

use crate::error::AppError;

/// Display box for probed thumbnails, a 16:9 presentation.
pub const THUMB_WIDTH: u32 = 280;
pub const THUMB_HEIGHT: u32 = 158;

/// A decoded, display-ready thumbnail.
#[derive(Clone, PartialEq, Serialize)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 pixels, row-major.
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thumbnail")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// GET the image and scale it into the fixed display box. Any failure here
/// is reported as a value; callers log it and leave the thumbnail slot
/// empty.
pub async fn fetch_thumbnail(url: &str) -> Result<Thumbnail, AppError> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| AppError::Thumbnail(e.to_string()))?;
    if !response.status().is_success() {
        return Err(AppError::Thumbnail(format!("HTTP {}", response.status())));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::Thumbnail(e.to_string()))?;

    decode_and_scale(&bytes)
}

fn decode_and_scale(bytes: &[u8]) -> Result<Thumbnail, AppError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| AppError::Thumbnail(format!("decode failed: {e}")))?
        .resize_exact(THUMB_WIDTH, THUMB_HEIGHT, FilterType::Lanczos3)
        .to_rgba8();
    Ok(Thumbnail {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}
