//! Image capture: rasterize the content region and encode it for the wire.
//!
//! Rasterization needs the surface, so it happens under the surface lock.
//! PNG and base64 encoding do not, and run on the blocking pool after the
//! lock is released.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use canvas::surface::{RasterError, RasterOptions, Surface};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tokio::sync::Mutex;
use tracing::debug;

use crate::bounds::{self, CapturePurpose, CapturedBounds};

/// An encoded capture and the frame it was taken in.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub bounds: CapturedBounds,
    pub png: Vec<u8>,
    /// `data:image/png;base64,...`
    pub data_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("canvas has no content")]
    NoContent,

    #[error("rasterization failed: {0}")]
    Raster(#[from] RasterError),

    #[error("png encoding failed: {0}")]
    Encode(String),

    #[error("encoder task failed: {0}")]
    Join(String),
}

/// Rasterize every shape on the page inside the bounds for `purpose`.
///
/// # Errors
///
/// [`CaptureError::NoContent`] on an empty page, [`CaptureError::Raster`] if
/// the surface refuses the region.
pub fn rasterize<S: Surface + ?Sized>(
    surface: &S,
    purpose: CapturePurpose,
) -> Result<(CapturedBounds, RgbaImage), CaptureError> {
    let ids = surface.list_shape_ids();
    let bounds = bounds::union_bounds(surface, &ids)
        .ok_or(CaptureError::NoContent)?
        .padded(purpose.padding());
    let pixels = surface.rasterize_region(&ids, &bounds.to_page(), &RasterOptions::default())?;
    debug!(shape_count = ids.len(), width = pixels.width(), height = pixels.height(), "capture: rasterized");
    Ok((bounds, pixels))
}

/// Encode pixels as PNG plus a data URL.
///
/// # Errors
///
/// Returns [`CaptureError::Encode`] if the PNG encoder fails.
pub fn encode_png(bounds: CapturedBounds, pixels: &RgbaImage) -> Result<CapturedImage, CaptureError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(pixels.as_raw(), pixels.width(), pixels.height(), ExtendedColorType::Rgba8)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    let data_url = format!("data:image/png;base64,{}", STANDARD.encode(&png));
    Ok(CapturedImage { bounds, png, data_url })
}

/// Capture the page as one awaitable step.
///
/// The surface lock is held only while rasterizing.
///
/// # Errors
///
/// Any [`CaptureError`]; all of them are recoverable.
pub async fn capture<S: Surface>(surface: &Mutex<S>, purpose: CapturePurpose) -> Result<CapturedImage, CaptureError> {
    let (bounds, pixels) = {
        let guard = surface.lock().await;
        rasterize(&*guard, purpose)?
    };
    tokio::task::spawn_blocking(move || encode_png(bounds, &pixels))
        .await
        .map_err(|e| CaptureError::Join(e.to_string()))?
}

#[cfg(test)]
#[path = "capture_test.rs"]
mod tests;
