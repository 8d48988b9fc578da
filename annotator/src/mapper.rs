//! Normalized box → absolute page rectangle.

use canvas::camera::Point;
use tracing::debug;

use crate::annotation::NormBox;
use crate::bounds::CapturedBounds;

/// Extent substituted for a zero or non-finite captured width/height.
pub const FALLBACK_EXTENT: f64 = 500.0;

/// An axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageRect {
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }
}

/// Map `b` into page space using the frame the image was captured in.
///
/// `bounds` must be the very instance that produced the image the tutor saw.
#[must_use]
pub fn map_box(b: &NormBox, bounds: &CapturedBounds) -> PageRect {
    let width = extent(bounds.width, "width");
    let height = extent(bounds.height, "height");
    PageRect {
        x: origin(bounds.min_x) + b.x * width,
        y: origin(bounds.min_y) + b.y * height,
        width: b.width * width,
        height: b.height * height,
    }
}

fn extent(value: f64, axis: &'static str) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        debug!(axis, value, fallback = FALLBACK_EXTENT, "mapper: degenerate bounds, using fallback extent");
        FALLBACK_EXTENT
    }
}

fn origin(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
#[path = "mapper_test.rs"]
mod tests;
