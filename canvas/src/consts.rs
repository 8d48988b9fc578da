//! Shared numeric constants for the canvas crate.

// ── Hit-testing ─────────────────────────────────────────────────

/// Viewport hit slop in pixels around thin strokes.
pub const HIT_SLOP_PX: f64 = 8.0;

// ── Text ────────────────────────────────────────────────────────

/// Horizontal advance per glyph in page units at raster scale 1.
pub const TEXT_ADVANCE: f64 = 8.0;

/// Line height in page units at raster scale 1.
pub const TEXT_LINE_HEIGHT: f64 = 16.0;

// ── Rasterization ───────────────────────────────────────────────

/// Largest raster edge, in pixels, that `rasterize_region` will allocate.
pub const MAX_RASTER_PIXELS: u32 = 16_384;

/// Arrowhead length in page units.
pub const ARROW_HEAD_LEN: f64 = 12.0;

/// Arrowhead half-angle in radians (~30°).
pub const ARROW_HEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;

/// Segments used to approximate an ellipse outline.
pub const ELLIPSE_SEGMENTS: usize = 72;
