//! The narrow surface a writer needs from the drawing canvas.
//!
//! Anything that places content on the page programmatically (the tutor's
//! annotation engine, the solution writer) talks to the canvas only through
//! [`Surface`]. Programmatic writes through this trait never count as user
//! activity: only edits made by the student fire [`Surface::on_user_edit`]
//! listeners.

use image::RgbaImage;

use crate::camera::Point;
use crate::doc::{PageBounds, Shape, ShapeId, ShapeSpec};

/// Called after every user-originated edit.
pub type EditListener = Box<dyn FnMut() + Send>;

/// Called with the full selection whenever it changes.
pub type SelectionListener = Box<dyn FnMut(&[ShapeId]) + Send>;

/// Opaque white, the background used for vision captures.
pub const WHITE: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Rasterization parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Pixels per page unit.
    pub scale: f64,
    /// Fill color painted before any shape. `None` leaves pixels transparent.
    pub background: Option<[u8; 4]>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self { scale: 1.0, background: Some(WHITE) }
    }
}

/// Reasons a region could not be rasterized.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RasterError {
    /// The region exceeds the largest raster the surface will allocate.
    #[error("region too large ({width}x{height} px)")]
    TooLarge { width: u64, height: u64 },

    /// Bounds or scale contained NaN or infinity.
    #[error("region has non-finite bounds or scale")]
    NonFinite,
}

/// Operations a programmatic writer may perform on the drawing canvas.
pub trait Surface: Send {
    /// Ids of every shape on the current page, in draw order.
    fn list_shape_ids(&self) -> Vec<ShapeId>;

    /// Page-space bounds of a shape, or `None` if it does not exist.
    fn shape_page_bounds(&self, id: &ShapeId) -> Option<PageBounds>;

    /// Read a shape by id.
    fn shape(&self, id: &ShapeId) -> Option<&Shape>;

    /// Create a shape. Never fires user-edit listeners.
    fn create_shape(&mut self, spec: ShapeSpec) -> ShapeId;

    /// Delete shapes by id; unknown ids are ignored. Never fires user-edit listeners.
    fn delete_shapes(&mut self, ids: &[ShapeId]);

    /// Render the listed shapes clipped to `bounds`.
    ///
    /// # Errors
    ///
    /// Returns a [`RasterError`] if the region is too large or non-finite.
    fn rasterize_region(
        &self,
        ids: &[ShapeId],
        bounds: &PageBounds,
        options: &RasterOptions,
    ) -> Result<RgbaImage, RasterError>;

    /// Convert a page point to viewport (screen) coordinates.
    fn page_to_viewport(&self, page: Point) -> Point;

    /// Register a listener for user-originated edits.
    fn on_user_edit(&mut self, listener: EditListener);

    /// Register a listener for selection changes.
    fn on_selection_changed(&mut self, listener: SelectionListener);
}
