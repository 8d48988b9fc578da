//! Content bounds: the page-space frame a capture is taken in.

use canvas::doc::{PageBounds, ShapeId};
use canvas::surface::Surface;

/// Padding used for snapshot captures (chat, solution) where context helps.
pub const SNAPSHOT_PADDING: f64 = 20.0;

/// Page rectangle a capture covers, and the reference frame for the
/// normalized coordinates that come back from the tutor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturedBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl CapturedBounds {
    #[must_use]
    pub fn from_page(bounds: &PageBounds) -> Self {
        Self { min_x: bounds.min_x, min_y: bounds.min_y, width: bounds.width(), height: bounds.height() }
    }

    #[must_use]
    pub fn to_page(&self) -> PageBounds {
        PageBounds::from_rect(self.min_x, self.min_y, self.width, self.height)
    }

    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.min_x + self.width
    }

    #[must_use]
    pub fn max_y(&self) -> f64 {
        self.min_y + self.height
    }

    /// Grow every side by `padding` page units.
    #[must_use]
    pub fn padded(&self, padding: f64) -> Self {
        Self::from_page(&self.to_page().expand(padding))
    }
}

/// What a capture is for, which decides its padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePurpose {
    /// Vision analysis: zero padding so returned boxes map 1:1 onto the page.
    Analysis,
    /// Context snapshot for chat or solutions: a small margin.
    Snapshot,
}

impl CapturePurpose {
    #[must_use]
    pub fn padding(self) -> f64 {
        match self {
            Self::Analysis => 0.0,
            Self::Snapshot => SNAPSHOT_PADDING,
        }
    }
}

/// Union of the page bounds of `ids`. `None` when no listed shape exists.
#[must_use]
pub fn union_bounds<S: Surface + ?Sized>(surface: &S, ids: &[ShapeId]) -> Option<CapturedBounds> {
    ids.iter()
        .filter_map(|id| surface.shape_page_bounds(id))
        .reduce(|acc, b| acc.union(&b))
        .map(|b| CapturedBounds::from_page(&b))
}

/// Bounds of everything on the page, padded for `purpose`.
#[must_use]
pub fn content_bounds<S: Surface + ?Sized>(surface: &S, purpose: CapturePurpose) -> Option<CapturedBounds> {
    let ids = surface.list_shape_ids();
    union_bounds(surface, &ids).map(|b| b.padded(purpose.padding()))
}

#[cfg(test)]
#[path = "bounds_test.rs"]
mod tests;
