//! Spatial deduplication of annotation anchors.

use canvas::camera::Point;
use canvas::surface::Surface;

use crate::tag;

/// Suppresses a new composite whose anchor falls within `radius` of one
/// already on the page or already placed in the current batch.
#[derive(Debug, Clone)]
pub struct SpatialDeduplicator {
    radius: f64,
    anchors: Vec<Point>,
}

impl SpatialDeduplicator {
    #[must_use]
    pub fn new(radius: f64) -> Self {
        Self { radius, anchors: Vec::new() }
    }

    /// Seed with the anchors of every live annotation on `surface`.
    #[must_use]
    pub fn from_surface<S: Surface + ?Sized>(surface: &S, radius: f64) -> Self {
        Self { radius, anchors: tag::annotation_anchors(surface) }
    }

    #[must_use]
    pub fn is_duplicate(&self, candidate: Point) -> bool {
        self.anchors.iter().any(|a| a.distance(candidate) < self.radius)
    }

    /// Record `candidate` if it is not a duplicate. Returns whether it was admitted.
    pub fn admit(&mut self, candidate: Point) -> bool {
        if self.is_duplicate(candidate) {
            return false;
        }
        self.anchors.push(candidate);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

#[cfg(test)]
#[path = "dedup_test.rs"]
mod tests;
