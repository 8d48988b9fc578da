#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point};
use crate::consts::HIT_SLOP_PX;
use crate::doc::{DocStore, ShapeId};

/// Topmost shape whose page bounds (grown by the viewport hit slop) contain `page_pt`.
#[must_use]
pub fn hit_test(page_pt: Point, doc: &DocStore, camera: &Camera) -> Option<ShapeId> {
    let slop = camera.viewport_dist_to_page(HIT_SLOP_PX);
    doc.sorted_shapes()
        .into_iter()
        .rev()
        .find(|shape| shape.page_bounds().expand(slop).contains(page_pt))
        .map(|shape| shape.id)
}
