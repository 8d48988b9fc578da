use image::RgbaImage;

use crate::camera::{Camera, Point};
use crate::doc::{DocStore, PageBounds, Shape, ShapeId, ShapeKind, ShapeSpec};
use crate::hit;
use crate::raster;
use crate::surface::{EditListener, RasterError, RasterOptions, SelectionListener, Surface};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// In-process drawing surface: the shape store, camera, selection, and
/// change listeners.
///
/// Student operations (`draw`, `erase`, `translate`) notify user-edit
/// listeners. Writes that arrive through the [`Surface`] trait do not.
#[derive(Default)]
pub struct EngineCore {
    pub doc: DocStore,
    pub camera: Camera,
    selection: Vec<ShapeId>,
    edit_listeners: Vec<EditListener>,
    selection_listeners: Vec<SelectionListener>,
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Student edits ---

    /// Add a shape drawn by the student.
    pub fn draw(&mut self, spec: ShapeSpec) -> ShapeId {
        let id = self.doc.create(spec);
        self.notify_edit();
        id
    }

    /// Erase shapes. Returns how many existed.
    pub fn erase(&mut self, ids: &[ShapeId]) -> usize {
        let removed = self.remove_all(ids);
        if removed > 0 {
            self.notify_edit();
        }
        removed
    }

    /// Move a shape by `(dx, dy)` page units. Returns false if it doesn't exist.
    pub fn translate(&mut self, id: &ShapeId, dx: f64, dy: f64) -> bool {
        let Some(shape) = self.doc.get_mut(id) else {
            return false;
        };
        shape.x += dx;
        shape.y += dy;
        if shape.kind == ShapeKind::Arrow {
            for key in ["a", "b"] {
                if let Some(end) = shape.props.get_mut(key) {
                    let x = end.get("x").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
                    let y = end.get("y").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
                    *end = serde_json::json!({ "x": x + dx, "y": y + dy });
                }
            }
        }
        self.notify_edit();
        true
    }

    // --- Selection ---

    /// Replace the selection. Unknown ids are dropped.
    pub fn select(&mut self, ids: &[ShapeId]) {
        let next: Vec<ShapeId> = ids.iter().copied().filter(|id| self.doc.get(id).is_some()).collect();
        self.set_selection(next);
    }

    /// Pointer-up at a viewport position: select the topmost shape there, or nothing.
    pub fn click(&mut self, viewport_pt: Point) -> Option<ShapeId> {
        let page_pt = self.camera.viewport_to_page(viewport_pt);
        let hit = hit::hit_test(page_pt, &self.doc, &self.camera);
        self.set_selection(hit.into_iter().collect());
        hit
    }

    /// The current selection.
    #[must_use]
    pub fn selection(&self) -> &[ShapeId] {
        &self.selection
    }

    // --- Camera ---

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    // --- Internals ---

    fn remove_all(&mut self, ids: &[ShapeId]) -> usize {
        let removed = ids.iter().filter(|id| self.doc.remove(id).is_some()).count();
        if self.selection.iter().any(|id| ids.contains(id)) {
            let next = self.selection.iter().copied().filter(|id| !ids.contains(id)).collect();
            self.set_selection(next);
        }
        removed
    }

    fn set_selection(&mut self, next: Vec<ShapeId>) {
        if next == self.selection {
            return;
        }
        self.selection = next;
        for listener in &mut self.selection_listeners {
            listener(self.selection.as_slice());
        }
    }

    fn notify_edit(&mut self) {
        for listener in &mut self.edit_listeners {
            listener();
        }
    }
}

impl Surface for EngineCore {
    fn list_shape_ids(&self) -> Vec<ShapeId> {
        self.doc.ids()
    }

    fn shape_page_bounds(&self, id: &ShapeId) -> Option<PageBounds> {
        self.doc.get(id).map(Shape::page_bounds)
    }

    fn shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.doc.get(id)
    }

    fn create_shape(&mut self, spec: ShapeSpec) -> ShapeId {
        self.doc.create(spec)
    }

    fn delete_shapes(&mut self, ids: &[ShapeId]) {
        self.remove_all(ids);
    }

    fn rasterize_region(
        &self,
        ids: &[ShapeId],
        bounds: &PageBounds,
        options: &RasterOptions,
    ) -> Result<RgbaImage, RasterError> {
        raster::rasterize(&self.doc, ids, bounds, options)
    }

    fn page_to_viewport(&self, page: Point) -> Point {
        self.camera.page_to_viewport(page)
    }

    fn on_user_edit(&mut self, listener: EditListener) {
        self.edit_listeners.push(listener);
    }

    fn on_selection_changed(&mut self, listener: SelectionListener) {
        self.selection_listeners.push(listener);
    }
}
