#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

/// A point in either viewport or page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Rotate this point around `center` by `radians` (clockwise in page space, y down).
    #[must_use]
    pub fn rotate_around(self, center: Point, radians: f64) -> Point {
        if radians == 0.0 {
            return self;
        }
        let (sin, cos) = radians.sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Point { x: center.x + dx * cos - dy * sin, y: center.y + dx * sin + dy * cos }
    }
}

/// Camera state for pan/zoom over the page.
///
/// `pan_x` / `pan_y` are in CSS pixels.
/// `zoom` is a scale factor (1.0 = no zoom).
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    /// Convert a viewport point (CSS pixels) to page coordinates.
    #[must_use]
    pub fn viewport_to_page(&self, viewport: Point) -> Point {
        Point {
            x: (viewport.x - self.pan_x) / self.zoom,
            y: (viewport.y - self.pan_y) / self.zoom,
        }
    }

    /// Convert a page point to viewport coordinates (CSS pixels).
    #[must_use]
    pub fn page_to_viewport(&self, page: Point) -> Point {
        Point {
            x: page.x * self.zoom + self.pan_x,
            y: page.y * self.zoom + self.pan_y,
        }
    }

    /// Convert a viewport distance (pixels) to a page distance.
    #[must_use]
    pub fn viewport_dist_to_page(&self, viewport_dist: f64) -> f64 {
        viewport_dist / self.zoom
    }
}
