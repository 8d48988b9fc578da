//! Document model: shapes, their properties, and the in-memory store.
//!
//! This module defines the data types that describe what is on the page
//! (`Shape`, `ShapeKind`, `Color`), the creation request used by both the
//! student's pen and programmatic writers (`ShapeSpec`), a typed accessor for
//! the open-ended `props` JSON bag (`Props`), the page-space rectangle type
//! (`PageBounds`), and the runtime store that owns all live shapes
//! (`DocStore`).
//!
//! Shapes carry a second open JSON object, `meta`, which the drawing surface
//! never interprets. Writers that need to recognise their own shapes later
//! (for example, tutor annotations) tag them there.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Point;

/// Unique identifier for a shape.
pub type ShapeId = Uuid;

// =============================================================================
// PAGE BOUNDS
// =============================================================================

/// Axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl PageBounds {
    /// Build bounds from a top-left corner and a size.
    #[must_use]
    pub fn from_rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { min_x: x, min_y: y, max_x: x + width, max_y: y + height }
    }

    /// Smallest bounds enclosing every point, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            let b = Self { min_x: p.x, min_y: p.y, max_x: p.x, max_y: p.y };
            Some(match acc {
                Some(acc) => Self::union(&acc, &b),
                None => b,
            })
        })
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) * 0.5, (self.min_y + self.max_y) * 0.5)
    }

    /// Smallest bounds enclosing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &PageBounds) -> PageBounds {
        PageBounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grow the bounds by `padding` on every side.
    #[must_use]
    pub fn expand(&self, padding: f64) -> PageBounds {
        PageBounds {
            min_x: self.min_x - padding,
            min_y: self.min_y - padding,
            max_x: self.max_x + padding,
            max_y: self.max_y + padding,
        }
    }

    /// Returns `true` if `p` lies inside or on the edge.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

// =============================================================================
// SHAPES
// =============================================================================

/// The kind of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Freehand pen stroke; points stored in `props.points` relative to the shape origin.
    Draw,
    /// Axis-aligned rectangle outline.
    Rect,
    /// Ellipse inscribed within the bounding box.
    Ellipse,
    /// Directed arrow between page-space endpoints `props.a` and `props.b`.
    Arrow,
    /// Single- or multi-line text label (`props.text`).
    Text,
}

/// Named stroke palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Color {
    Black,
    Grey,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    LightBlue,
    Violet,
}

impl Color {
    /// Opaque RGBA value used by the rasterizer.
    #[must_use]
    pub fn rgba(self) -> [u8; 4] {
        match self {
            Self::Black => [0x1D, 0x1D, 0x1D, 0xFF],
            Self::Grey => [0x9F, 0xA8, 0xB2, 0xFF],
            Self::Red => [0xE0, 0x31, 0x31, 0xFF],
            Self::Orange => [0xE1, 0x6E, 0x19, 0xFF],
            Self::Yellow => [0xF1, 0xAC, 0x4B, 0xFF],
            Self::Green => [0x09, 0x92, 0x68, 0xFF],
            Self::Blue => [0x44, 0x65, 0xE9, 0xFF],
            Self::LightBlue => [0x4B, 0xA1, 0xF1, 0xFF],
            Self::Violet => [0xAE, 0x3E, 0xC9, 0xFF],
        }
    }
}

/// A shape as stored in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    /// Unique identifier for this shape.
    pub id: ShapeId,
    /// Primitive type.
    pub kind: ShapeKind,
    /// Left edge of the unrotated bounding box in page coordinates.
    pub x: f64,
    /// Top edge of the unrotated bounding box in page coordinates.
    pub y: f64,
    /// Width of the bounding box in page units.
    pub width: f64,
    /// Height of the bounding box in page units.
    pub height: f64,
    /// Clockwise rotation in radians around the bounding-box center.
    pub rotation: f64,
    /// Stacking order; lower values are drawn beneath higher values.
    pub z_index: i64,
    /// Stroke color.
    pub color: Color,
    /// Open-ended per-kind properties (points, endpoints, text, etc.).
    pub props: serde_json::Value,
    /// Writer-owned metadata; never interpreted by the surface.
    pub meta: serde_json::Value,
}

impl Shape {
    /// Center of the bounding box, which is also the rotation pivot.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Axis-aligned page bounds of the (possibly rotated) shape.
    #[must_use]
    pub fn page_bounds(&self) -> PageBounds {
        let local = PageBounds::from_rect(self.x, self.y, self.width, self.height);
        if self.rotation == 0.0 {
            return local;
        }
        let center = self.center();
        let corners = [
            Point::new(local.min_x, local.min_y),
            Point::new(local.max_x, local.min_y),
            Point::new(local.max_x, local.max_y),
            Point::new(local.min_x, local.max_y),
        ];
        PageBounds::from_points(corners.map(|c| c.rotate_around(center, self.rotation))).unwrap_or(local)
    }
}

/// A request to create a shape. The store assigns the id and z-index.
#[derive(Debug, Clone)]
pub struct ShapeSpec {
    pub kind: ShapeKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub color: Color,
    pub props: serde_json::Value,
    pub meta: serde_json::Value,
}

impl ShapeSpec {
    /// A black, unrotated shape with empty props and meta.
    #[must_use]
    pub fn new(kind: ShapeKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            kind,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            color: Color::Black,
            props: serde_json::json!({}),
            meta: serde_json::json!({}),
        }
    }

    /// A text label whose box is estimated from the text length.
    #[must_use]
    pub fn text(x: f64, y: f64, text: &str) -> Self {
        let (width, height) = estimate_text_size(text);
        Self::new(ShapeKind::Text, x, y, width, height).with_props(serde_json::json!({ "text": text }))
    }

    /// An arrow from `a` to `b`; the box spans both endpoints.
    #[must_use]
    pub fn arrow(a: Point, b: Point) -> Self {
        let bounds = PageBounds::from_points([a, b]).unwrap_or(PageBounds::from_rect(a.x, a.y, 0.0, 0.0));
        Self::new(ShapeKind::Arrow, bounds.min_x, bounds.min_y, bounds.width(), bounds.height())
            .with_props(serde_json::json!({ "a": { "x": a.x, "y": a.y }, "b": { "x": b.x, "y": b.y } }))
    }

    /// A freehand pen stroke through page-space `points`. The box covers the
    /// points grown by half the stroke width, and the stored points are
    /// relative to the box origin.
    #[must_use]
    pub fn stroke(points: &[Point], stroke_width: f64) -> Self {
        let half = stroke_width.max(0.0) / 2.0;
        let bounds = PageBounds::from_points(points.iter().copied())
            .unwrap_or(PageBounds::from_rect(0.0, 0.0, 0.0, 0.0))
            .expand(half);
        let relative: Vec<[f64; 2]> = points.iter().map(|p| [p.x - bounds.min_x, p.y - bounds.min_y]).collect();
        Self::new(ShapeKind::Draw, bounds.min_x, bounds.min_y, bounds.width(), bounds.height())
            .with_props(serde_json::json!({ "points": relative, "stroke_width": stroke_width }))
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_props(mut self, props: serde_json::Value) -> Self {
        self.props = props;
        self
    }

    #[must_use]
    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = meta;
        self
    }

    /// Materialize the spec with an assigned id and z-index.
    #[must_use]
    pub fn into_shape(self, id: ShapeId, z_index: i64) -> Shape {
        Shape {
            id,
            kind: self.kind,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            rotation: self.rotation,
            z_index,
            color: self.color,
            props: self.props,
            meta: self.meta,
        }
    }
}

/// Rough text box size in page units: 8 units of advance per character at
/// the default label scale, 16 units of line height, plus a small margin.
#[must_use]
pub fn estimate_text_size(text: &str) -> (f64, f64) {
    let lines: Vec<&str> = text.split('\n').collect();
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let (cols, rows) = (longest as f64, lines.len().max(1) as f64);
    (cols * crate::consts::TEXT_ADVANCE + 8.0, rows * crate::consts::TEXT_LINE_HEIGHT + 8.0)
}

// =============================================================================
// PROPS
// =============================================================================

/// Typed access to common props fields from a `Shape.props` JSON value.
pub struct Props<'a> {
    value: &'a serde_json::Value,
}

impl<'a> Props<'a> {
    /// Wrap a reference to a `props` JSON value for typed access.
    #[must_use]
    pub fn new(value: &'a serde_json::Value) -> Self {
        Self { value }
    }

    /// Label text. Empty string when absent.
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.value
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    /// Stroke width in page units. Defaults to `2.0` when absent.
    #[must_use]
    pub fn stroke_width(&self) -> f64 {
        self.value
            .get("stroke_width")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(2.0)
    }

    /// Pen points of a `Draw` shape, relative to the shape origin.
    #[must_use]
    pub fn points(&self) -> Vec<Point> {
        self.value
            .get("points")
            .and_then(serde_json::Value::as_array)
            .map(|arr| arr.iter().filter_map(parse_pair).collect())
            .unwrap_or_default()
    }

    /// Tail endpoint of an arrow in page coordinates.
    #[must_use]
    pub fn a(&self) -> Option<Point> {
        self.value.get("a").and_then(parse_point)
    }

    /// Head endpoint of an arrow in page coordinates.
    #[must_use]
    pub fn b(&self) -> Option<Point> {
        self.value.get("b").and_then(parse_point)
    }
}

fn parse_point(v: &serde_json::Value) -> Option<Point> {
    let x = v.get("x")?.as_f64()?;
    let y = v.get("y")?.as_f64()?;
    Some(Point::new(x, y))
}

fn parse_pair(v: &serde_json::Value) -> Option<Point> {
    let arr = v.as_array()?;
    let x = arr.first()?.as_f64()?;
    let y = arr.get(1)?.as_f64()?;
    Some(Point::new(x, y))
}

// =============================================================================
// STORE
// =============================================================================

/// In-memory store of shapes.
pub struct DocStore {
    shapes: HashMap<ShapeId, Shape>,
    next_z: i64,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { shapes: HashMap::new(), next_z: 0 }
    }

    /// Create a shape from a spec on top of everything else and return its id.
    pub fn create(&mut self, spec: ShapeSpec) -> ShapeId {
        let id = Uuid::new_v4();
        let z = self.next_z;
        self.next_z += 1;
        self.shapes.insert(id, spec.into_shape(id, z));
        id
    }

    /// Insert or replace a shape. If a shape with the same `id` already exists
    /// it is overwritten.
    pub fn insert(&mut self, shape: Shape) {
        self.next_z = self.next_z.max(shape.z_index + 1);
        self.shapes.insert(shape.id, shape);
    }

    /// Remove a shape by id, returning it if it was present.
    pub fn remove(&mut self, id: &ShapeId) -> Option<Shape> {
        self.shapes.remove(id)
    }

    /// Return a reference to a shape by id.
    #[must_use]
    pub fn get(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    /// Return a mutable reference to a shape by id.
    pub fn get_mut(&mut self, id: &ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(id)
    }

    /// Return all shapes sorted by `(z_index, id)` for draw order.
    #[must_use]
    pub fn sorted_shapes(&self) -> Vec<&Shape> {
        let mut shapes: Vec<&Shape> = self.shapes.values().collect();
        shapes.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        shapes
    }

    /// Ids of all shapes in draw order.
    #[must_use]
    pub fn ids(&self) -> Vec<ShapeId> {
        self.sorted_shapes().into_iter().map(|s| s.id).collect()
    }

    /// Number of shapes currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Returns `true` if the store contains no shapes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

impl Default for DocStore {
    fn default() -> Self {
        Self::new()
    }
}
