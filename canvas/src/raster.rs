//! CPU rasterization of a page region into an RGBA buffer.
//!
//! The output maps page point `(bounds.min_x, bounds.min_y)` to pixel
//! `(0, 0)` and scales by `options.scale`, so a normalized coordinate inside
//! the image corresponds exactly to the same fraction of `bounds`. Strokes are
//! stamped as discs along each segment; text uses the 8x8 bitmap font and is
//! drawn unrotated.

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgba, RgbaImage};

use crate::camera::Point;
use crate::consts::{ARROW_HEAD_ANGLE, ARROW_HEAD_LEN, ELLIPSE_SEGMENTS, MAX_RASTER_PIXELS, TEXT_LINE_HEIGHT};
use crate::doc::{DocStore, PageBounds, Props, Shape, ShapeId, ShapeKind};
use crate::surface::{RasterError, RasterOptions};

/// Render the listed shapes of `doc` clipped to `bounds`.
///
/// Unknown ids are skipped. Shapes are painted in z-order regardless of the
/// order of `ids`.
///
/// # Errors
///
/// Returns [`RasterError::NonFinite`] for NaN/infinite bounds or scale and
/// [`RasterError::TooLarge`] when either edge exceeds [`MAX_RASTER_PIXELS`].
pub fn rasterize(
    doc: &DocStore,
    ids: &[ShapeId],
    bounds: &PageBounds,
    options: &RasterOptions,
) -> Result<RgbaImage, RasterError> {
    let (width, height) = raster_size(bounds, options.scale)?;
    let mut img = RgbaImage::from_pixel(width, height, Rgba(options.background.unwrap_or([0, 0, 0, 0])));

    let mut shapes: Vec<&Shape> = ids.iter().filter_map(|id| doc.get(id)).collect();
    shapes.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));

    let mut painter = Painter { img: &mut img, origin: Point::new(bounds.min_x, bounds.min_y), scale: options.scale };
    for shape in shapes {
        painter.shape(shape);
    }
    Ok(img)
}

/// Pixel dimensions for `bounds` at `scale`. Degenerate axes get one pixel.
///
/// # Errors
///
/// See [`rasterize`].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn raster_size(bounds: &PageBounds, scale: f64) -> Result<(u32, u32), RasterError> {
    let w = bounds.width() * scale;
    let h = bounds.height() * scale;
    if !w.is_finite() || !h.is_finite() || !scale.is_finite() || scale <= 0.0 {
        return Err(RasterError::NonFinite);
    }
    let w = w.ceil().max(1.0) as u64;
    let h = h.ceil().max(1.0) as u64;
    if w > u64::from(MAX_RASTER_PIXELS) || h > u64::from(MAX_RASTER_PIXELS) {
        return Err(RasterError::TooLarge { width: w, height: h });
    }
    Ok((w as u32, h as u32))
}

struct Painter<'a> {
    img: &'a mut RgbaImage,
    origin: Point,
    scale: f64,
}

impl Painter<'_> {
    fn to_px(&self, p: Point) -> Point {
        Point::new((p.x - self.origin.x) * self.scale, (p.y - self.origin.y) * self.scale)
    }

    fn shape(&mut self, shape: &Shape) {
        let props = Props::new(&shape.props);
        let color = Rgba(shape.color.rgba());
        let width = props.stroke_width() * self.scale;
        let center = shape.center();
        let place = |p: Point| p.rotate_around(center, shape.rotation);

        match shape.kind {
            ShapeKind::Draw => {
                let points: Vec<Point> = props
                    .points()
                    .into_iter()
                    .map(|p| place(Point::new(shape.x + p.x, shape.y + p.y)))
                    .collect();
                if let [only] = points.as_slice() {
                    self.line(*only, *only, color, width);
                }
                self.polyline(&points, false, color, width);
            }
            ShapeKind::Rect => {
                let corners = [
                    Point::new(shape.x, shape.y),
                    Point::new(shape.x + shape.width, shape.y),
                    Point::new(shape.x + shape.width, shape.y + shape.height),
                    Point::new(shape.x, shape.y + shape.height),
                ]
                .map(place);
                self.polyline(&corners, true, color, width);
            }
            ShapeKind::Ellipse => {
                let (rx, ry) = (shape.width * 0.5, shape.height * 0.5);
                #[allow(clippy::cast_precision_loss)]
                let points: Vec<Point> = (0..ELLIPSE_SEGMENTS)
                    .map(|i| {
                        let t = std::f64::consts::TAU * i as f64 / ELLIPSE_SEGMENTS as f64;
                        place(Point::new(center.x + rx * t.cos(), center.y + ry * t.sin()))
                    })
                    .collect();
                self.polyline(&points, true, color, width);
            }
            ShapeKind::Arrow => {
                let (Some(a), Some(b)) = (props.a(), props.b()) else {
                    return;
                };
                self.line(a, b, color, width);
                let angle = (b.y - a.y).atan2(b.x - a.x);
                for side in [-1.0, 1.0] {
                    let theta = angle + std::f64::consts::PI + side * ARROW_HEAD_ANGLE;
                    let tip = Point::new(b.x + ARROW_HEAD_LEN * theta.cos(), b.y + ARROW_HEAD_LEN * theta.sin());
                    self.line(b, tip, color, width);
                }
            }
            ShapeKind::Text => {
                for (row, line) in props.text().split('\n').enumerate() {
                    #[allow(clippy::cast_precision_loss)]
                    let top = shape.y + 4.0 + row as f64 * TEXT_LINE_HEIGHT;
                    self.text(Point::new(shape.x + 4.0, top), line, color);
                }
            }
        }
    }

    fn polyline(&mut self, points: &[Point], closed: bool, color: Rgba<u8>, width: f64) {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], color, width);
        }
        if closed {
            if let (Some(first), Some(last)) = (points.first(), points.last()) {
                self.line(*last, *first, color, width);
            }
        }
    }

    /// Stamp discs along the segment `a`..`b` (page coordinates).
    #[allow(clippy::cast_possible_truncation)]
    fn line(&mut self, a: Point, b: Point, color: Rgba<u8>, width: f64) {
        let a = self.to_px(a);
        let b = self.to_px(b);
        let distance = a.distance(b);
        let steps = distance.max(1.0).ceil() as i32;
        let radius = (width.max(1.0) / 2.0).max(0.6);
        for step in 0..=steps {
            let t = f64::from(step) / f64::from(steps.max(1));
            self.disc(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t, radius, color);
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn disc(&mut self, cx: f64, cy: f64, radius: f64, color: Rgba<u8>) {
        let w = i64::from(self.img.width());
        let h = i64::from(self.img.height());
        let min_x = ((cx - radius).floor() as i64).max(0);
        let max_x = ((cx + radius).ceil() as i64).min(w - 1);
        let min_y = ((cy - radius).floor() as i64).max(0);
        let max_y = ((cy + radius).ceil() as i64).min(h - 1);
        let r2 = radius * radius;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                #[allow(clippy::cast_precision_loss)]
                let (dx, dy) = (x as f64 - cx, y as f64 - cy);
                if dx * dx + dy * dy <= r2 {
                    self.img.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }

    /// Draw one line of bitmap text with its top-left at `at` (page coordinates).
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn text(&mut self, at: Point, text: &str, color: Rgba<u8>) {
        let origin = self.to_px(at);
        let glyph_scale = self.scale.round().max(1.0) as i64;
        let w = i64::from(self.img.width());
        let h = i64::from(self.img.height());
        let mut cursor_x = origin.x.round() as i64;
        let top = origin.y.round() as i64;
        for ch in text.chars() {
            let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
                cursor_x += 8 * glyph_scale;
                continue;
            };
            for (row_idx, &row_bits) in (0_i64..).zip(glyph.iter()) {
                for col_idx in 0..8_i64 {
                    if (row_bits >> col_idx) & 1 == 0 {
                        continue;
                    }
                    for sy in 0..glyph_scale {
                        for sx in 0..glyph_scale {
                            let px = cursor_x + col_idx * glyph_scale + sx;
                            let py = top + row_idx * glyph_scale + sy;
                            if px >= 0 && py >= 0 && px < w && py < h {
                                self.img.put_pixel(px as u32, py as u32, color);
                            }
                        }
                    }
                }
            }
            cursor_x += 8 * glyph_scale;
        }
    }
}
