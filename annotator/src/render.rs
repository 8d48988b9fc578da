//! Annotation rendering: turns mapped annotations into canvas shapes.
//!
//! DESIGN
//! ======
//! A boxed annotation becomes up to three linked shapes sharing one
//! `annotationId`:
//!
//! | Type | Shapes |
//! |------|--------|
//! | warning, info, suggestion | ellipse marker + label + arrow connector |
//! | reference | label only |
//! | success | one badge above the content, no region |
//!
//! The marker encloses the flagged box plus a margin of 20% of the box's
//! larger side. Labels sit to the right of their marker; when two labels
//! would overlap they are stacked downward. Markers and labels get a small
//! random tilt so the result reads as handwritten.

use canvas::camera::Point;
use canvas::doc::{PageBounds, ShapeId, ShapeKind, ShapeSpec};
use canvas::surface::Surface;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use uuid::Uuid;

use crate::annotation::{Annotation, AnnotationType};
use crate::bounds::CapturedBounds;
use crate::dedup::SpatialDeduplicator;
use crate::mapper::{self, PageRect};
use crate::tag::{AiTag, Role};

pub const MARKER_PADDING_RATIO: f64 = 0.2;
/// Horizontal gap between a marker and its label.
pub const LABEL_GAP: f64 = 40.0;
/// Vertical gap between stacked labels.
pub const LABEL_STACK_GAP: f64 = 8.0;
/// Distance of the success badge above the top of the content.
pub const BADGE_OFFSET: f64 = 40.0;

/// What one batch produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    /// Annotations that produced shapes.
    pub placed: usize,
    /// Annotations skipped as spatial duplicates.
    pub suppressed: usize,
    pub shape_ids: Vec<ShapeId>,
}

pub struct AnnotationRenderer {
    tilt: f64,
    rng: StdRng,
}

impl AnnotationRenderer {
    /// Renderer tilting within `±tilt` radians, seeded from the OS.
    #[must_use]
    pub fn new(tilt: f64) -> Self {
        Self::with_rng(tilt, StdRng::from_os_rng())
    }

    #[must_use]
    pub fn with_rng(tilt: f64, rng: StdRng) -> Self {
        Self { tilt: tilt.abs(), rng }
    }

    /// Render a batch in order. Duplicates (by anchor, against `dedup`) are
    /// skipped. Never touches existing shapes.
    pub fn render_all<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        annotations: &[Annotation],
        bounds: &CapturedBounds,
        mut dedup: SpatialDeduplicator,
    ) -> RenderReport {
        let mut report = RenderReport::default();
        let mut labels: Vec<PageBounds> = Vec::new();
        let mut badge_placed = false;

        for annotation in annotations {
            let ty = annotation.annotation_type();
            let ids = if let Some(region) = annotation.kind.region() {
                let rect = mapper::map_box(&region, bounds);
                let anchor = rect.center();
                if !dedup.admit(anchor) {
                    debug!(%ty, x = anchor.x, y = anchor.y, "render: suppressed near-duplicate");
                    report.suppressed += 1;
                    continue;
                }
                self.place_region(surface, annotation, rect, anchor, &mut labels)
            } else {
                if badge_placed {
                    report.suppressed += 1;
                    continue;
                }
                badge_placed = true;
                vec![self.place_badge(surface, annotation, bounds)]
            };
            report.placed += 1;
            report.shape_ids.extend(ids);
        }
        report
    }

    fn place_region<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        annotation: &Annotation,
        rect: PageRect,
        anchor: Point,
        labels: &mut Vec<PageBounds>,
    ) -> Vec<ShapeId> {
        let ty = annotation.annotation_type();
        let annotation_id = Uuid::new_v4().to_string();
        let tag = |role: Role| AiTag {
            annotation_id: annotation_id.clone(),
            role,
            kind: Some(ty),
            text: annotation.text.clone(),
            explanation: annotation.explanation.clone(),
            anchor: Some(anchor),
        };
        let caption = label_text(annotation);
        let (label_w, label_h) = canvas::doc::estimate_text_size(&caption);

        if ty == AnnotationType::Reference {
            let slot = stack_label(labels, rect.x + rect.width + LABEL_GAP, anchor.y - label_h * 0.5, label_w, label_h);
            let label = ShapeSpec::text(slot.min_x, slot.min_y, &caption)
                .with_color(ty.color())
                .with_rotation(self.tilt_sample())
                .with_meta(tag(Role::Label).to_meta());
            return vec![surface.create_shape(label)];
        }

        let pad = MARKER_PADDING_RATIO * rect.width.max(rect.height);
        let marker = PageRect {
            x: rect.x - pad,
            y: rect.y - pad,
            width: rect.width + 2.0 * pad,
            height: rect.height + 2.0 * pad,
        };
        let marker_spec = ShapeSpec::new(ShapeKind::Ellipse, marker.x, marker.y, marker.width, marker.height)
            .with_color(ty.color())
            .with_rotation(self.tilt_sample())
            .with_meta(tag(Role::Marker).to_meta());

        let slot = stack_label(labels, marker.x + marker.width + LABEL_GAP, anchor.y - label_h * 0.5, label_w, label_h);
        let label_spec = ShapeSpec::text(slot.min_x, slot.min_y, &caption)
            .with_color(ty.color())
            .with_rotation(self.tilt_sample())
            .with_meta(tag(Role::Label).to_meta());

        let from = Point::new(marker.x + marker.width, anchor.y);
        let to = Point::new(slot.min_x, slot.center().y);
        let connector_spec =
            ShapeSpec::arrow(from, to).with_color(ty.color()).with_meta(tag(Role::Connector).to_meta());

        vec![
            surface.create_shape(marker_spec),
            surface.create_shape(connector_spec),
            surface.create_shape(label_spec),
        ]
    }

    fn place_badge<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        annotation: &Annotation,
        bounds: &CapturedBounds,
    ) -> ShapeId {
        let text = label_text(annotation);
        let (w, h) = canvas::doc::estimate_text_size(&text);
        let center = Point::new(bounds.min_x + bounds.width * 0.5, bounds.min_y - BADGE_OFFSET);
        let tag = AiTag {
            annotation_id: Uuid::new_v4().to_string(),
            role: Role::Badge,
            kind: Some(AnnotationType::Success),
            text: annotation.text.clone(),
            explanation: annotation.explanation.clone(),
            anchor: None,
        };
        let spec = ShapeSpec::text(center.x - w * 0.5, center.y - h * 0.5, &text)
            .with_color(AnnotationType::Success.color())
            .with_meta(tag.to_meta());
        surface.create_shape(spec)
    }

    fn tilt_sample(&mut self) -> f64 {
        if self.tilt > 0.0 { self.rng.random_range(-self.tilt..=self.tilt) } else { 0.0 }
    }
}

fn label_text(annotation: &Annotation) -> String {
    let text = annotation.text.trim();
    if text.is_empty() { annotation.annotation_type().to_string() } else { text.to_string() }
}

/// Place a label at `(x, y)`, pushing it below any label it would overlap.
fn stack_label(labels: &mut Vec<PageBounds>, x: f64, y: f64, w: f64, h: f64) -> PageBounds {
    let mut slot = PageBounds::from_rect(x, y, w, h);
    while let Some(floor) = labels.iter().filter(|other| overlaps(other, &slot)).map(|other| other.max_y).reduce(f64::max)
    {
        slot = PageBounds::from_rect(x, floor + LABEL_STACK_GAP, w, h);
    }
    labels.push(slot);
    slot
}

fn overlaps(a: &PageBounds, b: &PageBounds) -> bool {
    a.min_x < b.max_x && b.min_x < a.max_x && a.min_y < b.max_y && b.min_y < a.max_y
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
