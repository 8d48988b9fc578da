//! Metadata tags marking shapes the tutor created.
//!
//! Every shape the engine writes carries an [`AiTag`] in its `meta` object.
//! The tag is how the engine finds its own shapes again (to clear them, to
//! dedup against them) and how a selected marker resolves back to its
//! explanation. Shapes without a tag are the student's and are never touched.

use std::collections::HashSet;

use canvas::camera::Point;
use canvas::doc::{Shape, ShapeId};
use canvas::surface::Surface;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::annotation::AnnotationType;

/// Which part of a rendered composite a shape is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Marker,
    Label,
    Connector,
    Badge,
    Solution,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiTag {
    pub annotation_id: String,
    pub role: Role,
    /// `None` for solution shapes.
    #[serde(default, rename = "type")]
    pub kind: Option<AnnotationType>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub explanation: String,
    /// Page point the composite is anchored at, used for dedup.
    #[serde(default, deserialize_with = "anchor_serde::deserialize")]
    pub anchor: Option<Point>,
}

impl AiTag {
    #[must_use]
    pub fn to_meta(&self) -> Value {
        let mut meta = json!({
            "ai": true,
            "annotationId": self.annotation_id,
            "role": self.role,
            "text": self.text,
            "explanation": self.explanation,
        });
        if let Some(kind) = self.kind {
            meta["type"] = json!(kind);
        }
        if let Some(p) = self.anchor {
            meta["anchor"] = json!({ "x": p.x, "y": p.y });
        }
        meta
    }

    /// Read the tag back from shape meta. `None` for student shapes.
    #[must_use]
    pub fn from_meta(meta: &Value) -> Option<Self> {
        if meta.get("ai").and_then(Value::as_bool) != Some(true) {
            return None;
        }
        match AiTag::deserialize(meta) {
            Ok(tag) => Some(tag),
            Err(_) => None,
        }
    }

    #[must_use]
    pub fn of(shape: &Shape) -> Option<Self> {
        Self::from_meta(&shape.meta)
    }

    /// True for parts of an annotation composite (not solution text).
    #[must_use]
    pub fn is_annotation(&self) -> bool {
        self.role != Role::Solution
    }
}

mod anchor_serde {
    use canvas::camera::Point;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    struct Raw {
        x: f64,
        y: f64,
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Point>, D::Error> {
        Ok(Option::<Raw>::deserialize(d)?.map(|r| Point::new(r.x, r.y)))
    }
}

fn tagged_ids<S: Surface + ?Sized>(surface: &S, keep: impl Fn(&AiTag) -> bool) -> Vec<ShapeId> {
    surface
        .list_shape_ids()
        .into_iter()
        .filter(|id| surface.shape(id).and_then(AiTag::of).is_some_and(|tag| keep(&tag)))
        .collect()
}

/// Every live annotation shape (markers, labels, connectors, badges).
#[must_use]
pub fn annotation_shape_ids<S: Surface + ?Sized>(surface: &S) -> Vec<ShapeId> {
    tagged_ids(surface, AiTag::is_annotation)
}

/// Every live solution shape.
#[must_use]
pub fn solution_shape_ids<S: Surface + ?Sized>(surface: &S) -> Vec<ShapeId> {
    tagged_ids(surface, |tag| tag.role == Role::Solution)
}

/// One anchor per live annotation composite.
#[must_use]
pub fn annotation_anchors<S: Surface + ?Sized>(surface: &S) -> Vec<Point> {
    let mut seen = HashSet::new();
    surface
        .list_shape_ids()
        .iter()
        .filter_map(|id| surface.shape(id).and_then(AiTag::of))
        .filter(|tag| tag.is_annotation() && seen.insert(tag.annotation_id.clone()))
        .filter_map(|tag| tag.anchor)
        .collect()
}

#[cfg(test)]
#[path = "tag_test.rs"]
mod tests;
