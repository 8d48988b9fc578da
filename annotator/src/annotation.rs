//! Annotation model and its JSON wire form.
//!
//! DESIGN
//! ======
//! On the wire an annotation is a flat object with a `type` discriminator and
//! optional `x`/`y`/`width`/`height` fields. In memory it is a closed enum:
//! boxed variants carry a [`NormBox`], `success` carries none. Conversion goes
//! through [`WireAnnotation`] so every box is clamped exactly once, at the
//! boundary, and nothing downstream ever sees an out-of-range coordinate.
//!
//! Batches are parsed leniently: one malformed item is dropped on its own and
//! never takes the rest of the batch with it.

use std::fmt;

use canvas::doc::Color;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Smallest normalized width or height a box may have.
pub const MIN_BOX_SIZE: f64 = 0.02;

// =============================================================================
// TYPES
// =============================================================================

/// The five annotation categories, as spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationType {
    Warning,
    Info,
    Success,
    Suggestion,
    Reference,
}

impl AnnotationType {
    pub const ALL: [AnnotationType; 5] = [Self::Warning, Self::Info, Self::Success, Self::Suggestion, Self::Reference];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Success => "success",
            Self::Suggestion => "suggestion",
            Self::Reference => "reference",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }

    /// Display color. A pure function of the type.
    #[must_use]
    pub fn color(self) -> Color {
        match self {
            Self::Warning => Color::Red,
            Self::Suggestion => Color::Orange,
            Self::Reference => Color::Grey,
            Self::Success => Color::Green,
            Self::Info => Color::Blue,
        }
    }
}

impl fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A box in normalized `[0, 1]` coordinates relative to the captured bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormBox {
    /// Build a box, clamping position into `[0, 1]` and size into
    /// `[MIN_BOX_SIZE, 1]`. Non-finite inputs take the lower bound.
    #[must_use]
    pub fn clamped(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: clamp_between(x, 0.0),
            y: clamp_between(y, 0.0),
            width: clamp_between(width, MIN_BOX_SIZE),
            height: clamp_between(height, MIN_BOX_SIZE),
        }
    }
}

fn clamp_between(value: f64, low: f64) -> f64 {
    if value.is_finite() { value.clamp(low, 1.0) } else { low }
}

/// What an annotation points at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnnotationKind {
    Warning(NormBox),
    Info(NormBox),
    Suggestion(NormBox),
    /// Points back at an already-corrected region; rendered as a label only.
    Reference(NormBox),
    /// Whole-work feedback with no region.
    Success,
}

impl AnnotationKind {
    #[must_use]
    pub fn annotation_type(&self) -> AnnotationType {
        match self {
            Self::Warning(_) => AnnotationType::Warning,
            Self::Info(_) => AnnotationType::Info,
            Self::Suggestion(_) => AnnotationType::Suggestion,
            Self::Reference(_) => AnnotationType::Reference,
            Self::Success => AnnotationType::Success,
        }
    }

    #[must_use]
    pub fn region(&self) -> Option<NormBox> {
        match *self {
            Self::Warning(b) | Self::Info(b) | Self::Suggestion(b) | Self::Reference(b) => Some(b),
            Self::Success => None,
        }
    }
}

/// One observation returned by the tutor backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireAnnotation", into = "WireAnnotation")]
pub struct Annotation {
    pub id: Option<String>,
    /// Short keyword or title.
    pub text: String,
    /// Detailed, possibly math-bearing text. Opaque to the engine.
    pub explanation: String,
    pub kind: AnnotationKind,
}

impl Annotation {
    #[must_use]
    pub fn annotation_type(&self) -> AnnotationType {
        self.kind.annotation_type()
    }
}

// =============================================================================
// WIRE FORM
// =============================================================================

/// Flat JSON shape of an annotation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// Why a single wire item was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnnotationParseError {
    #[error("unknown annotation type: {0}")]
    UnknownType(String),

    #[error("{0} annotation is missing its box")]
    MissingBox(AnnotationType),
}

impl TryFrom<WireAnnotation> for Annotation {
    type Error = AnnotationParseError;

    fn try_from(wire: WireAnnotation) -> Result<Self, Self::Error> {
        let ty = AnnotationType::parse(&wire.kind).ok_or_else(|| AnnotationParseError::UnknownType(wire.kind.clone()))?;
        let region = match (wire.x, wire.y, wire.width, wire.height) {
            (Some(x), Some(y), Some(w), Some(h)) => Some(NormBox::clamped(x, y, w, h)),
            _ => None,
        };
        let kind = match (ty, region) {
            (AnnotationType::Success, _) => AnnotationKind::Success,
            (AnnotationType::Warning, Some(b)) => AnnotationKind::Warning(b),
            (AnnotationType::Info, Some(b)) => AnnotationKind::Info(b),
            (AnnotationType::Suggestion, Some(b)) => AnnotationKind::Suggestion(b),
            (AnnotationType::Reference, Some(b)) => AnnotationKind::Reference(b),
            (other, None) => return Err(AnnotationParseError::MissingBox(other)),
        };
        Ok(Self { id: wire.id, text: wire.text, explanation: wire.explanation, kind })
    }
}

impl From<Annotation> for WireAnnotation {
    fn from(a: Annotation) -> Self {
        let region = a.kind.region();
        Self {
            id: a.id,
            kind: a.kind.annotation_type().as_str().to_string(),
            text: a.text,
            explanation: a.explanation,
            x: region.map(|b| b.x),
            y: region.map(|b| b.y),
            width: region.map(|b| b.width),
            height: region.map(|b| b.height),
        }
    }
}

// =============================================================================
// LENIENT BATCH PARSING
// =============================================================================

/// Parse a list of raw JSON items, dropping the ones that do not conform.
#[must_use]
pub fn parse_items(items: Vec<serde_json::Value>) -> Vec<Annotation> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<Annotation>(item) {
            Ok(annotation) => Some(annotation),
            Err(e) => {
                debug!(index, error = %e, "annotation: dropping malformed item");
                None
            }
        })
        .collect()
}

/// Parse `{"annotations": [...]}` or a bare array. Anything else yields nothing.
#[must_use]
pub fn parse_batch(value: serde_json::Value) -> Vec<Annotation> {
    match value {
        serde_json::Value::Array(items) => parse_items(items),
        serde_json::Value::Object(mut map) => match map.remove("annotations") {
            Some(serde_json::Value::Array(items)) => parse_items(items),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// `deserialize_with` helper for a lenient `Vec<Annotation>` field.
///
/// # Errors
///
/// Fails only if the field is not a JSON array.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Vec<Annotation>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(parse_items(items))
}

#[cfg(test)]
#[path = "annotation_test.rs"]
mod tests;
