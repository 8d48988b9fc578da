//! Resolves a canvas selection into the explanation popover's content.
//!
//! The bridge only reads the canvas. Selection events arrive over a channel
//! (fed by the surface's selection listener) and the latest resolved detail
//! is published on a `watch` channel for the presentation layer.

use std::sync::Arc;

use canvas::camera::Point;
use canvas::doc::ShapeId;
use canvas::surface::Surface;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::debug;

use crate::annotation::AnnotationType;
use crate::tag::AiTag;

/// What the detail view shows for a selected annotation shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationDetail {
    /// Viewport position of the shape's origin.
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub explanation: String,
    #[serde(rename = "type")]
    pub kind: AnnotationType,
}

/// Detail for `selection`, or `None` ("no selection") unless exactly one
/// annotation shape with an explanation is selected.
pub fn resolve<S: Surface + ?Sized>(surface: &S, selection: &[ShapeId]) -> Option<AnnotationDetail> {
    let [id] = selection else {
        return None;
    };
    let shape = surface.shape(id)?;
    let tag = AiTag::of(shape)?;
    let kind = tag.kind?;
    if tag.explanation.is_empty() {
        return None;
    }
    let at = surface.page_to_viewport(Point::new(shape.x, shape.y));
    Some(AnnotationDetail { x: at.x, y: at.y, text: tag.text, explanation: tag.explanation, kind })
}

pub struct SelectionBridge<S: Surface> {
    surface: Arc<Mutex<S>>,
    detail: watch::Sender<Option<AnnotationDetail>>,
}

impl<S: Surface> SelectionBridge<S> {
    #[must_use]
    pub fn new(surface: Arc<Mutex<S>>) -> Self {
        let (detail, _) = watch::channel(None);
        Self { surface, detail }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AnnotationDetail>> {
        self.detail.subscribe()
    }

    /// Resolve one selection event and publish the result. Subscribers are
    /// only woken when the detail actually changes.
    pub async fn handle(&self, selection: &[ShapeId]) {
        let next = {
            let surface = self.surface.lock().await;
            resolve(&*surface, selection)
        };
        debug!(selected = selection.len(), resolved = next.is_some(), "selection: resolved");
        self.detail.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    /// Consume selection events until the sender side is dropped.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<Vec<ShapeId>>) {
        while let Some(selection) = events.recv().await {
            self.handle(&selection).await;
        }
        debug!("selection: event stream closed");
    }
}

#[cfg(test)]
#[path = "selection_test.rs"]
mod tests;
