use canvas::camera::Camera;
use canvas::doc::{ShapeKind, ShapeSpec};
use canvas::engine::EngineCore;

use super::*;
use crate::tag::Role;

const EXPLANATION: &str = "Al pasar el 3 restando, el signo cambia: 2x = 7 - 3.";

fn tag(role: Role, kind: Option<AnnotationType>, explanation: &str) -> AiTag {
    AiTag {
        annotation_id: "a1".into(),
        role,
        kind,
        text: "signo".into(),
        explanation: explanation.into(),
        anchor: None,
    }
}

fn place(core: &mut EngineCore, x: f64, y: f64, meta: Option<AiTag>) -> ShapeId {
    let mut spec = ShapeSpec::new(ShapeKind::Ellipse, x, y, 40.0, 20.0);
    if let Some(tag) = meta {
        spec = spec.with_meta(tag.to_meta());
    }
    core.create_shape(spec)
}

// =============================================================
// resolve
// =============================================================

#[test]
fn marker_resolves_to_stored_explanation() {
    let mut core = EngineCore::new();
    let id = place(&mut core, 100.0, 50.0, Some(tag(Role::Marker, Some(AnnotationType::Warning), EXPLANATION)));

    let detail = resolve(&core, &[id]).unwrap();

    assert_eq!(detail.explanation, EXPLANATION);
    assert_eq!(detail.text, "signo");
    assert_eq!(detail.kind, AnnotationType::Warning);
}

#[test]
fn student_shape_is_no_selection() {
    let mut core = EngineCore::new();
    let id = place(&mut core, 0.0, 0.0, None);
    assert_eq!(resolve(&core, &[id]), None);
}

#[test]
fn empty_or_multiple_selection_is_no_selection() {
    let mut core = EngineCore::new();
    let a = place(&mut core, 0.0, 0.0, Some(tag(Role::Marker, Some(AnnotationType::Info), EXPLANATION)));
    let b = place(&mut core, 90.0, 0.0, Some(tag(Role::Label, Some(AnnotationType::Info), EXPLANATION)));
    assert_eq!(resolve(&core, &[]), None);
    assert_eq!(resolve(&core, &[a, b]), None);
}

#[test]
fn solution_text_is_no_selection() {
    let mut core = EngineCore::new();
    let id = place(&mut core, 0.0, 0.0, Some(tag(Role::Solution, None, "Paso 1")));
    assert_eq!(resolve(&core, &[id]), None);
}

#[test]
fn blank_explanation_is_no_selection() {
    let mut core = EngineCore::new();
    let id = place(&mut core, 0.0, 0.0, Some(tag(Role::Marker, Some(AnnotationType::Info), "")));
    assert_eq!(resolve(&core, &[id]), None);
}

#[test]
fn deleted_shape_is_no_selection() {
    let mut core = EngineCore::new();
    let id = place(&mut core, 0.0, 0.0, Some(tag(Role::Marker, Some(AnnotationType::Info), EXPLANATION)));
    core.delete_shapes(&[id]);
    assert_eq!(resolve(&core, &[id]), None);
}

#[test]
fn position_is_in_viewport_space() {
    let mut core = EngineCore::new();
    core.set_camera(Camera { pan_x: 10.0, pan_y: -20.0, zoom: 2.0 });
    let id = place(&mut core, 100.0, 50.0, Some(tag(Role::Label, Some(AnnotationType::Reference), EXPLANATION)));

    let detail = resolve(&core, &[id]).unwrap();

    assert!((detail.x - 210.0).abs() < 1e-9);
    assert!((detail.y - 80.0).abs() < 1e-9);
}

#[test]
fn detail_serializes_with_type_field() {
    let detail = AnnotationDetail {
        x: 1.0,
        y: 2.0,
        text: "t".into(),
        explanation: "e".into(),
        kind: AnnotationType::Suggestion,
    };
    let v = serde_json::to_value(&detail).unwrap();
    assert_eq!(v["type"], "suggestion");
}

// =============================================================
// Bridge
// =============================================================

#[tokio::test]
async fn bridge_publishes_and_dismisses() {
    let mut core = EngineCore::new();
    let marker = place(&mut core, 0.0, 0.0, Some(tag(Role::Marker, Some(AnnotationType::Warning), EXPLANATION)));
    let student = place(&mut core, 300.0, 300.0, None);
    let bridge = SelectionBridge::new(Arc::new(Mutex::new(core)));
    let mut detail = bridge.subscribe();

    bridge.handle(&[marker]).await;
    assert!(detail.has_changed().unwrap());
    assert_eq!(detail.borrow_and_update().as_ref().map(|d| d.explanation.clone()), Some(EXPLANATION.into()));

    bridge.handle(&[student]).await;
    assert!(detail.borrow_and_update().is_none());
}

#[tokio::test]
async fn repeated_selection_does_not_wake_subscribers() {
    let mut core = EngineCore::new();
    let marker = place(&mut core, 0.0, 0.0, Some(tag(Role::Marker, Some(AnnotationType::Warning), EXPLANATION)));
    let bridge = SelectionBridge::new(Arc::new(Mutex::new(core)));
    let mut detail = bridge.subscribe();

    bridge.handle(&[marker]).await;
    detail.borrow_and_update();
    bridge.handle(&[marker]).await;

    assert!(!detail.has_changed().unwrap());
}

#[tokio::test]
async fn run_follows_engine_selection() {
    let mut core = EngineCore::new();
    let marker = place(&mut core, 0.0, 0.0, Some(tag(Role::Marker, Some(AnnotationType::Info), EXPLANATION)));
    let (tx, rx) = mpsc::unbounded_channel();
    core.on_selection_changed(Box::new(move |ids| {
        tx.send(ids.to_vec()).unwrap();
    }));
    let surface = Arc::new(Mutex::new(core));
    let bridge = SelectionBridge::new(Arc::clone(&surface));
    let mut detail = bridge.subscribe();
    let task = tokio::spawn(bridge.run(rx));

    surface.lock().await.select(&[marker]);
    detail.changed().await.unwrap();
    assert_eq!(detail.borrow().as_ref().unwrap().explanation, EXPLANATION);

    surface.lock().await.select(&[]);
    detail.changed().await.unwrap();
    assert!(detail.borrow().is_none());

    task.abort();
}
