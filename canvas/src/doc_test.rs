#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use serde_json::json;

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn rect_spec(x: f64, y: f64, w: f64, h: f64) -> ShapeSpec {
    ShapeSpec::new(ShapeKind::Rect, x, y, w, h)
}

// =============================================================
// ShapeKind / Color serde
// =============================================================

#[test]
fn kind_serde_all_variants() {
    let cases = [
        (ShapeKind::Draw, "\"draw\""),
        (ShapeKind::Rect, "\"rect\""),
        (ShapeKind::Ellipse, "\"ellipse\""),
        (ShapeKind::Arrow, "\"arrow\""),
        (ShapeKind::Text, "\"text\""),
    ];
    for (kind, expected) in cases {
        assert_eq!(serde_json::to_string(&kind).unwrap(), expected);
        let back: ShapeKind = serde_json::from_str(expected).unwrap();
        assert_eq!(back, kind);
    }
}

#[test]
fn kind_deserialize_invalid_rejects() {
    assert!(serde_json::from_str::<ShapeKind>("\"hexagon\"").is_err());
}

#[test]
fn color_serializes_kebab_case() {
    assert_eq!(serde_json::to_string(&Color::LightBlue).unwrap(), "\"light-blue\"");
    assert_eq!(serde_json::to_string(&Color::Red).unwrap(), "\"red\"");
}

#[test]
fn color_rgba_is_opaque() {
    for color in [Color::Black, Color::Grey, Color::Red, Color::Orange, Color::Green, Color::Blue, Color::LightBlue] {
        assert_eq!(color.rgba()[3], 0xFF);
    }
}

// =============================================================
// PageBounds
// =============================================================

#[test]
fn bounds_from_rect_dimensions() {
    let b = PageBounds::from_rect(10.0, 20.0, 30.0, 40.0);
    assert_eq!(b.min_x, 10.0);
    assert_eq!(b.max_y, 60.0);
    assert_eq!(b.width(), 30.0);
    assert_eq!(b.height(), 40.0);
    assert_eq!(b.center(), Point::new(25.0, 40.0));
}

#[test]
fn bounds_union_takes_extremes() {
    let a = PageBounds::from_rect(0.0, 0.0, 10.0, 10.0);
    let b = PageBounds::from_rect(5.0, 5.0, 20.0, 20.0);
    let u = a.union(&b);
    assert_eq!(u, PageBounds { min_x: 0.0, min_y: 0.0, max_x: 25.0, max_y: 25.0 });
}

#[test]
fn bounds_from_points_empty_is_none() {
    assert!(PageBounds::from_points(Vec::new()).is_none());
}

#[test]
fn bounds_from_points_single_is_degenerate() {
    let b = PageBounds::from_points([Point::new(3.0, 4.0)]).unwrap();
    assert_eq!(b.width(), 0.0);
    assert_eq!(b.height(), 0.0);
}

#[test]
fn bounds_expand_grows_every_side() {
    let b = PageBounds::from_rect(0.0, 0.0, 10.0, 10.0).expand(20.0);
    assert_eq!(b, PageBounds { min_x: -20.0, min_y: -20.0, max_x: 30.0, max_y: 30.0 });
}

#[test]
fn bounds_contains_edges() {
    let b = PageBounds::from_rect(0.0, 0.0, 10.0, 10.0);
    assert!(b.contains(Point::new(0.0, 10.0)));
    assert!(!b.contains(Point::new(10.1, 5.0)));
}

// =============================================================
// Shape geometry
// =============================================================

#[test]
fn unrotated_page_bounds_match_box() {
    let shape = rect_spec(10.0, 20.0, 100.0, 50.0).into_shape(Uuid::new_v4(), 0);
    assert_eq!(shape.page_bounds(), PageBounds::from_rect(10.0, 20.0, 100.0, 50.0));
}

#[test]
fn quarter_turn_swaps_extent() {
    let shape = rect_spec(0.0, 0.0, 100.0, 20.0)
        .with_rotation(std::f64::consts::FRAC_PI_2)
        .into_shape(Uuid::new_v4(), 0);
    let b = shape.page_bounds();
    assert!(approx_eq(b.width(), 20.0));
    assert!(approx_eq(b.height(), 100.0));
    assert!(approx_eq(b.center().x, 50.0));
    assert!(approx_eq(b.center().y, 10.0));
}

#[test]
fn small_tilt_grows_bounds() {
    let shape = rect_spec(0.0, 0.0, 100.0, 60.0)
        .with_rotation(0.1)
        .into_shape(Uuid::new_v4(), 0);
    let b = shape.page_bounds();
    assert!(b.width() > 100.0);
    assert!(b.height() > 60.0);
}

// =============================================================
// ShapeSpec helpers
// =============================================================

#[test]
fn text_spec_estimates_size() {
    let spec = ShapeSpec::text(0.0, 0.0, "abcd");
    assert_eq!(spec.kind, ShapeKind::Text);
    assert!(approx_eq(spec.width, 4.0 * crate::consts::TEXT_ADVANCE + 8.0));
    assert!(approx_eq(spec.height, crate::consts::TEXT_LINE_HEIGHT + 8.0));
    assert_eq!(Props::new(&spec.props).text(), "abcd");
}

#[test]
fn text_spec_multiline_height() {
    let (_, h) = estimate_text_size("a\nb\nc");
    assert!(approx_eq(h, 3.0 * crate::consts::TEXT_LINE_HEIGHT + 8.0));
}

#[test]
fn stroke_spec_covers_points_and_pen_width() {
    let spec = ShapeSpec::stroke(&[Point::new(10.0, 40.0), Point::new(50.0, 20.0)], 4.0);
    assert_eq!(spec.kind, ShapeKind::Draw);
    assert!(approx_eq(spec.x, 8.0));
    assert!(approx_eq(spec.y, 18.0));
    assert!(approx_eq(spec.width, 44.0));
    assert!(approx_eq(spec.height, 24.0));
    let props = Props::new(&spec.props);
    assert_eq!(props.points(), vec![Point::new(2.0, 22.0), Point::new(42.0, 2.0)]);
    assert!(approx_eq(props.stroke_width(), 4.0));
}

#[test]
fn empty_stroke_is_a_zero_box() {
    let spec = ShapeSpec::stroke(&[], 0.0);
    assert!(approx_eq(spec.width, 0.0));
    assert!(Props::new(&spec.props).points().is_empty());
}

#[test]
fn arrow_spec_spans_endpoints() {
    let spec = ShapeSpec::arrow(Point::new(100.0, 50.0), Point::new(20.0, 80.0));
    assert_eq!(spec.x, 20.0);
    assert_eq!(spec.y, 50.0);
    assert_eq!(spec.width, 80.0);
    assert_eq!(spec.height, 30.0);
    let props = Props::new(&spec.props);
    assert_eq!(props.a(), Some(Point::new(100.0, 50.0)));
    assert_eq!(props.b(), Some(Point::new(20.0, 80.0)));
}

#[test]
fn builders_set_fields() {
    let spec = rect_spec(0.0, 0.0, 1.0, 1.0)
        .with_color(Color::Green)
        .with_rotation(0.05)
        .with_meta(json!({ "tag": 1 }));
    assert_eq!(spec.color, Color::Green);
    assert_eq!(spec.rotation, 0.05);
    assert_eq!(spec.meta["tag"], 1);
}

// =============================================================
// Props
// =============================================================

#[test]
fn props_defaults_when_absent() {
    let value = json!({});
    let props = Props::new(&value);
    assert_eq!(props.text(), "");
    assert_eq!(props.stroke_width(), 2.0);
    assert!(props.points().is_empty());
    assert!(props.a().is_none());
}

#[test]
fn props_points_skip_malformed_pairs() {
    let value = json!({ "points": [[0.0, 1.0], "bad", [2.0], [3.0, 4.0]] });
    let points = Props::new(&value).points();
    assert_eq!(points, vec![Point::new(0.0, 1.0), Point::new(3.0, 4.0)]);
}

// =============================================================
// DocStore
// =============================================================

#[test]
fn store_starts_empty() {
    let store = DocStore::new();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
}

#[test]
fn create_assigns_increasing_z() {
    let mut store = DocStore::new();
    let a = store.create(rect_spec(0.0, 0.0, 1.0, 1.0));
    let b = store.create(rect_spec(0.0, 0.0, 1.0, 1.0));
    assert!(store.get(&a).unwrap().z_index < store.get(&b).unwrap().z_index);
    assert_eq!(store.ids(), vec![a, b]);
}

#[test]
fn insert_bumps_next_z() {
    let mut store = DocStore::new();
    let shape = rect_spec(0.0, 0.0, 1.0, 1.0).into_shape(Uuid::new_v4(), 41);
    store.insert(shape);
    let id = store.create(rect_spec(0.0, 0.0, 1.0, 1.0));
    assert_eq!(store.get(&id).unwrap().z_index, 42);
}

#[test]
fn remove_returns_shape() {
    let mut store = DocStore::new();
    let id = store.create(rect_spec(0.0, 0.0, 1.0, 1.0));
    assert!(store.remove(&id).is_some());
    assert!(store.remove(&id).is_none());
    assert!(store.is_empty());
}

#[test]
fn get_mut_allows_edit() {
    let mut store = DocStore::new();
    let id = store.create(rect_spec(0.0, 0.0, 1.0, 1.0));
    store.get_mut(&id).unwrap().x = 9.0;
    assert_eq!(store.get(&id).unwrap().x, 9.0);
}
