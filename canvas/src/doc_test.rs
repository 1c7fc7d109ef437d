#![allow(clippy::float_cmp)]

use super::*;

fn rect(id: &str, left: f64, top: f64) -> DrawableObject {
    let opts = ObjectOptions {
        left: Some(left),
        top: Some(top),
        width: Some(100.0),
        height: Some(100.0),
        ..ObjectOptions::default()
    };
    DrawableObject::from_options(id, ObjectKind::Rectangle, Vec::new(), &opts)
}

fn circle(id: &str, left: f64, top: f64, radius: f64) -> DrawableObject {
    let opts = ObjectOptions {
        left: Some(left),
        top: Some(top),
        radius: Some(radius),
        ..ObjectOptions::default()
    };
    DrawableObject::from_options(id, ObjectKind::Circle, Vec::new(), &opts)
}

fn line(id: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> DrawableObject {
    let opts = ObjectOptions { x1: Some(x1), y1: Some(y1), x2: Some(x2), y2: Some(y2), ..ObjectOptions::default() };
    DrawableObject::from_options(id, ObjectKind::Line, Vec::new(), &opts)
}

// =============================================================
// ObjectKind
// =============================================================

#[test]
fn only_circles_and_rectangles_are_shapes() {
    assert!(ObjectKind::Circle.is_shape());
    assert!(ObjectKind::Rectangle.is_shape());
    assert!(!ObjectKind::Path.is_shape());
    assert!(!ObjectKind::Line.is_shape());
    assert!(!ObjectKind::Triangle.is_shape());
}

#[test]
fn kind_from_shape_type() {
    assert_eq!(ObjectKind::from(ShapeType::Circle), ObjectKind::Circle);
    assert_eq!(ObjectKind::from(ShapeType::Rectangle), ObjectKind::Rectangle);
}

#[test]
fn kind_serializes_lowercase() {
    let json = serde_json::to_string(&ObjectKind::Triangle).unwrap();
    assert_eq!(json, "\"triangle\"");
}

// =============================================================
// Patching
// =============================================================

#[test]
fn from_options_fills_defaults_for_absent_fields() {
    let obj = rect("r", 10.0, 20.0);
    assert_eq!(obj.kind(), ObjectKind::Rectangle);
    assert_eq!(obj.transform.angle, 0.0);
    assert_eq!(obj.transform.scale_x, 1.0);
    assert_eq!(obj.transform.origin, Origin::TopLeft);
    assert_eq!(obj.style.stroke.as_deref(), Some("black"));
    assert_eq!(obj.style.fill, None);
    assert!(obj.selectable);
}

#[test]
fn patch_only_touches_present_fields() {
    let mut obj = rect("r", 10.0, 20.0);
    obj.apply(&ObjectOptions { angle: Some(45.0), ..ObjectOptions::default() });
    assert_eq!(obj.transform.angle, 45.0);
    assert_eq!(obj.transform.left, 10.0);
    assert_eq!(obj.geometry.size(), (100.0, 100.0));
}

#[test]
fn patch_can_clear_and_set_paint() {
    let mut obj = rect("r", 0.0, 0.0);
    obj.apply(&ObjectOptions { fill: Some(Some("red".to_owned())), stroke: Some(None), ..ObjectOptions::default() });
    assert_eq!(obj.style.fill.as_deref(), Some("red"));
    assert_eq!(obj.style.stroke, None);
}

#[test]
fn patch_ignores_fields_for_other_geometry() {
    let mut obj = circle("c", 0.0, 0.0, 30.0);
    obj.apply(&ObjectOptions { width: Some(500.0), x1: Some(9.0), ..ObjectOptions::default() });
    assert_eq!(obj.geometry, Geometry::Circle { radius: 30.0 });
}

#[test]
fn snapshot_applied_elsewhere_reproduces_object() {
    let mut original = rect("r", 12.5, -4.0);
    original.apply(&ObjectOptions {
        angle: Some(30.0),
        scale_x: Some(2.0),
        fill: Some(Some("blue".to_owned())),
        selectable: Some(false),
        ..ObjectOptions::default()
    });

    let mut replica = DrawableObject::new("r", Geometry::empty(ObjectKind::Rectangle));
    replica.apply(&original.options());
    assert_eq!(replica, original);
}

#[test]
fn line_snapshot_reproduces_endpoints() {
    let original = line("l", 50.0, 60.0, 10.0, 20.0);
    let mut replica = DrawableObject::new("l", Geometry::empty(ObjectKind::Line));
    replica.apply(&original.options());
    assert_eq!(replica.geometry, original.geometry);
    assert_eq!(replica.transform.left, 10.0);
    assert_eq!(replica.transform.top, 20.0);
}

#[test]
fn line_position_patch_translates_endpoints() {
    let mut obj = line("l", 10.0, 10.0, 30.0, 50.0);
    obj.apply(&ObjectOptions::position(20.0, 0.0));
    assert_eq!(obj.geometry, Geometry::Line { x1: 20.0, y1: 0.0, x2: 40.0, y2: 40.0 });
}

#[test]
fn move_to_shifts_anchor() {
    let mut obj = rect("r", 0.0, 0.0);
    obj.move_to(300.0, 40.0);
    assert_eq!((obj.transform.left, obj.transform.top), (300.0, 40.0));
}

// =============================================================
// Centre
// =============================================================

#[test]
fn rect_center_is_half_size_from_top_left() {
    let c = rect("r", 0.0, 0.0).center();
    assert_eq!((c.x, c.y), (50.0, 50.0));
}

#[test]
fn scaled_rect_center_uses_scaled_size() {
    let mut obj = rect("r", 10.0, 10.0);
    obj.apply(&ObjectOptions { scale_x: Some(2.0), ..ObjectOptions::default() });
    let c = obj.center();
    assert_eq!((c.x, c.y), (110.0, 60.0));
}

#[test]
fn rotated_rect_center_rotates_around_anchor() {
    let mut obj = rect("r", 0.0, 0.0);
    obj.apply(&ObjectOptions { angle: Some(90.0), ..ObjectOptions::default() });
    let c = obj.center();
    assert!(c.approx_eq(Point::new(-50.0, 50.0)), "got {c:?}");
}

#[test]
fn circle_center_offsets_by_radius() {
    let c = circle("c", 200.0, 0.0, 50.0).center();
    assert_eq!((c.x, c.y), (250.0, 50.0));
}

#[test]
fn center_origin_uses_anchor_directly() {
    let mut obj = rect("r", 40.0, 40.0);
    obj.apply(&ObjectOptions { origin: Some(Origin::Center), ..ObjectOptions::default() });
    let c = obj.center();
    assert_eq!((c.x, c.y), (40.0, 40.0));
}

#[test]
fn line_center_is_endpoint_midpoint() {
    let c = line("l", 0.0, 0.0, 100.0, 40.0).center();
    assert_eq!((c.x, c.y), (50.0, 20.0));
}

// =============================================================
// ObjectRegistry
// =============================================================

#[test]
fn upsert_replaces_existing_object() {
    let mut reg = ObjectRegistry::new();
    assert!(reg.upsert(rect("r", 0.0, 0.0)).is_none());
    let previous = reg.upsert(rect("r", 5.0, 5.0));
    assert_eq!(previous.map(|o| o.transform.left), Some(0.0));
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.get("r").map(|o| o.transform.left), Some(5.0));
}

#[test]
fn apply_patch_on_missing_id_is_noop() {
    let mut reg = ObjectRegistry::new();
    reg.upsert(rect("r", 0.0, 0.0));
    assert!(!reg.apply_patch("ghost", &ObjectOptions::position(1.0, 1.0)));
    assert_eq!(reg.len(), 1);
    assert!(!reg.contains("ghost"));
    assert_eq!(reg.get("r").map(|o| o.transform.left), Some(0.0));
}

#[test]
fn apply_patch_updates_existing() {
    let mut reg = ObjectRegistry::new();
    reg.upsert(rect("r", 0.0, 0.0));
    assert!(reg.apply_patch("r", &ObjectOptions::position(7.0, 8.0)));
    let obj = reg.get("r").unwrap();
    assert_eq!((obj.transform.left, obj.transform.top), (7.0, 8.0));
}

#[test]
fn clear_all_empties_registry() {
    let mut reg = ObjectRegistry::new();
    reg.upsert(rect("a", 0.0, 0.0));
    reg.upsert(circle("b", 0.0, 0.0, 10.0));
    assert_eq!(reg.clear_all(), 2);
    assert!(reg.is_empty());
    assert_eq!(reg.clear_all(), 0);
}
