//! Integration tests for shapeup-types.

use shapeup_types::{ConstraintId, ForceId, ShapeError};

// ─── ID Tests ──────────────────────────────────────────────────

#[test]
fn id_index() {
    assert_eq!(ConstraintId(42).index(), 42);
    assert_eq!(ForceId(9).index(), 9);
}

#[test]
fn constraint_id_display() {
    let id = ConstraintId(7);
    assert_eq!(id.to_string(), "constraint #7");
    assert_eq!(ForceId(3).to_string(), "force #3");
}

#[test]
fn ids_are_ordered() {
    assert!(ConstraintId(1) < ConstraintId(2));
    assert_eq!(ConstraintId::from(5).index(), 5);
}

#[test]
fn ids_are_serializable() {
    let id = ConstraintId(100);
    let json = serde_json::to_string(&id).unwrap();
    let deserialized: ConstraintId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, deserialized);
}

// ─── Error Tests ──────────────────────────────────────────────

#[test]
fn dimension_error_display() {
    let err = ShapeError::Dimension { expected: 4, actual: 3 };
    assert_eq!(err.to_string(), "Dimension mismatch: expected 4, got 3");
}

#[test]
fn unsupported_edit_display() {
    let err = ShapeError::UnsupportedEdit {
        id: 2,
        kind: "Plane".into(),
        edit: "RestLength".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("Plane"));
    assert!(msg.contains("RestLength"));
}

#[test]
fn io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "scene.toml");
    let err: ShapeError = io.into();
    assert!(matches!(err, ShapeError::Io(_)));
}
