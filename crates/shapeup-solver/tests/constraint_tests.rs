//! Per-kind tests for the constraint family and forces.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_6, PI};

use glam::DQuat;
use shapeup_math::{DMat3, DVec3};
use shapeup_solver::constraint::{
    apply_rows, energy, AngleConstraint, AreaConstraint, BendingConstraint, ClosenessConstraint,
    EdgeStrainConstraint, EditError, FitShape, FittingConstraint, ShapeConstraint,
    TetStrainConstraint, TriangleStrainConstraint, UniformLaplacianConstraint, VolumeConstraint,
};
use shapeup_solver::{Constraint, ConstraintEdit, ConstraintKind, VectorField};
use shapeup_solver::{Force, ForceKind, GravityForce, VertexForce};

fn field(points: &[[f64; 3]]) -> VectorField {
    let points: Vec<DVec3> = points.iter().map(|p| DVec3::from_array(*p)).collect();
    VectorField::from_points(&points)
}

fn project(c: &dyn Constraint, points: &VectorField) -> Vec<DVec3> {
    let mut out = vec![DVec3::ZERO; c.rows()];
    c.project(points, &mut out);
    out
}

fn assert_vec_near(actual: DVec3, expected: DVec3, tol: f64) {
    assert!(
        (actual - expected).length() < tol,
        "expected {expected:?}, got {actual:?}"
    );
}

/// Row coefficient sums of `S_c`.
fn row_sums(c: &dyn Constraint) -> Vec<f64> {
    let mut triplets = Vec::new();
    c.add_to_system(&mut triplets, 0);
    let mut sums = vec![0.0; c.rows()];
    for (r, _, v) in triplets {
        sums[r] += v;
    }
    sums
}

const UNIT_TRIANGLE: [[f64; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
const UNIT_TET: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
];

// ─── Kind Tests ───────────────────────────────────────────────

#[test]
fn kind_arity_table() {
    assert!(ConstraintKind::EdgeStrain.arity().accepts(2));
    assert!(!ConstraintKind::EdgeStrain.arity().accepts(3));
    assert!(ConstraintKind::Bending.arity().accepts(3));
    assert!(ConstraintKind::Bending.arity().accepts(7));
    assert!(!ConstraintKind::Sphere.arity().accepts(3));
    assert!(ConstraintKind::Closeness.arity().accepts(1));
}

#[test]
fn kind_names_round_trip_through_serde() {
    assert_eq!(ConstraintKind::TetrahedronStrain.to_string(), "tetrahedron_strain");
    let parsed: ConstraintKind = serde_json::from_str("\"uniform_laplacian\"").unwrap();
    assert_eq!(parsed, ConstraintKind::UniformLaplacian);
}

#[test]
fn only_closeness_rows_carry_translation() {
    let points = field(&[
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.3, 0.4, 0.5],
    ]);
    let constraints: Vec<Box<dyn Constraint>> = vec![
        Box::new(EdgeStrainConstraint::new([0, 1], 1.0, &points)),
        Box::new(TriangleStrainConstraint::new([0, 1, 2], 1.0, &points)),
        Box::new(TetStrainConstraint::new([0, 1, 2, 3], 1.0, &points)),
        Box::new(BendingConstraint::new(vec![4, 0, 1, 2, 3], 1.0, &points)),
        Box::new(FittingConstraint::new(FitShape::Plane, vec![0, 1, 2, 4], 1.0)),
        Box::new(ShapeConstraint::rigid(vec![0, 1, 2, 3], 1.0, &points)),
        Box::new(AngleConstraint::new([0, 1, 2], 0.0, PI, 1.0)),
    ];
    for c in &constraints {
        for sum in row_sums(c.as_ref()) {
            assert!(sum.abs() < 1e-12, "{} row sums to {sum}", c.kind());
        }
    }

    let anchor = ClosenessConstraint::new(0, 1.0, &points);
    assert_eq!(row_sums(&anchor), vec![1.0]);
}

// ─── Edge Strain Tests ────────────────────────────────────────

#[test]
fn edge_rows_use_offset() {
    let points = field(&[[0.0; 3], [1.0, 0.0, 0.0]]);
    let edge = EdgeStrainConstraint::new([0, 1], 1.0, &points);
    let mut triplets = Vec::new();
    edge.add_to_system(&mut triplets, 5);
    assert_eq!(triplets, vec![(5, 0, -1.0), (5, 1, 1.0)]);
}

#[test]
fn edge_projects_to_rest_length() {
    let rest = field(&[[0.0; 3], [1.0, 0.0, 0.0]]);
    let edge = EdgeStrainConstraint::new([0, 1], 1.0, &rest);
    assert!((edge.rest_length() - 1.0).abs() < 1e-15);

    let stretched = field(&[[0.0; 3], [0.0, 2.0, 0.0]]);
    assert!((edge.error(&stretched) - 1.0).abs() < 1e-12);
    assert_vec_near(project(&edge, &stretched)[0], DVec3::Y, 1e-12);
}

#[test]
fn edge_range_leaves_slack() {
    let rest = field(&[[0.0; 3], [1.0, 0.0, 0.0]]);
    let mut edge = EdgeStrainConstraint::new([0, 1], 1.0, &rest);
    edge.edit(&ConstraintEdit::Range { min: 0.5, max: 3.0 }).unwrap();
    assert_eq!(edge.range(), (0.5, 3.0));

    let stretched = field(&[[0.0; 3], [2.0, 0.0, 0.0]]);
    assert_vec_near(project(&edge, &stretched)[0], DVec3::new(2.0, 0.0, 0.0), 1e-12);

    let far = field(&[[0.0; 3], [5.0, 0.0, 0.0]]);
    assert_vec_near(project(&edge, &far)[0], DVec3::new(3.0, 0.0, 0.0), 1e-12);
}

#[test]
fn zero_rest_length_pulls_points_together() {
    let points = field(&[[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]]);
    let edge = EdgeStrainConstraint::new([0, 1], 1.0, &points);
    assert_eq!(edge.rest_length(), 0.0);

    let mut triplets = Vec::new();
    edge.add_to_system(&mut triplets, 0);
    assert_eq!(triplets, vec![(0, 0, -1.0), (0, 1, 1.0)]);

    // Error falls back to the absolute length deviation
    let apart = field(&[[0.0; 3], [3.0, 0.0, 0.0]]);
    assert!((edge.error(&apart) - 3.0).abs() < 1e-12);
    assert_eq!(project(&edge, &apart)[0], DVec3::ZERO);
}

#[test]
fn rest_length_edit_keeps_rows() {
    let points = field(&[[0.0; 3], [1.0, 0.0, 0.0]]);
    let mut edge = EdgeStrainConstraint::new([0, 1], 1.0, &points);
    edge.edit(&ConstraintEdit::RestLength(0.0)).unwrap();

    let mut triplets = Vec::new();
    edge.add_to_system(&mut triplets, 0);
    assert_eq!(triplets, vec![(0, 0, -1.0), (0, 1, 1.0)]);
    assert!((edge.error(&points) - 1.0).abs() < 1e-12);
}

#[test]
fn edge_edit_validation() {
    let points = field(&[[0.0; 3], [1.0, 0.0, 0.0]]);
    let mut edge = EdgeStrainConstraint::new([0, 1], 1.0, &points);
    assert!(matches!(
        edge.edit(&ConstraintEdit::RestLength(-1.0)),
        Err(EditError::Invalid(_))
    ));
    assert!(matches!(
        edge.edit(&ConstraintEdit::Target(DVec3::ZERO)),
        Err(EditError::Unsupported)
    ));
    edge.edit(&ConstraintEdit::RestLength(4.0)).unwrap();
    assert_eq!(edge.rest_length(), 4.0);
}

// ─── Triangle Tests ───────────────────────────────────────────

#[test]
fn triangle_rows_evaluate_deformation_gradient() {
    let rest = field(&UNIT_TRIANGLE);
    let strain = TriangleStrainConstraint::new([0, 1, 2], 1.0, &rest);
    let stretched = field(&[[0.0; 3], [2.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);

    let f = apply_rows(&strain, &stretched);
    assert_vec_near(f[0], DVec3::new(2.0, 0.0, 0.0), 1e-12);
    assert_vec_near(f[1], DVec3::Y, 1e-12);
}

#[test]
fn triangle_strain_projects_to_rotation() {
    let rest = field(&UNIT_TRIANGLE);
    let mut strain = TriangleStrainConstraint::new([0, 1, 2], 1.0, &rest);
    let stretched = field(&[[0.0; 3], [2.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);

    assert!(strain.error(&rest) < 1e-12);
    assert!((strain.error(&stretched) - 1.0).abs() < 1e-12);

    let target = project(&strain, &stretched);
    assert_vec_near(target[0], DVec3::X, 1e-12);
    assert_vec_near(target[1], DVec3::Y, 1e-12);

    strain.edit(&ConstraintEdit::Range { min: 1.0, max: 2.0 }).unwrap();
    let target = project(&strain, &stretched);
    assert_vec_near(target[0], DVec3::new(2.0, 0.0, 0.0), 1e-12);
}

#[test]
fn area_rescales_uniformly() {
    let rest = field(&UNIT_TRIANGLE);
    let area = AreaConstraint::new([0, 1, 2], 1.0, &rest);
    let stretched = field(&[[0.0; 3], [2.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);

    assert!((area.error(&stretched) - 1.0).abs() < 1e-12);
    let target = project(&area, &stretched);
    let s = 0.5f64.sqrt();
    assert_vec_near(target[0], DVec3::new(2.0 * s, 0.0, 0.0), 1e-12);
    assert_vec_near(target[1], DVec3::new(0.0, s, 0.0), 1e-12);
}

#[test]
fn degenerate_rest_triangle_is_inert() {
    let flat = field(&[[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
    let strain = TriangleStrainConstraint::new([0, 1, 2], 1.0, &flat);
    let mut triplets = Vec::new();
    strain.add_to_system(&mut triplets, 0);
    assert!(triplets.is_empty());
    assert_eq!(strain.error(&field(&UNIT_TRIANGLE)), 0.0);
    assert_eq!(project(&strain, &flat), vec![DVec3::ZERO; 2]);
}

// ─── Tetrahedron Tests ────────────────────────────────────────

#[test]
fn tet_strain_projects_to_rotation() {
    let rest = field(&UNIT_TET);
    let strain = TetStrainConstraint::new([0, 1, 2, 3], 1.0, &rest);
    let stretched = field(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]]);

    let f = apply_rows(&strain, &stretched);
    assert_vec_near(f[2], DVec3::new(0.0, 0.0, 2.0), 1e-12);
    assert!((strain.error(&stretched) - 1.0).abs() < 1e-9);

    let target = project(&strain, &stretched);
    assert_vec_near(target[0], DVec3::X, 1e-9);
    assert_vec_near(target[1], DVec3::Y, 1e-9);
    assert_vec_near(target[2], DVec3::Z, 1e-9);
}

#[test]
fn inverted_tet_reports_negative_stretch() {
    let rest = field(&UNIT_TET);
    let strain = TetStrainConstraint::new([0, 1, 2, 3], 1.0, &rest);
    let inverted = field(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]]);
    assert!((strain.error(&inverted) - 2.0).abs() < 1e-9);
}

#[test]
fn volume_rescales_to_rest_volume() {
    let rest = field(&UNIT_TET);
    let volume = VolumeConstraint::new([0, 1, 2, 3], 1.0, &rest);
    let stretched = field(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]]);

    assert!((volume.error(&stretched) - 1.0).abs() < 1e-12);
    let t = project(&volume, &stretched);
    let det = DMat3::from_cols(t[0], t[1], t[2]).determinant();
    assert!((det - 1.0).abs() < 1e-9, "det = {det}");
}

#[test]
fn inverted_volume_projects_to_proper_rotation() {
    let rest = field(&UNIT_TET);
    let volume = VolumeConstraint::new([0, 1, 2, 3], 1.0, &rest);
    let inverted = field(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]]);

    assert!((volume.error(&inverted) - 2.0).abs() < 1e-12);
    let t = project(&volume, &inverted);
    let det = DMat3::from_cols(t[0], t[1], t[2]).determinant();
    assert!((det - 1.0).abs() < 1e-9, "det = {det}");
}

// ─── Bending Tests ────────────────────────────────────────────

const FLAT_STENCIL: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.5, 1.0, 0.0],
    [0.5, -1.0, 0.0],
];

#[test]
fn flat_edge_stencil_has_zero_rest_curvature() {
    let rest = field(&FLAT_STENCIL);
    let bending = BendingConstraint::new(vec![0, 1, 2, 3], 1.0, &rest);
    assert!(bending.rest_norm() < 1e-12);
    assert!(row_sums(&bending)[0].abs() < 1e-12);

    let mut folded = rest.clone();
    folded.set(2, DVec3::new(0.5, 1.0, 0.5));
    assert!((bending.error(&folded) - 0.75).abs() < 1e-12);
    assert_vec_near(project(&bending, &folded)[0], DVec3::ZERO, 1e-12);
}

#[test]
fn collinear_stencil_is_inert() {
    let rest = field(&[[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.5, -1.0, 0.0]]);
    let bending = BendingConstraint::new(vec![0, 1, 2, 3], 1.0, &rest);
    let mut triplets = Vec::new();
    bending.add_to_system(&mut triplets, 0);
    assert!(triplets.is_empty());
    assert_eq!(bending.error(&field(&FLAT_STENCIL)), 0.0);
}

#[test]
fn four_indices_always_use_the_edge_stencil() {
    // A valence-3 one-ring, center first
    let h = 3.0_f64.sqrt() / 2.0;
    let rest = field(&[[0.0, 0.0, 0.5], [1.0, 0.0, 0.0], [-0.5, h, 0.0], [-0.5, -h, 0.0]]);
    let bending = BendingConstraint::new(vec![0, 1, 2, 3], 1.0, &rest);

    let mut triplets = Vec::new();
    bending.add_to_system(&mut triplets, 0);
    let coefficients: Vec<f64> = triplets.iter().map(|&(_, _, v)| v).collect();
    let expected = [-3.0, 0.5, 1.25, 1.25];
    assert_eq!(coefficients.len(), 4);
    for (c, e) in coefficients.iter().zip(expected) {
        assert!((c - e).abs() < 1e-12, "coefficients: {coefficients:?}");
    }
}

const RING: [[f64; 3]; 5] = [
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, -1.0, 0.0],
];

#[test]
fn one_ring_bending_keeps_curvature_magnitude() {
    let rest = field(&RING);
    let bending = BendingConstraint::new(vec![0, 1, 2, 3, 4], 1.0, &rest);
    assert!((bending.rest_norm() - 1.0).abs() < 1e-12);
    assert!(bending.error(&rest) < 1e-12);

    let mut raised = rest.clone();
    raised.set(0, DVec3::new(0.0, 0.0, 2.0));
    assert!((bending.error(&raised) - 1.0).abs() < 1e-12);
    assert_vec_near(project(&bending, &raised)[0], DVec3::Z, 1e-12);
}

#[test]
fn uniform_laplacian_targets() {
    let rest = field(&RING);
    let smooth = UniformLaplacianConstraint::new(vec![0, 1, 2, 3, 4], false, 1.0, &rest);
    assert!((smooth.error(&rest) - 1.0).abs() < 1e-12);
    assert_eq!(project(&smooth, &rest)[0], DVec3::ZERO);

    let keep = UniformLaplacianConstraint::new(vec![0, 1, 2, 3, 4], true, 1.0, &rest);
    assert!(keep.is_displacement());
    assert!(keep.error(&rest) < 1e-12);
    assert_vec_near(project(&keep, &rest)[0], DVec3::Z, 1e-12);
    let mut keep = keep;
    assert!(matches!(
        keep.edit(&ConstraintEdit::Range { min: 0.0, max: 1.0 }),
        Err(EditError::Unsupported)
    ));
}

// ─── Closeness Tests ──────────────────────────────────────────

#[test]
fn closeness_targets_and_energy() {
    let points = field(&[[1.0, 2.0, 3.0]]);
    let mut anchor = ClosenessConstraint::new(0, 2.0, &points);
    assert_eq!(anchor.target(), DVec3::new(1.0, 2.0, 3.0));
    assert_eq!(anchor.error(&points), 0.0);

    anchor.edit(&ConstraintEdit::Target(DVec3::new(1.0, 2.0, 6.0))).unwrap();
    assert!((anchor.error(&points) - 3.0).abs() < 1e-12);
    assert!((energy(&anchor, &points) - 18.0).abs() < 1e-12);

    assert!(matches!(
        anchor.edit(&ConstraintEdit::Target(DVec3::new(f64::NAN, 0.0, 0.0))),
        Err(EditError::Invalid(_))
    ));
    assert!(matches!(
        anchor.edit(&ConstraintEdit::RestLength(1.0)),
        Err(EditError::Unsupported)
    ));
}

// ─── Fitting Tests ────────────────────────────────────────────

#[test]
fn line_fit_error_and_projection() {
    let points = field(&[[-1.0, 0.0, 0.0], [0.0, 0.3, 0.0], [1.0, 0.0, 0.0]]);
    let line = FittingConstraint::new(FitShape::Line, vec![0, 1, 2], 1.0);
    assert_eq!(line.kind(), ConstraintKind::Line);
    assert!((line.error(&points) - 0.02f64.sqrt()).abs() < 1e-9);

    let target = project(&line, &points);
    assert_vec_near(target[0], DVec3::new(-1.0, 0.0, 0.0), 1e-9);
    assert_vec_near(target[1], DVec3::ZERO, 1e-9);
    assert_vec_near(target[2], DVec3::new(1.0, 0.0, 0.0), 1e-9);
}

#[test]
fn plane_fit_error_and_projection() {
    let points = field(&[
        [1.0, 0.0, 0.1],
        [-1.0, 0.0, 0.1],
        [0.0, 1.0, -0.1],
        [0.0, -1.0, -0.1],
    ]);
    let plane = FittingConstraint::new(FitShape::Plane, vec![0, 1, 2, 3], 1.0);
    assert!((plane.error(&points) - 0.1).abs() < 1e-9);

    let target = project(&plane, &points);
    assert_vec_near(target[0], DVec3::X, 1e-9);
    assert_vec_near(target[2], DVec3::Y, 1e-9);
}

fn circle_points(center: DVec3, radius: f64) -> Vec<DVec3> {
    (0..6)
        .map(|k| {
            let t = k as f64 * FRAC_PI_3;
            center + DVec3::new(t.cos(), t.sin(), 0.0) * radius
        })
        .collect()
}

#[test]
fn circle_fit_snaps_points_onto_a_circle() {
    let exact = circle_points(DVec3::new(1.0, 1.0, 0.0), 2.0);
    let circle = FittingConstraint::new(FitShape::Circle, (0..6).collect(), 1.0);
    assert!(circle.error(&VectorField::from_points(&exact)) < 1e-8);

    let mut perturbed = exact.clone();
    perturbed[0] = DVec3::new(1.0, 1.0, 0.0) + DVec3::new(2.2, 0.0, 0.1);
    let perturbed = VectorField::from_points(&perturbed);
    assert!(circle.error(&perturbed) > 1e-3);

    let snapped = VectorField::from_points(&project(&circle, &perturbed));
    assert!(circle.error(&snapped) < 1e-8);
}

#[test]
fn collinear_circle_falls_back_to_plane() {
    let points = field(&[[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
    let circle = FittingConstraint::new(FitShape::Circle, vec![0, 1, 2], 1.0);
    assert!(circle.error(&points) < 1e-9);
}

fn sphere_points(center: DVec3, radius: f64) -> Vec<DVec3> {
    [DVec3::X, DVec3::NEG_X, DVec3::Y, DVec3::NEG_Y, DVec3::Z, DVec3::NEG_Z]
        .iter()
        .map(|d| center + *d * radius)
        .collect()
}

#[test]
fn sphere_fit_snaps_points_onto_a_sphere() {
    let center = DVec3::new(1.0, 2.0, 3.0);
    let exact = sphere_points(center, 3.0);
    let sphere = FittingConstraint::new(FitShape::Sphere, (0..6).collect(), 1.0);
    assert!(sphere.error(&VectorField::from_points(&exact)) < 1e-8);

    let mut perturbed = exact.clone();
    perturbed[0] = center + DVec3::X * 3.5;
    let perturbed = VectorField::from_points(&perturbed);
    assert!(sphere.error(&perturbed) > 1e-3);

    let snapped = VectorField::from_points(&project(&sphere, &perturbed));
    assert!(sphere.error(&snapped) < 1e-8);
}

#[test]
fn coplanar_sphere_is_a_no_op() {
    let points = field(&[
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
    ]);
    let sphere = FittingConstraint::new(FitShape::Sphere, vec![0, 1, 2, 3], 1.0);
    assert_eq!(sphere.error(&points), 0.0);
    let target = project(&sphere, &points);
    assert_vec_near(target[0], DVec3::new(-0.5, -0.5, 0.0), 1e-12);
}

// ─── Shape Matching Tests ─────────────────────────────────────

const CLOUD: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [2.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 3.0],
];

fn transformed(rotation: DQuat, scale: f64) -> VectorField {
    let points: Vec<DVec3> = CLOUD
        .iter()
        .map(|p| rotation * DVec3::from_array(*p) * scale + DVec3::new(5.0, -1.0, 2.0))
        .collect();
    VectorField::from_points(&points)
}

#[test]
fn rigid_accepts_rotation_rejects_scale() {
    let rest = field(&CLOUD);
    let rigid = ShapeConstraint::rigid(vec![0, 1, 2, 3], 1.0, &rest);
    let rotation = DQuat::from_axis_angle(DVec3::new(1.0, 2.0, 0.5).normalize(), 0.7);

    assert!(rigid.error(&transformed(rotation, 1.0)) < 1e-9);
    assert!(rigid.error(&transformed(DQuat::IDENTITY, 2.0)) > 0.1);

    // Projection of a scaled copy is the rest shape, centered
    let target = project(&rigid, &transformed(DQuat::IDENTITY, 2.0));
    let centroid = DVec3::new(0.5, 0.25, 0.75);
    for (t, p) in target.iter().zip(CLOUD) {
        assert_vec_near(*t, DVec3::from_array(p) - centroid, 1e-9);
    }
}

#[test]
fn similarity_accepts_rotation_and_scale() {
    let rest = field(&CLOUD);
    let similarity = ShapeConstraint::similarity(vec![0, 1, 2, 3], 1.0, &rest);
    assert_eq!(similarity.kind(), ConstraintKind::Similarity);
    let rotation = DQuat::from_rotation_z(FRAC_PI_2);
    assert!(similarity.error(&transformed(rotation, 2.5)) < 1e-9);
}

#[test]
fn candidate_shapes_edit() {
    let rest = field(&CLOUD);
    let mut rigid = ShapeConstraint::rigid(vec![0, 1, 2, 3], 1.0, &rest);
    let rest_shape: Vec<DVec3> = CLOUD.iter().map(|p| DVec3::from_array(*p)).collect();
    let doubled: Vec<DVec3> = rest_shape.iter().map(|p| *p * 2.0).collect();

    assert!(matches!(
        rigid.edit(&ConstraintEdit::Shapes(vec![])),
        Err(EditError::Invalid(_))
    ));
    assert!(matches!(
        rigid.edit(&ConstraintEdit::Shapes(vec![rest_shape[..3].to_vec()])),
        Err(EditError::Invalid(_))
    ));
    assert_eq!(rigid.shape_count(), 1);

    rigid
        .edit(&ConstraintEdit::Shapes(vec![rest_shape, doubled]))
        .unwrap();
    assert_eq!(rigid.shape_count(), 2);
    assert!(rigid.error(&transformed(DQuat::IDENTITY, 2.0)) < 1e-9);
}

// ─── Angle Tests ──────────────────────────────────────────────

#[test]
fn angle_within_range_is_satisfied() {
    let points = field(&[[1.0, 0.0, 0.0], [0.0; 3], [0.0, 1.0, 0.0]]);
    let angle = AngleConstraint::new([0, 1, 2], FRAC_PI_3, FRAC_PI_2, 1.0);
    assert!(angle.error(&points) < 1e-12);
    let target = project(&angle, &points);
    assert_eq!(target, vec![DVec3::X, DVec3::Y]);
}

#[test]
fn angle_projection_closes_to_target() {
    let points = field(&[[1.0, 0.0, 0.0], [0.0; 3], [0.0, 2.0, 0.0]]);
    let angle = AngleConstraint::new([0, 1, 2], FRAC_PI_3, FRAC_PI_3, 1.0);
    assert!((angle.error(&points) - FRAC_PI_6).abs() < 1e-12);

    let target = project(&angle, &points);
    assert!((target[0].angle_between(target[1]) - FRAC_PI_3).abs() < 1e-9);
    assert!((target[0].length() - 1.0).abs() < 1e-12);
    assert!((target[1].length() - 2.0).abs() < 1e-12);
}

#[test]
fn straight_angle_opens_along_any_axis() {
    let points = field(&[[1.0, 0.0, 0.0], [0.0; 3], [-1.0, 0.0, 0.0]]);
    let angle = AngleConstraint::new([0, 1, 2], 0.0, FRAC_PI_2, 1.0);
    let target = project(&angle, &points);
    assert!((target[0].angle_between(target[1]) - FRAC_PI_2).abs() < 1e-9);
}

#[test]
fn angle_range_edit_validation() {
    let mut angle = AngleConstraint::new([0, 1, 2], 0.0, PI, 1.0);
    assert!(matches!(
        angle.edit(&ConstraintEdit::Range { min: 0.0, max: 4.0 }),
        Err(EditError::Invalid(_))
    ));
    angle.edit(&ConstraintEdit::Range { min: 0.5, max: 1.0 }).unwrap();
    assert_eq!(angle.range(), (0.5, 1.0));
}

// ─── Force Tests ──────────────────────────────────────────────

#[test]
fn gravity_acts_on_every_point() {
    let mut gravity = GravityForce::new(DVec3::new(0.0, -9.8, 0.0));
    assert_eq!(gravity.kind(), ForceKind::Gravity);
    let mut acc = vec![DVec3::X; 3];
    gravity.accumulate(&mut acc);
    assert!(acc.iter().all(|f| *f == DVec3::new(1.0, -9.8, 0.0)));

    assert!(!gravity.edit(DVec3::Z, Some(1)));
    assert!(gravity.edit(DVec3::Z, None));
    assert_eq!(gravity.force_at(7), DVec3::Z);
}

#[test]
fn vertex_force_acts_on_one_point() {
    let mut force = VertexForce::new(DVec3::X, 1);
    let mut acc = vec![DVec3::ZERO; 3];
    force.accumulate(&mut acc);
    assert_eq!(acc, vec![DVec3::ZERO, DVec3::X, DVec3::ZERO]);

    assert!(force.edit(DVec3::Y, Some(2)));
    assert_eq!(force.point(), 2);
    assert_eq!(force.force_at(2), DVec3::Y);
    assert_eq!(force.force_at(1), DVec3::ZERO);
}
