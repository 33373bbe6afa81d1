//! Integration tests for scene loading and the scene runner.

use std::path::{Path, PathBuf};

use shapeup_cli::scene::{Geometry, DEFAULT_ANCHOR_WEIGHT};
use shapeup_cli::{run, Scene, SceneMode};
use shapeup_mesh::generators::quad_grid;
use shapeup_solver::{Constraint, ConstraintKind, SolverMode, VectorField};
use shapeup_types::ShapeError;

fn scene_file(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("scenes").join(name)
}

fn parse(toml: &str) -> Scene {
    Scene::from_toml(toml, PathBuf::new()).unwrap()
}

const TWO_POINTS: &str = r#"
[geometry]
source = "points"
points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]
"#;

// ─── Parsing Tests ────────────────────────────────────────────

#[test]
fn minimal_scene_uses_defaults() {
    let scene = parse(&format!("{TWO_POINTS}\n[[anchor]]\npoint = 0\n"));
    assert_eq!(scene.settings.mode, SceneMode::Static);
    assert_eq!(scene.settings.solve_count(), 50);
    assert!(scene.solver.parallel);
    assert_eq!(scene.anchors.len(), 1);
    assert_eq!(scene.anchors[0].weight, DEFAULT_ANCHOR_WEIGHT);
    assert!(matches!(scene.geometry, Geometry::Points { ref points } if points.len() == 2));
}

#[test]
fn constraint_groups_parse() {
    let scene = parse(
        r#"
[geometry]
source = "tri_grid"
cols = 2
rows = 2
width = 1.0
height = 1.0

[settings]
mode = "dynamic"
steps = 3

[solver]
parallel = false

[[constraint]]
kind = "triangle_strain"
pattern = "face_vertices"
scalars = [0.9, 1.1]

[[constraint]]
kind = "angle"
indices = [[0, 1, 2]]
scalars = [0.5, 2.0]
weight = 3.0

[[force]]
kind = "vertex"
force = [1.0, 0.0, 0.0]
near = [0.5, -0.5, 0.0]
"#,
    );
    assert_eq!(scene.settings.solve_count(), 3);
    assert!(!scene.solver.parallel);
    assert_eq!(scene.constraints[0].kind, ConstraintKind::TriangleStrain);
    assert_eq!(scene.constraints[1].weight, 3.0);
    assert_eq!(scene.forces.len(), 1);

    let built = scene.build().unwrap();
    assert_eq!(built.groups[0].len(), 8);
    assert_eq!(built.groups[1].len(), 1);
    assert_eq!(built.solver.force_count(), 1);
}

#[test]
fn malformed_toml_is_a_serialization_error() {
    let result = Scene::from_toml("[geometry]\nsource = \"sphere\"\n", PathBuf::new());
    assert!(matches!(result, Err(ShapeError::Serialization(_))));
}

#[test]
fn missing_scene_file_is_io_error() {
    let result = Scene::load(Path::new("/nonexistent/scene.toml"));
    assert!(matches!(result, Err(ShapeError::Io(_))));
}

// ─── Build Tests ──────────────────────────────────────────────

#[test]
fn group_without_indices_rejected() {
    let scene = parse(&format!("{TWO_POINTS}\n[[constraint]]\nkind = \"closeness\"\n"));
    assert!(matches!(scene.build(), Err(ShapeError::InvalidParameter(_))));
}

#[test]
fn face_pattern_needs_faces() {
    let scene = parse(&format!(
        "{TWO_POINTS}\n[[constraint]]\nkind = \"plane\"\npattern = \"face_vertices\"\n"
    ));
    assert!(matches!(scene.build(), Err(ShapeError::InvalidParameter(_))));
}

#[test]
fn scalar_count_checked_per_kind() {
    let wrong_range = parse(&format!(
        "{TWO_POINTS}\n[[constraint]]\nkind = \"edge_strain\"\nindices = [[0, 1]]\n\
         scalars = [1.0, 2.0, 3.0, 4.0]\n"
    ));
    assert!(matches!(wrong_range.build(), Err(ShapeError::InvalidParameter(_))));

    let no_scalars = parse(&format!(
        "{TWO_POINTS}\n[[constraint]]\nkind = \"line\"\nindices = [[0, 1]]\nscalars = [1.0]\n"
    ));
    assert!(matches!(no_scalars.build(), Err(ShapeError::InvalidParameter(_))));
}

#[test]
fn out_of_range_indices_reported_with_group() {
    let scene = parse(&format!(
        "{TWO_POINTS}\n[[constraint]]\nkind = \"edge_strain\"\nindices = [[0, 4]]\n"
    ));
    match scene.build() {
        Err(ShapeError::InvalidTopology(msg)) => assert!(msg.contains("constraint group 0")),
        Err(e) => panic!("expected InvalidTopology, got {e}"),
        Ok(_) => panic!("expected InvalidTopology, got a built scene"),
    }
}

#[test]
fn anchor_needs_exactly_one_location() {
    let both = parse(&format!(
        "{TWO_POINTS}\n[[anchor]]\npoint = 0\nnear = [0.0, 0.0, 0.0]\n"
    ));
    assert!(matches!(both.build(), Err(ShapeError::InvalidParameter(_))));

    let neither = parse(&format!("{TWO_POINTS}\n[[anchor]]\nweight = 1.0\n"));
    assert!(matches!(neither.build(), Err(ShapeError::InvalidParameter(_))));
}

#[test]
fn anchor_by_location_picks_nearest_vertex() {
    let scene = parse(
        r#"
[geometry]
source = "quad_grid"
cols = 2
rows = 2
width = 1.0
height = 1.0

[[anchor]]
near = [0.6, -0.45, 0.0]
target = [0.5, -0.5, 1.0]
"#,
    );
    let built = scene.build().unwrap();
    let anchor = built.solver.constraint(built.anchors[0]).unwrap();
    assert_eq!(anchor.indices(), &[8]);
    let points = VectorField::from_points(&built.solver.points());
    assert!((anchor.error(&points) - 1.0).abs() < 1e-12);
}

#[test]
fn mesh_geometry_resolves_relative_path() {
    let dir = std::env::temp_dir().join(format!("shapeup-scene-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let mesh = quad_grid(1, 1, 2.0, 2.0);
    std::fs::write(dir.join("quad.json"), serde_json::to_string(&mesh).unwrap()).unwrap();

    let scene = Scene::from_toml(
        "[geometry]\nsource = \"mesh\"\npath = \"quad.json\"\n",
        dir.clone(),
    )
    .unwrap();
    let loaded = scene.mesh().unwrap();
    assert_eq!(loaded.vertex_count(), 4);
    assert_eq!(loaded.faces, mesh.faces);

    std::fs::remove_dir_all(&dir).unwrap();
}

// ─── Runner Tests ─────────────────────────────────────────────

#[test]
fn edge_scene_converges() {
    let scene = Scene::load(&scene_file("edge.toml")).unwrap();
    let report = run(&scene, None).unwrap();
    assert_eq!(report.iterations, 10);
    assert_eq!(report.residuals.len(), 10);
    assert!((report.points[1][0] - 2.0).abs() < 1e-9, "p1 = {:?}", report.points[1]);
    assert!(report.max_error() < 1e-9);
}

#[test]
fn iteration_override() {
    let scene = Scene::load(&scene_file("edge.toml")).unwrap();
    let report = run(&scene, Some(2)).unwrap();
    assert_eq!(report.iterations, 2);
    assert_eq!(report.residuals.len(), 2);
}

#[test]
fn planar_quad_flattens() {
    let scene = Scene::load(&scene_file("planar_quad.toml")).unwrap();
    let report = run(&scene, None).unwrap();
    // Constraint 0 is the plane; the rest hold the corners
    assert!(report.errors[0] < 0.01, "planarity error {}", report.errors[0]);
    assert_eq!(report.errors.len(), 5);
}

#[test]
fn dynamic_scene_falls() {
    let scene = parse(
        r#"
[geometry]
source = "points"
points = [[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]]

[settings]
mode = "dynamic"
steps = 10
mass = 1.0
damping = 1.0
timestep = 0.01

[[anchor]]
point = 0
weight = 1.0

[[force]]
kind = "gravity"
force = [0.0, -9.8, 0.0]
"#,
    );
    let report = run(&scene, None).unwrap();
    assert_eq!(report.mode, SceneMode::Dynamic);
    let expected_y = -9.8 * 0.01 * 0.01 * 55.0;
    assert!((report.points[1][1] - expected_y).abs() < 1e-9);
}

#[test]
fn unanchored_static_scene_fails() {
    let scene = parse(&format!(
        "{TWO_POINTS}\n[[constraint]]\nkind = \"edge_strain\"\nindices = [[0, 1]]\n"
    ));
    assert!(matches!(run(&scene, None), Err(ShapeError::SingularSystem(_))));
}

#[test]
fn bundled_scenes_initialize() {
    for name in ["edge.toml", "hanging_cloth.toml", "planar_quad.toml"] {
        let scene = Scene::load(&scene_file(name)).unwrap();
        let mut built = scene.build().unwrap();
        scene.init(&mut built.solver).unwrap();
        let expected = match scene.settings.mode {
            SceneMode::Static => SolverMode::Static,
            SceneMode::Dynamic => SolverMode::Dynamic,
        };
        assert_eq!(built.solver.mode(), expected, "{name}");
    }
}

#[test]
fn report_serializes() {
    let scene = Scene::load(&scene_file("edge.toml")).unwrap();
    let report = run(&scene, Some(1)).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["mode"], "static");
    assert_eq!(json["points"].as_array().unwrap().len(), 2);
}
