//! TOML scene description and solver construction.
//!
//! ```toml
//! [geometry]
//! source = "quad_grid"
//! cols = 4
//! rows = 4
//! width = 1.0
//! height = 1.0
//!
//! [settings]
//! mode = "static"
//! iterations = 50
//!
//! [[constraint]]
//! kind = "edge_strain"
//! pattern = "edge_vertices"
//! weight = 1.0
//!
//! [[anchor]]
//! near = [-0.5, 0.5, 0.0]
//! target = [-0.5, 0.5, 0.2]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shapeup_math::DVec3;
use shapeup_mesh::generators::{quad_grid, tri_grid};
use shapeup_mesh::{IndexPattern, PolyMesh};
use shapeup_solver::{ConstraintEdit, ConstraintKind, Masses, Solver, SolverConfig};
use shapeup_types::constants::{DEFAULT_DYNAMIC_ITERATIONS, DEFAULT_STATIC_ITERATIONS};
use shapeup_types::{ConstraintId, ShapeError, ShapeResult};

/// Default anchor weight: stiff relative to unit-weight shape constraints.
pub const DEFAULT_ANCHOR_WEIGHT: f64 = 100.0;

/// A complete scene file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub geometry: Geometry,

    #[serde(default)]
    pub settings: Settings,

    /// Solver tuning; every field is optional.
    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default, rename = "constraint")]
    pub constraints: Vec<ConstraintGroup>,

    #[serde(default, rename = "anchor")]
    pub anchors: Vec<Anchor>,

    #[serde(default, rename = "force")]
    pub forces: Vec<ForceSpec>,

    /// Directory that relative mesh paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Where the points come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Geometry {
    /// An explicit point list, no faces.
    Points { points: Vec<[f64; 3]> },
    /// A flat quad grid in the XY plane.
    QuadGrid {
        cols: usize,
        rows: usize,
        width: f64,
        height: f64,
    },
    /// A flat triangle grid in the XY plane.
    TriGrid {
        cols: usize,
        rows: usize,
        width: f64,
        height: f64,
    },
    /// A JSON-serialized [`PolyMesh`].
    Mesh { path: PathBuf },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneMode {
    #[default]
    Static,
    Dynamic,
}

/// How the scene is solved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: SceneMode,
    /// Static iterations.
    pub iterations: Option<u32>,
    /// Dynamic time steps.
    pub steps: Option<u32>,
    /// Uniform point mass (dynamic).
    pub mass: Option<f64>,
    /// Velocity retention per step (dynamic).
    pub damping: Option<f64>,
    /// Time step (dynamic).
    pub timestep: Option<f64>,
}

impl Settings {
    /// Iterations (static) or steps (dynamic) to run.
    pub fn solve_count(&self) -> u32 {
        match self.mode {
            SceneMode::Static => self.iterations.unwrap_or(DEFAULT_STATIC_ITERATIONS),
            SceneMode::Dynamic => self.steps.unwrap_or(DEFAULT_DYNAMIC_ITERATIONS),
        }
    }
}

/// One constraint per index set, all of the same kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintGroup {
    pub kind: ConstraintKind,

    /// Explicit index sets.
    #[serde(default)]
    pub indices: Vec<Vec<usize>>,

    /// Index sets generated from the mesh.
    #[serde(default)]
    pub pattern: Option<IndexPattern>,

    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Kind-specific parameters, see [`ConstraintGroup::scalar_edits`].
    #[serde(default)]
    pub scalars: Vec<f64>,

    /// Uniform Laplacian only: keep the current offset instead of smoothing.
    #[serde(default)]
    pub displacement: bool,
}

fn default_weight() -> f64 {
    1.0
}

fn default_anchor_weight() -> f64 {
    DEFAULT_ANCHOR_WEIGHT
}

/// A closeness constraint placed by index or by location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anchor {
    #[serde(default)]
    pub point: Option<usize>,
    /// Anchor the vertex nearest to this location.
    #[serde(default)]
    pub near: Option<[f64; 3]>,
    /// Target position; defaults to the point's current position.
    #[serde(default)]
    pub target: Option<[f64; 3]>,
    #[serde(default = "default_anchor_weight")]
    pub weight: f64,
}

/// External forces (dynamic mode only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForceSpec {
    Gravity {
        force: [f64; 3],
    },
    Vertex {
        force: [f64; 3],
        #[serde(default)]
        point: Option<usize>,
        #[serde(default)]
        near: Option<[f64; 3]>,
    },
}

/// A scene turned into a solver, with the ids it registered.
pub struct BuiltScene {
    pub mesh: PolyMesh,
    pub solver: Solver,
    /// Ids per constraint group, in file order.
    pub groups: Vec<Vec<ConstraintId>>,
    pub anchors: Vec<ConstraintId>,
}

impl Scene {
    /// Reads a scene file; relative mesh paths resolve against its directory.
    pub fn load(path: &Path) -> ShapeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_toml(&content, base_dir)
    }

    /// Parses a scene from TOML text.
    pub fn from_toml(content: &str, base_dir: PathBuf) -> ShapeResult<Self> {
        let mut scene: Scene = toml::from_str(content)
            .map_err(|e| ShapeError::Serialization(format!("scene: {e}")))?;
        scene.base_dir = base_dir;
        Ok(scene)
    }

    /// Builds and validates the scene's mesh.
    pub fn mesh(&self) -> ShapeResult<PolyMesh> {
        let mesh = match &self.geometry {
            Geometry::Points { points } => {
                let flat: Vec<f64> = points.iter().flatten().copied().collect();
                PolyMesh::from_interleaved(&flat, Vec::new())?
            }
            Geometry::QuadGrid {
                cols,
                rows,
                width,
                height,
            } => quad_grid(*cols, *rows, *width, *height),
            Geometry::TriGrid {
                cols,
                rows,
                width,
                height,
            } => tri_grid(*cols, *rows, *width, *height),
            Geometry::Mesh { path } => {
                let full = self.base_dir.join(path);
                let content = std::fs::read_to_string(&full)?;
                serde_json::from_str::<PolyMesh>(&content).map_err(|e| {
                    ShapeError::Serialization(format!("mesh {}: {e}", full.display()))
                })?
            }
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Creates a solver holding the scene's points, constraints, anchors
    /// and forces. The solver is not initialized.
    pub fn build(&self) -> ShapeResult<BuiltScene> {
        let mesh = self.mesh()?;
        let mut solver = Solver::with_config(self.solver.clone());
        solver.set_points(&mesh.to_interleaved(), mesh.vertex_count())?;

        let mut groups = Vec::with_capacity(self.constraints.len());
        for (g, group) in self.constraints.iter().enumerate() {
            let sets = group.index_sets(&mesh).map_err(|e| in_group(g, e))?;
            let mut ids = Vec::with_capacity(sets.len());
            for set in &sets {
                let id = group.register(&mut solver, set).map_err(|e| in_group(g, e))?;
                ids.push(id);
            }
            groups.push(ids);
        }

        let mut anchors = Vec::with_capacity(self.anchors.len());
        for anchor in &self.anchors {
            let point = resolve_point(&mesh, anchor.point, anchor.near)?;
            let id = solver.add_closeness_constraint(&[point], anchor.weight)?;
            if let Some(target) = anchor.target {
                solver.edit_closeness_constraint(id, DVec3::from_array(target))?;
            }
            anchors.push(id);
        }

        for force in &self.forces {
            match force {
                ForceSpec::Gravity { force } => {
                    solver.add_gravity_force(DVec3::from_array(*force))?;
                }
                ForceSpec::Vertex { force, point, near } => {
                    let point = resolve_point(&mesh, *point, *near)?;
                    solver.add_vertex_force(DVec3::from_array(*force), point)?;
                }
            }
        }

        Ok(BuiltScene {
            mesh,
            solver,
            groups,
            anchors,
        })
    }

    /// Initializes `solver` in the scene's mode.
    pub fn init(&self, solver: &mut Solver) -> ShapeResult<()> {
        match self.settings.mode {
            SceneMode::Static => solver.init(),
            SceneMode::Dynamic => {
                let config = solver.config();
                let mass = self.settings.mass.unwrap_or(config.default_mass);
                let damping = self.settings.damping.unwrap_or(config.default_damping);
                let timestep = self.settings.timestep.unwrap_or(config.default_timestep);
                solver.init_dynamic(Masses::Uniform(mass), damping, timestep)
            }
        }
    }
}

impl ConstraintGroup {
    /// Explicit indices plus the pattern's sets.
    pub fn index_sets(&self, mesh: &PolyMesh) -> ShapeResult<Vec<Vec<usize>>> {
        let mut sets = self.indices.clone();
        if let Some(pattern) = self.pattern {
            if pattern != IndexPattern::VerticesEach
                && pattern != IndexPattern::VerticesAll
                && mesh.face_count() == 0
            {
                return Err(ShapeError::InvalidParameter(format!(
                    "pattern {pattern} needs a mesh with faces"
                )));
            }
            sets.extend(
                pattern
                    .generate(mesh)
                    .into_iter()
                    .map(|set| set.into_iter().map(|v| v as usize).collect()),
            );
        }
        if sets.is_empty() {
            return Err(ShapeError::InvalidParameter(
                "no index sets: give `indices` or a `pattern`".into(),
            ));
        }
        Ok(sets)
    }

    /// Registers one constraint on `ids` and applies the scalar edits.
    pub fn register(&self, solver: &mut Solver, ids: &[usize]) -> ShapeResult<ConstraintId> {
        let id = match self.kind {
            ConstraintKind::Angle => {
                let (min, max) = match self.scalars[..] {
                    [] => (0.0, std::f64::consts::PI),
                    [min, max] => (min, max),
                    _ => return Err(self.scalar_count_error("[min, max]")),
                };
                solver.add_angle_constraint(ids, min, max, self.weight)?
            }
            ConstraintKind::UniformLaplacian => {
                solver.add_uniform_laplacian_constraint(ids, self.displacement, self.weight)?
            }
            kind => solver.add_constraint(kind, ids, self.weight)?,
        };
        for edit in self.scalar_edits()? {
            solver.edit_constraint(id, edit)?;
        }
        Ok(id)
    }

    /// Edits encoded by `scalars`:
    ///
    /// - edge strain: `[rest]`, `[min, max]` or `[rest, min, max]`
    /// - triangle/tetrahedron strain, area, volume, bending: `[min, max]`
    /// - closeness: `[x, y, z]` target
    /// - angle: `[min, max]`, applied at registration
    pub fn scalar_edits(&self) -> ShapeResult<Vec<ConstraintEdit>> {
        let s = &self.scalars[..];
        let edits = match self.kind {
            _ if s.is_empty() => Vec::new(),
            ConstraintKind::EdgeStrain => match *s {
                [rest] => vec![ConstraintEdit::RestLength(rest)],
                [min, max] => vec![ConstraintEdit::Range { min, max }],
                [rest, min, max] => vec![
                    ConstraintEdit::RestLength(rest),
                    ConstraintEdit::Range { min, max },
                ],
                _ => {
                    return Err(
                        self.scalar_count_error("[rest], [min, max] or [rest, min, max]")
                    )
                }
            },
            ConstraintKind::TriangleStrain
            | ConstraintKind::TetrahedronStrain
            | ConstraintKind::Area
            | ConstraintKind::Volume
            | ConstraintKind::Bending => match *s {
                [min, max] => vec![ConstraintEdit::Range { min, max }],
                _ => return Err(self.scalar_count_error("[min, max]")),
            },
            ConstraintKind::Closeness => match *s {
                [x, y, z] => vec![ConstraintEdit::Target(DVec3::new(x, y, z))],
                _ => return Err(self.scalar_count_error("[x, y, z]")),
            },
            ConstraintKind::Angle => Vec::new(),
            kind => {
                return Err(ShapeError::InvalidParameter(format!(
                    "{kind} constraints take no scalars"
                )))
            }
        };
        Ok(edits)
    }

    fn scalar_count_error(&self, expected: &str) -> ShapeError {
        ShapeError::InvalidParameter(format!(
            "{} scalars must be {expected}, got {} values",
            self.kind,
            self.scalars.len()
        ))
    }
}

fn resolve_point(
    mesh: &PolyMesh,
    point: Option<usize>,
    near: Option<[f64; 3]>,
) -> ShapeResult<usize> {
    match (point, near) {
        (Some(p), None) => Ok(p),
        (None, Some(loc)) => mesh
            .closest_vertex(DVec3::from_array(loc))
            .map(|v| v as usize)
            .ok_or_else(|| ShapeError::InvalidMesh("mesh has no vertices".into())),
        _ => Err(ShapeError::InvalidParameter(
            "give exactly one of `point` or `near`".into(),
        )),
    }
}

fn in_group(group: usize, e: ShapeError) -> ShapeError {
    match e {
        ShapeError::InvalidParameter(msg) => {
            ShapeError::InvalidParameter(format!("constraint group {group}: {msg}"))
        }
        ShapeError::InvalidTopology(msg) => {
            ShapeError::InvalidTopology(format!("constraint group {group}: {msg}"))
        }
        other => other,
    }
}
