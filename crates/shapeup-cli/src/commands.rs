//! CLI command implementations.

use std::path::Path;

use shapeup_cli::{run, Scene};
use shapeup_mesh::{IndexPattern, Topology};

/// Solve a scene and print or write the report.
pub fn solve(
    scene_path: &str,
    output_path: Option<&str>,
    iterations: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let scene = Scene::load(Path::new(scene_path))?;
    let report = run(&scene, iterations)?;
    let json = serde_json::to_string_pretty(&report)?;

    if let Some(path) = output_path {
        std::fs::write(path, &json)?;
        println!("shapeup solve");
        println!("─────────────");
        println!("Scene:          {scene_path}");
        println!("Mode:           {:?}", report.mode);
        println!("Points:         {}", report.points.len());
        println!("Constraints:    {}", report.errors.len());
        println!("Iterations:     {}", report.iterations);
        println!("Final residual: {:.3e}", report.final_residual);
        println!("Max error:      {:.3e}", report.max_error());
        println!("Wall time:      {:.3}ms", report.wall_time * 1000.0);
        println!();
        println!("Results written to: {path}");
    } else {
        println!("{json}");
    }

    Ok(())
}

/// Validate a scene: parse, mesh, registration and factorization.
pub fn validate(scene_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("shapeup validator");
    println!("─────────────────");
    println!();
    println!("Validating scene: {scene_path}");

    let scene = Scene::load(Path::new(scene_path))?;
    let mut built = match scene.build() {
        Ok(built) => built,
        Err(e) => {
            println!("❌ Scene construction failed: {e}");
            return Ok(());
        }
    };
    println!(
        "Mesh: {} verts, {} faces",
        built.mesh.vertex_count(),
        built.mesh.face_count()
    );
    println!(
        "Constraints: {} ({} groups, {} anchors), forces: {}",
        built.solver.constraint_count(),
        built.groups.len(),
        built.anchors.len(),
        built.solver.force_count()
    );

    match scene.init(&mut built.solver) {
        Ok(()) => println!("✅ Scene is valid ({:?} mode).", built.solver.mode()),
        Err(e) => println!("❌ Initialization failed: {e}"),
    }

    Ok(())
}

/// Print the index-set count of every pattern for the scene's mesh.
pub fn patterns(scene_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let scene = Scene::load(Path::new(scene_path))?;
    let mesh = scene.mesh()?;
    let topology = Topology::build(&mesh);

    println!("Index patterns for {scene_path}");
    println!("────────────────────");
    println!(
        "Mesh: {} verts, {} faces, {} edges ({} boundary)",
        mesh.vertex_count(),
        mesh.face_count(),
        topology.edges.len(),
        topology.boundary_edge_count()
    );
    println!();

    for pattern in IndexPattern::ALL {
        let sets = pattern.index_sets(&mesh, &topology);
        let largest = sets.iter().map(Vec::len).max().unwrap_or(0);
        println!("  {:<22} {:>6} sets (largest: {largest})", pattern.name(), sets.len());
    }

    Ok(())
}
