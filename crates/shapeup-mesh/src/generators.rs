//! Procedural mesh generators for scenes and testing.
//!
//! These generators produce deterministic, resolution-configurable flat
//! grids with counter-clockwise winding (seen from +Z).

use shapeup_math::DVec3;

use crate::mesh::PolyMesh;

/// Generates a flat rectangular grid of quad faces in the XY plane.
///
/// The grid spans `[-width/2, width/2]` in X and `[-height/2, height/2]` in Y,
/// centered at the origin at Z=0. Vertex `j * (cols + 1) + i` sits at
/// column `i`, row `j`, rows running top to bottom.
///
/// # Example
/// ```
/// use shapeup_mesh::generators::quad_grid;
/// let mesh = quad_grid(2, 2, 1.0, 1.0);
/// assert_eq!(mesh.vertex_count(), 9);
/// assert_eq!(mesh.face_count(), 4);
/// ```
pub fn quad_grid(cols: usize, rows: usize, width: f64, height: f64) -> PolyMesh {
    let mut mesh = grid_vertices(cols, rows, width, height);
    mesh.faces.reserve(cols * rows);
    for_each_cell(cols, rows, |tl, tr, bl, br| {
        mesh.faces.push(vec![tl, bl, br, tr]);
    });
    mesh
}

/// Generates the same grid as [`quad_grid`] with every quad split into two
/// triangles along the top-right to bottom-left diagonal.
pub fn tri_grid(cols: usize, rows: usize, width: f64, height: f64) -> PolyMesh {
    let mut mesh = grid_vertices(cols, rows, width, height);
    mesh.faces.reserve(cols * rows * 2);
    for_each_cell(cols, rows, |tl, tr, bl, br| {
        // Upper-left triangle
        mesh.faces.push(vec![tl, bl, tr]);
        // Lower-right triangle
        mesh.faces.push(vec![tr, bl, br]);
    });
    mesh
}

fn grid_vertices(cols: usize, rows: usize, width: f64, height: f64) -> PolyMesh {
    let verts_x = cols + 1;
    let verts_y = rows + 1;
    let mut mesh = PolyMesh::with_capacity(verts_x * verts_y, 0);

    let half_w = width / 2.0;
    let half_h = height / 2.0;
    let cols_f = cols.max(1) as f64;
    let rows_f = rows.max(1) as f64;

    for j in 0..verts_y {
        for i in 0..verts_x {
            let u = i as f64 / cols_f;
            let v = j as f64 / rows_f;
            // Top to bottom
            mesh.push_vertex(DVec3::new(-half_w + u * width, half_h - v * height, 0.0));
        }
    }
    mesh
}

/// Calls `f(top_left, top_right, bottom_left, bottom_right)` for each cell.
fn for_each_cell(cols: usize, rows: usize, mut f: impl FnMut(u32, u32, u32, u32)) {
    let verts_x = (cols + 1) as u32;
    for j in 0..rows as u32 {
        for i in 0..cols as u32 {
            let top_left = j * verts_x + i;
            let top_right = top_left + 1;
            let bot_left = top_left + verts_x;
            let bot_right = bot_left + 1;
            f(top_left, top_right, bot_left, bot_right);
        }
    }
}
