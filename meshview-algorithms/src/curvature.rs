//! Discrete per-vertex curvature.
//!
//! Two estimators are available:
//!
//! - **Mean (umbrella)**: the uniform Laplacian `L = centroid(one-ring) - p`
//!   projected on the vertex normal, scaled by the mean squared edge length.
//!   On a sampled sphere of radius `R` this approaches `1/R`. Convex regions
//!   are positive, concave regions negative.
//! - **Gaussian (angle deficit)**: `(2π - Σθ) / (A / 3)` at interior vertices
//!   and `(π - Σθ) / (A / 3)` on the boundary, over the fan triangulation.
//!
//! Both read positions only, never another vertex's curvature, so the
//! per-vertex work is independent and runs in parallel.

use std::f64::consts::PI;

use meshview_core::{
    compute_face_normals, compute_vertex_normals, Point3d, PolygonMesh, Result, Vector3d,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::adjacency::AdjacencyTable;
use crate::indices::prepare_face_indices;

const AREA_EPSILON: f64 = 1e-12;

/// Which discrete curvature to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurvatureMethod {
    /// Signed mean curvature from the umbrella Laplacian
    #[default]
    MeanUmbrella,
    /// Gaussian curvature from the angle deficit
    GaussianAngleDeficit,
}

/// Curvature of every vertex of `mesh`.
///
/// Uses the mesh's stored vertex normals when present and computes them
/// otherwise. Isolated vertices get 0.
pub fn compute_curvature(mesh: &PolygonMesh, method: CurvatureMethod) -> Result<Vec<f64>> {
    match method {
        CurvatureMethod::MeanUmbrella => {
            let adjacency = AdjacencyTable::from_mesh(mesh)?;
            if mesh.has_normals() {
                Ok(umbrella_curvature(&mesh.vertices, &adjacency, mesh.vertex_normals()))
            } else {
                let face_normals = compute_face_normals(&mesh.vertices, &mesh.faces);
                let normals =
                    compute_vertex_normals(mesh.vertex_count(), &mesh.faces, &face_normals);
                Ok(umbrella_curvature(&mesh.vertices, &adjacency, &normals))
            }
        }
        CurvatureMethod::GaussianAngleDeficit => {
            let triangles = prepare_face_indices(mesh).indices;
            let boundary = mesh.half_edges().boundary_vertices();
            Ok(angle_deficit_curvature(&mesh.vertices, &triangles, &boundary))
        }
    }
}

/// Signed mean curvature from the uniform Laplacian.
///
/// `normals` must be index-aligned with `positions`. Where a normal is zero
/// the unsigned magnitude `2|L| / mean(|e|²)` is used instead.
pub fn umbrella_curvature(
    positions: &[Point3d],
    adjacency: &AdjacencyTable,
    normals: &[Vector3d],
) -> Vec<f64> {
    (0..positions.len())
        .into_par_iter()
        .map(|v| {
            let neighbors = adjacency.neighbors(v);
            if neighbors.is_empty() {
                return 0.0;
            }
            let p = positions[v];
            let count = neighbors.len() as f64;

            let mut centroid = Vector3d::zeros();
            let mut mean_sq = 0.0;
            for &u in neighbors {
                centroid += positions[u].coords;
                mean_sq += (positions[u] - p).norm_squared();
            }
            centroid /= count;
            mean_sq /= count;
            if mean_sq < AREA_EPSILON {
                return 0.0;
            }

            let laplacian = centroid - p.coords;
            match normals.get(v) {
                Some(n) if n.norm_squared() > 0.0 => -2.0 * laplacian.dot(n) / mean_sq,
                _ => 2.0 * laplacian.norm() / mean_sq,
            }
        })
        .collect()
}

/// Angle at `a` in triangle (a, b, c); 0 when an edge is degenerate
fn corner_angle(a: &Point3d, b: &Point3d, c: &Point3d) -> f64 {
    let ab = b - a;
    let ac = c - a;
    let denom = ab.norm() * ac.norm();
    if denom < AREA_EPSILON {
        return 0.0;
    }
    (ab.dot(&ac) / denom).clamp(-1.0, 1.0).acos()
}

/// Gaussian curvature from the angle deficit over a flat triangle list.
///
/// `boundary[v]` selects the `π` reference angle. Vertices with no incident
/// area get 0.
pub fn angle_deficit_curvature(positions: &[Point3d], triangles: &[u32], boundary: &[bool]) -> Vec<f64> {
    let n = positions.len();
    let mut angle_sum = vec![0.0; n];
    let mut area = vec![0.0; n];

    for tri in triangles.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (pa, pb, pc) = (&positions[a], &positions[b], &positions[c]);
        let third = 0.5 * (pb - pa).cross(&(pc - pa)).norm() / 3.0;

        angle_sum[a] += corner_angle(pa, pb, pc);
        angle_sum[b] += corner_angle(pb, pc, pa);
        angle_sum[c] += corner_angle(pc, pa, pb);
        for v in [a, b, c] {
            area[v] += third;
        }
    }

    (0..n)
        .into_par_iter()
        .map(|v| {
            if area[v] < AREA_EPSILON {
                return 0.0;
            }
            let reference = if boundary.get(v).copied().unwrap_or(false) {
                PI
            } else {
                2.0 * PI
            };
            (reference - angle_sum[v]) / area[v]
        })
        .collect()
}
