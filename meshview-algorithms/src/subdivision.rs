//! Loop subdivision for triangle meshes.
//!
//! Polygons are fan-triangulated first. Each iteration inserts one vertex
//! per edge, repositions the original vertices and splits every triangle
//! into four:
//!
//! - interior edge vertex: `3/8 (v0 + v1) + 1/8 (left + right)`
//! - boundary edge vertex: `1/2 (v0 + v1)`
//! - interior vertex: `(1 - nβ) v + β Σ neighbors`
//! - boundary vertex: `3/4 v + 1/8 (prev + next)` along the boundary
//!
//! Edges shared by more than two triangles are treated like boundary
//! edges.

use std::collections::HashMap;
use std::f64::consts::PI;

use itertools::Itertools;
use meshview_core::{Error, Point3d, PolygonMesh, Result, Vector3d};
use serde::{Deserialize, Serialize};

use crate::adjacency::AdjacencyTable;
use crate::indices::prepare_face_indices;

/// Iterations above this would grow the face count by more than 4^6
pub const MAX_SUBDIVISION_ITERATIONS: usize = 6;

/// Options for Loop subdivision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdivisionOptions {
    /// Number of subdivision iterations
    pub iterations: usize,
    /// Apply the boundary rules; when false boundary vertices stay fixed
    pub smooth_boundary: bool,
}

impl Default for SubdivisionOptions {
    fn default() -> Self {
        Self {
            iterations: 1,
            smooth_boundary: true,
        }
    }
}

impl SubdivisionOptions {
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations,
            ..Self::default()
        }
    }
}

/// Subdivide `mesh`, returning a new triangle mesh.
///
/// Zero iterations returns the triangulated input. More than
/// [`MAX_SUBDIVISION_ITERATIONS`] fails with `InvalidParameter`.
pub fn loop_subdivide(mesh: &PolygonMesh, options: &SubdivisionOptions) -> Result<PolygonMesh> {
    if options.iterations > MAX_SUBDIVISION_ITERATIONS {
        return Err(Error::InvalidParameter(format!(
            "subdivision iterations must be at most {MAX_SUBDIVISION_ITERATIONS}, got {}",
            options.iterations
        )));
    }

    let mut current = mesh.triangulated();
    for _ in 0..options.iterations {
        current = loop_subdivide_once(&current, options.smooth_boundary)?;
    }
    Ok(current)
}

/// Triangles sharing an undirected edge, and the vertex opposite it in each
#[derive(Debug, Clone)]
struct EdgeRecord {
    new_vertex: usize,
    opposite: Vec<usize>,
}

impl EdgeRecord {
    fn is_interior(&self) -> bool {
        self.opposite.len() == 2
    }
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

fn loop_subdivide_once(mesh: &PolygonMesh, smooth_boundary: bool) -> Result<PolygonMesh> {
    let triangles = prepare_face_indices(mesh).indices;
    let vertex_count = mesh.vertex_count();
    if triangles.is_empty() {
        return Ok(mesh.clone());
    }

    // Edge vertices are numbered in first-encounter order so the output is
    // deterministic.
    let mut edges: HashMap<(usize, usize), EdgeRecord> = HashMap::new();
    let mut edge_order: Vec<(usize, usize)> = Vec::new();
    for tri in triangles.chunks_exact(3) {
        for (a, b, c) in tri.iter().map(|&v| v as usize).circular_tuple_windows() {
            let key = edge_key(a, b);
            let record = edges.entry(key).or_insert_with(|| {
                edge_order.push(key);
                EdgeRecord {
                    new_vertex: vertex_count + edge_order.len() - 1,
                    opposite: Vec::with_capacity(2),
                }
            });
            record.opposite.push(c);
        }
    }

    let positions = &mesh.vertices;
    let mut vertices = Vec::with_capacity(vertex_count + edge_order.len());

    // Boundary neighbors per vertex, along boundary (or non-manifold) edges
    let mut boundary_neighbors: Vec<Vec<usize>> = vec![Vec::new(); vertex_count];
    for (&(a, b), record) in edge_order.iter().map(|k| (k, &edges[k])) {
        if !record.is_interior() {
            boundary_neighbors[a].push(b);
            boundary_neighbors[b].push(a);
        }
    }

    let adjacency = AdjacencyTable::build(vertex_count, &triangles)?;
    for (v, p) in positions.iter().enumerate() {
        let boundary = &boundary_neighbors[v];
        let updated = if !boundary.is_empty() {
            match (smooth_boundary, boundary.as_slice()) {
                (true, [left, right]) => Point3d::from(
                    p.coords * 0.75 + (positions[*left].coords + positions[*right].coords) * 0.125,
                ),
                _ => *p,
            }
        } else {
            let ring = adjacency.neighbors(v);
            if ring.is_empty() {
                *p
            } else {
                let beta = loop_beta(ring.len());
                let sum: Vector3d = ring.iter().map(|&u| positions[u].coords).sum();
                Point3d::from(p.coords * (1.0 - ring.len() as f64 * beta) + sum * beta)
            }
        };
        vertices.push(updated);
    }

    for key in &edge_order {
        let record = &edges[key];
        let (p0, p1) = (positions[key.0].coords, positions[key.1].coords);
        let point = if record.is_interior() {
            let (l, r) = (
                positions[record.opposite[0]].coords,
                positions[record.opposite[1]].coords,
            );
            (p0 + p1) * 0.375 + (l + r) * 0.125
        } else {
            (p0 + p1) * 0.5
        };
        vertices.push(Point3d::from(point));
    }

    let mid = |a: usize, b: usize| edges[&edge_key(a, b)].new_vertex;
    let mut faces = Vec::with_capacity(triangles.len() / 3 * 4);
    for tri in triangles.chunks_exact(3) {
        let [v0, v1, v2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (e01, e12, e20) = (mid(v0, v1), mid(v1, v2), mid(v2, v0));
        faces.push([v0, e01, e20]);
        faces.push([v1, e12, e01]);
        faces.push([v2, e20, e12]);
        faces.push([e01, e12, e20]);
    }

    PolygonMesh::from_triangles(vertices, &faces)
}

/// Loop's β weight for an interior vertex of valence `n`
fn loop_beta(n: usize) -> f64 {
    if n == 3 {
        3.0 / 16.0
    } else {
        let n_f = n as f64;
        let inner = 3.0 / 8.0 + 0.25 * (2.0 * PI / n_f).cos();
        (5.0 / 8.0 - inner * inner) / n_f
    }
}
