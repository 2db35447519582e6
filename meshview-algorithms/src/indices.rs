//! GPU-ready triangle and edge index buffers

use meshview_core::{check_face, fan_triangles, HalfEdgeIndex, MeshWarning, PolygonMesh};
use std::collections::HashSet;

/// Flat triangle list plus the faces that had to be left out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceIndices {
    /// Three vertex ids per triangle, counter-clockwise
    pub indices: Vec<u32>,
    pub warnings: Vec<MeshWarning>,
}

impl FaceIndices {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Triangulate every face into a flat index list.
///
/// Triangles pass through unchanged; larger polygons are fanned around
/// their first vertex, which is only correct for convex or near-planar
/// faces. Faces with fewer than three vertices or with out-of-range ids are
/// skipped and reported.
pub fn prepare_face_indices(mesh: &PolygonMesh) -> FaceIndices {
    let vertex_count = mesh.vertex_count();
    let mut out = FaceIndices {
        indices: Vec::with_capacity(mesh.face_count() * 3),
        warnings: Vec::new(),
    };

    for (fi, face) in mesh.faces.iter().enumerate() {
        if let Some(warning) = check_face(fi, face, vertex_count) {
            tracing::warn!("{warning}");
            out.warnings.push(warning);
            continue;
        }
        for tri in fan_triangles(face) {
            out.indices.extend(tri.iter().map(|&v| v as u32));
        }
    }

    out
}

/// Every undirected edge of the mesh exactly once, as a flat pair list.
///
/// Order is unspecified; only the set of pairs is meaningful.
pub fn prepare_edge_indices(mesh: &PolygonMesh) -> Vec<u32> {
    edge_indices_from_half_edges(&mesh.half_edges())
}

/// Edge pairs from an already built half-edge index.
///
/// A half-edge owns its edge when it is on the boundary or when its index
/// is lower than its opposite's. Pairs are still checked against a set so
/// inconsistently wound or non-manifold input cannot produce duplicates.
pub fn edge_indices_from_half_edges(index: &HalfEdgeIndex) -> Vec<u32> {
    let mut seen: HashSet<(usize, usize)> = HashSet::with_capacity(index.len() / 2 + 1);
    let mut edges = Vec::with_capacity(index.len());

    for (he_idx, he) in index.iter() {
        let owns_edge = match he.opposite {
            None => true,
            Some(opposite) => he_idx < opposite,
        };
        if !owns_edge {
            continue;
        }
        let key = he.undirected();
        if seen.insert(key) {
            edges.push(key.0 as u32);
            edges.push(key.1 as u32);
        }
    }

    edges
}
