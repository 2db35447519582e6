//! Half-edge index derived from a polygon mesh
//!
//! The index is an arena: half-edges of face `f` occupy the contiguous range
//! `face_range(f)` in face order, so `next`/`prev` are computed from the
//! position inside that range. Opposite links are resolved once through a
//! `(from, to)` lookup. Nothing here holds references into the mesh, so the
//! index can be rebuilt whenever the faces change.

use crate::mesh::{check_face, PolygonMesh};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// A directed edge owned by one face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge {
    pub from: usize,
    pub to: usize,
    pub face: usize,
    /// `None` on a boundary
    pub opposite: Option<usize>,
}

impl HalfEdge {
    /// True when no face lies on the other side
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.opposite.is_none()
    }

    /// `(min, max)` vertex pair of the undirected edge
    #[inline]
    pub fn undirected(&self) -> (usize, usize) {
        (self.from.min(self.to), self.from.max(self.to))
    }
}

/// Arena of half-edges for every valid face of a mesh
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeIndex {
    half_edges: Vec<HalfEdge>,
    /// `face_offsets[f]..face_offsets[f + 1]` are the half-edges of face `f`
    face_offsets: Vec<usize>,
    vertex_count: usize,
}

impl HalfEdgeIndex {
    /// Build the index for `mesh`.
    ///
    /// Faces that fail validation get an empty half-edge range. When more
    /// than two faces share an edge, each half-edge pairs with the first
    /// still unpaired reverse half-edge; the rest stay boundary.
    pub fn build(mesh: &PolygonMesh) -> Self {
        let vertex_count = mesh.vertex_count();
        let mut half_edges = Vec::with_capacity(mesh.faces.iter().map(Vec::len).sum());
        let mut face_offsets = Vec::with_capacity(mesh.face_count() + 1);

        for (fi, face) in mesh.faces.iter().enumerate() {
            face_offsets.push(half_edges.len());
            if check_face(fi, face, vertex_count).is_some() {
                continue;
            }
            let n = face.len();
            for j in 0..n {
                half_edges.push(HalfEdge {
                    from: face[j],
                    to: face[(j + 1) % n],
                    face: fi,
                    opposite: None,
                });
            }
        }
        face_offsets.push(half_edges.len());

        let mut by_direction: HashMap<(usize, usize), Vec<usize>> =
            HashMap::with_capacity(half_edges.len());
        for (he_idx, he) in half_edges.iter().enumerate() {
            by_direction.entry((he.from, he.to)).or_default().push(he_idx);
        }

        for he_idx in 0..half_edges.len() {
            if half_edges[he_idx].opposite.is_some() {
                continue;
            }
            let HalfEdge { from, to, .. } = half_edges[he_idx];
            let Some(candidates) = by_direction.get(&(to, from)) else {
                continue;
            };
            let twin = candidates
                .iter()
                .copied()
                .find(|&c| c != he_idx && half_edges[c].opposite.is_none());
            if let Some(twin_idx) = twin {
                half_edges[he_idx].opposite = Some(twin_idx);
                half_edges[twin_idx].opposite = Some(he_idx);
            }
        }

        Self {
            half_edges,
            face_offsets,
            vertex_count,
        }
    }

    /// Number of half-edges
    pub fn len(&self) -> usize {
        self.half_edges.len()
    }

    /// True when the mesh had no valid faces
    pub fn is_empty(&self) -> bool {
        self.half_edges.is_empty()
    }

    /// All half-edges in arena order
    pub fn half_edges(&self) -> &[HalfEdge] {
        &self.half_edges
    }

    /// Iterate `(index, half-edge)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, &HalfEdge)> {
        self.half_edges.iter().enumerate()
    }

    pub fn get(&self, he: usize) -> Option<&HalfEdge> {
        self.half_edges.get(he)
    }

    /// Half-edge range of a face (empty for skipped faces)
    pub fn face_range(&self, face: usize) -> Range<usize> {
        match (self.face_offsets.get(face), self.face_offsets.get(face + 1)) {
            (Some(&start), Some(&end)) => start..end,
            _ => 0..0,
        }
    }

    /// Next half-edge around the owning face
    pub fn next(&self, he: usize) -> usize {
        let range = self.face_range(self.half_edges[he].face);
        if he + 1 == range.end {
            range.start
        } else {
            he + 1
        }
    }

    /// Previous half-edge around the owning face
    pub fn prev(&self, he: usize) -> usize {
        let range = self.face_range(self.half_edges[he].face);
        if he == range.start {
            range.end - 1
        } else {
            he - 1
        }
    }

    /// Number of distinct undirected edges
    pub fn edge_count(&self) -> usize {
        self.half_edges
            .iter()
            .map(HalfEdge::undirected)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Number of distinct undirected edges carrying a boundary half-edge
    pub fn boundary_edge_count(&self) -> usize {
        self.half_edges
            .iter()
            .filter(|he| he.is_boundary())
            .map(HalfEdge::undirected)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Per-vertex flag: touches at least one boundary half-edge
    pub fn boundary_vertices(&self) -> Vec<bool> {
        let mut flags = vec![false; self.vertex_count];
        for he in self.half_edges.iter().filter(|he| he.is_boundary()) {
            flags[he.from] = true;
            flags[he.to] = true;
        }
        flags
    }
}
