//! Edge collapse simplification
//!
//! Implements iterative edge collapse mesh simplification on a mutable
//! half-edge structure, with quadric error metrics (QEM) choosing which edge
//! goes next. Collapses are rejected when they would break the link
//! condition, flip a surviving face, or take the mesh below `min_faces`.

use crate::quadric::Quadric;
use crate::{target_face_count, validate_ratio, MeshSimplifier};
use meshview_core::{Error, HalfEdgeIndex, Point3d, PolygonMesh, Result};
use priority_queue::PriorityQueue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

const INVALID: usize = usize::MAX;

/// Surviving faces whose normal turns by more than this (cosine) are flips
const FLIP_COSINE: f64 = 0.0;

// ============================================================
// Half-Edge Data Structure
// ============================================================

#[derive(Debug, Clone)]
struct HalfEdge {
    target: usize,
    twin: usize,
    next: usize,
    prev: usize,
    face: usize,
}

/// Mutable half-edge mesh for topology-aware edge collapse operations.
struct CollapseMesh {
    half_edges: Vec<HalfEdge>,
    /// One outgoing half-edge per vertex (INVALID if removed)
    vertex_edge: Vec<usize>,
    /// One half-edge per face (INVALID if removed)
    face_edge: Vec<usize>,
    active_face_count: usize,
    positions: Vec<Point3d>,
    quadrics: Vec<Quadric>,
    vertex_removed: Vec<bool>,
}

impl CollapseMesh {
    /// Build from a triangle mesh. Opposite links come from the shared
    /// [`HalfEdgeIndex`], so the pairing rules match the rest of the crate.
    fn from_triangles(mesh: &PolygonMesh) -> Self {
        let nv = mesh.vertex_count();
        let index = HalfEdgeIndex::build(mesh);

        let mut half_edges = Vec::with_capacity(index.len());
        let mut vertex_edge = vec![INVALID; nv];
        for (he_idx, he) in index.iter() {
            half_edges.push(HalfEdge {
                target: he.to,
                twin: he.opposite.unwrap_or(INVALID),
                next: index.next(he_idx),
                prev: index.prev(he_idx),
                face: he.face,
            });
            if vertex_edge[he.from] == INVALID {
                vertex_edge[he.from] = he_idx;
            }
        }

        let face_edge: Vec<usize> = (0..mesh.face_count())
            .map(|f| {
                let range = index.face_range(f);
                if range.is_empty() {
                    INVALID
                } else {
                    range.start
                }
            })
            .collect();
        let active_face_count = face_edge.iter().filter(|&&e| e != INVALID).count();

        let mut cm = CollapseMesh {
            half_edges,
            vertex_edge,
            face_edge,
            active_face_count,
            positions: mesh.vertices.clone(),
            quadrics: vec![Quadric::default(); nv],
            vertex_removed: vec![false; nv],
        };
        cm.initialize_quadrics();
        cm
    }

    #[inline]
    fn source(&self, he: usize) -> usize {
        self.half_edges[self.half_edges[he].prev].target
    }

    fn face_vertices(&self, face: usize) -> Option<[usize; 3]> {
        let he0 = *self.face_edge.get(face)?;
        if he0 == INVALID {
            return None;
        }
        let he1 = self.half_edges[he0].next;
        Some([
            self.source(he0),
            self.half_edges[he0].target,
            self.half_edges[he1].target,
        ])
    }

    fn initialize_quadrics(&mut self) {
        for fi in 0..self.face_edge.len() {
            let Some([v0, v1, v2]) = self.face_vertices(fi) else {
                continue;
            };
            let q = Quadric::from_triangle(
                &self.positions[v0],
                &self.positions[v1],
                &self.positions[v2],
            );
            self.quadrics[v0] += q;
            self.quadrics[v1] += q;
            self.quadrics[v2] += q;
        }
    }

    /// Get all outgoing half-edges from a vertex (handles boundary vertices).
    ///
    /// Walks are capped at the arena size so malformed (non-manifold) fans
    /// cannot loop forever.
    fn outgoing_half_edges(&self, v: usize) -> Vec<usize> {
        let start = self.vertex_edge[v];
        if start == INVALID {
            return vec![];
        }

        let limit = self.half_edges.len();
        let mut result = Vec::new();
        let mut current = start;

        // Rotate counterclockwise: current.prev.twin
        loop {
            result.push(current);
            let prev = self.half_edges[current].prev;
            let twin = self.half_edges[prev].twin;
            if twin == INVALID || result.len() > limit {
                break;
            }
            current = twin;
            if current == start {
                return result;
            }
        }

        // Boundary: also rotate clockwise from start via twin.next
        let twin_of_start = self.half_edges[start].twin;
        if twin_of_start != INVALID {
            let mut current = self.half_edges[twin_of_start].next;
            loop {
                if current == start || result.len() > limit {
                    break;
                }
                result.push(current);
                let twin = self.half_edges[current].twin;
                if twin == INVALID {
                    break;
                }
                current = self.half_edges[twin].next;
            }
        }

        result
    }

    fn neighbors(&self, v: usize) -> HashSet<usize> {
        self.outgoing_half_edges(v)
            .iter()
            .map(|&he| self.half_edges[he].target)
            .collect()
    }

    fn is_boundary_vertex(&self, v: usize) -> bool {
        self.outgoing_half_edges(v).iter().any(|&he| {
            self.half_edges[he].twin == INVALID
                || self.half_edges[self.half_edges[he].prev].twin == INVALID
        })
    }

    fn find_half_edge(&self, from: usize, to: usize) -> Option<usize> {
        self.outgoing_half_edges(from)
            .into_iter()
            .find(|&he| self.half_edges[he].target == to)
    }

    /// Check the link condition: common neighbors must equal exactly the
    /// face apices opposite the edge (2 for interior, 1 for boundary).
    fn check_link_condition(&self, h: usize, v1: usize, v2: usize) -> bool {
        let n1 = self.neighbors(v1);
        let n2 = self.neighbors(v2);
        let common_count = n1.intersection(&n2).count();
        if self.half_edges[h].twin == INVALID {
            return common_count == 1;
        }
        // Two valence-3 endpoints would fold into a doubled triangle
        common_count == 2 && (n1.len() > 3 || n2.len() > 3)
    }

    /// Faces that survive collapsing `(v1, v2)` must not turn over when the
    /// merged vertex moves to `new_pos`.
    fn collapse_flips_faces(&self, v1: usize, v2: usize, new_pos: &Point3d) -> bool {
        for v in [v1, v2] {
            for he in self.outgoing_half_edges(v) {
                let face = self.half_edges[he].face;
                let Some(tri) = self.face_vertices(face) else {
                    continue;
                };
                if tri.contains(&v1) && tri.contains(&v2) {
                    continue;
                }
                let before = tri.map(|i| self.positions[i]);
                let after = tri.map(|i| if i == v1 || i == v2 { *new_pos } else { self.positions[i] });

                let n_before = (before[1] - before[0]).cross(&(before[2] - before[0]));
                let n_after = (after[1] - after[0]).cross(&(after[2] - after[0]));
                let scale = n_before.norm() * n_after.norm();
                if scale <= f64::EPSILON || n_before.dot(&n_after) / scale <= FLIP_COSINE {
                    return true;
                }
            }
        }
        false
    }

    /// Find any valid outgoing half-edge from a vertex (linear scan fallback).
    fn find_valid_outgoing(&self, v: usize) -> usize {
        (0..self.half_edges.len())
            .find(|&i| self.half_edges[i].face != INVALID && self.source(i) == v)
            .unwrap_or(INVALID)
    }

    /// Collapse half-edge `h = (v1 -> v2)`, merging v2 into v1 at `new_pos`.
    fn collapse_edge(&mut self, h: usize, v1: usize, v2: usize, new_pos: Point3d) {
        let h_twin = self.half_edges[h].twin;
        let h_next = self.half_edges[h].next;
        let h_prev = self.half_edges[h].prev;
        let face_a = self.half_edges[h].face;
        let h_next_twin = self.half_edges[h_next].twin;
        let h_prev_twin = self.half_edges[h_prev].twin;
        let c = self.half_edges[h_next].target;

        let (face_b, ht_next, ht_prev, ht_next_twin, ht_prev_twin, d) = if h_twin != INVALID {
            let hn = self.half_edges[h_twin].next;
            let hp = self.half_edges[h_twin].prev;
            (
                self.half_edges[h_twin].face,
                hn,
                hp,
                self.half_edges[hn].twin,
                self.half_edges[hp].twin,
                self.half_edges[hn].target,
            )
        } else {
            (INVALID, INVALID, INVALID, INVALID, INVALID, INVALID)
        };

        // The link condition rules out both faces sharing their apex
        debug_assert!(d == INVALID || c != d, "collapse of ({v1}, {v2}) with one apex");

        // Collect v2 outgoing edges BEFORE any modifications
        let v2_outgoing = self.outgoing_half_edges(v2);

        // Re-pair twins for face A border edges
        if h_next_twin != INVALID {
            self.half_edges[h_next_twin].twin = h_prev_twin;
        }
        if h_prev_twin != INVALID {
            self.half_edges[h_prev_twin].twin = h_next_twin;
        }

        self.half_edges[h].face = INVALID;
        self.half_edges[h_next].face = INVALID;
        self.half_edges[h_prev].face = INVALID;
        self.face_edge[face_a] = INVALID;
        self.active_face_count -= 1;

        if face_b != INVALID {
            if ht_next_twin != INVALID {
                self.half_edges[ht_next_twin].twin = ht_prev_twin;
            }
            if ht_prev_twin != INVALID {
                self.half_edges[ht_prev_twin].twin = ht_next_twin;
            }
            self.half_edges[h_twin].face = INVALID;
            self.half_edges[ht_next].face = INVALID;
            self.half_edges[ht_prev].face = INVALID;
            self.face_edge[face_b] = INVALID;
            self.active_face_count -= 1;
        }

        // Redirect all v2 references to v1
        for &he in &v2_outgoing {
            let prev = self.half_edges[he].prev;
            self.half_edges[prev].target = v1;

            let twin = self.half_edges[he].twin;
            if twin != INVALID && self.half_edges[twin].face != INVALID {
                self.half_edges[twin].target = v1;
            }
        }

        // Fix vertex_edge pointers for v1, c and d
        if self.half_edges[self.vertex_edge[v1]].face == INVALID {
            self.vertex_edge[v1] =
                if h_prev_twin != INVALID && self.half_edges[h_prev_twin].face != INVALID {
                    h_prev_twin
                } else {
                    self.find_valid_outgoing(v1)
                };
        }
        for (apex, preferred) in [(c, h_next_twin), (d, ht_next_twin)] {
            if apex == INVALID
                || self.vertex_edge[apex] == INVALID
                || self.half_edges[self.vertex_edge[apex]].face != INVALID
            {
                continue;
            }
            self.vertex_edge[apex] =
                if preferred != INVALID && self.half_edges[preferred].face != INVALID {
                    preferred
                } else {
                    self.find_valid_outgoing(apex)
                };
        }

        self.vertex_edge[v2] = INVALID;
        self.vertex_removed[v2] = true;

        let v2_quadric = self.quadrics[v2];
        self.positions[v1] = new_pos;
        self.quadrics[v1] += v2_quadric;
    }

    /// Renumber surviving vertices in order. Only vertices merged away by a
    /// collapse are dropped; vertices no face uses are carried through.
    fn to_polygon_mesh(&self) -> Result<PolygonMesh> {
        let mut old_to_new = vec![INVALID; self.positions.len()];
        let mut new_positions = Vec::new();

        for (i, &removed) in self.vertex_removed.iter().enumerate() {
            if !removed {
                old_to_new[i] = new_positions.len();
                new_positions.push(self.positions[i]);
            }
        }

        let mut new_faces = Vec::with_capacity(self.active_face_count);
        for fi in 0..self.face_edge.len() {
            let Some(tri) = self.face_vertices(fi) else {
                continue;
            };
            let [a, b, c] = tri.map(|v| old_to_new[v]);
            if a != INVALID && b != INVALID && c != INVALID && a != b && b != c && c != a {
                new_faces.push([a, b, c]);
            }
        }

        let mut mesh = PolygonMesh::from_triangles(new_positions, &new_faces)?;
        mesh.update_normals();
        Ok(mesh)
    }
}

// ============================================================
// Edge Cost for Priority Queue
// ============================================================

#[derive(Debug, Clone)]
struct EdgeCost {
    v1: usize,
    v2: usize,
    cost: f64,
}

impl PartialEq for EdgeCost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for EdgeCost {}

impl PartialOrd for EdgeCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeCost {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smallest cost first, ties broken on vertex ids so the
        // collapse order never depends on queue internals
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| (other.v1, other.v2).cmp(&(self.v1, self.v2)))
    }
}

// ============================================================
// Edge Collapse Simplifier
// ============================================================

/// Edge collapse mesh simplifier using a half-edge structure and QEM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCollapseSimplifier {
    /// Stop when the minimum collapse cost exceeds this threshold
    pub error_threshold: Option<f64>,
    /// Never collapse edges touching the mesh boundary
    pub preserve_boundary: bool,
    /// Extra cost for boundary edges when they may collapse
    pub boundary_weight: f64,
    /// Never reduce below this many triangles
    pub min_faces: usize,
}

impl Default for EdgeCollapseSimplifier {
    fn default() -> Self {
        Self {
            error_threshold: None,
            preserve_boundary: true,
            boundary_weight: 100.0,
            min_faces: 4,
        }
    }
}

impl EdgeCollapseSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(
        error_threshold: Option<f64>,
        preserve_boundary: bool,
        boundary_weight: f64,
    ) -> Self {
        Self {
            error_threshold,
            preserve_boundary,
            boundary_weight,
            ..Self::default()
        }
    }

    /// Collapse candidate for the edge `(v1, v2)`, or `None` when the edge
    /// is excluded by the boundary policy.
    fn edge_cost(&self, cm: &CollapseMesh, v1: usize, v2: usize) -> Option<EdgeCost> {
        let on_boundary = cm.is_boundary_vertex(v1) || cm.is_boundary_vertex(v2);
        if self.preserve_boundary && on_boundary {
            return None;
        }
        let q = cm.quadrics[v1] + cm.quadrics[v2];
        let (_, mut cost) = q.optimal_point(&cm.positions[v1], &cm.positions[v2]);
        if on_boundary {
            cost += self.boundary_weight;
        }
        Some(EdgeCost { v1, v2, cost })
    }

    /// Push (or re-prioritize) every live edge around `v`.
    fn enqueue_vertex_edges(
        &self,
        cm: &CollapseMesh,
        v: usize,
        queue: &mut PriorityQueue<(usize, usize), EdgeCost>,
    ) {
        for he in cm.outgoing_half_edges(v) {
            if cm.half_edges[he].face == INVALID {
                continue;
            }
            let target = cm.half_edges[he].target;
            let key = (v.min(target), v.max(target));
            match self.edge_cost(cm, key.0, key.1) {
                Some(cost) => {
                    queue.push(key, cost);
                }
                None => {
                    queue.remove(&key);
                }
            }
        }
    }

    /// Build the initial priority queue of edge collapse candidates.
    fn build_queue(&self, cm: &CollapseMesh) -> PriorityQueue<(usize, usize), EdgeCost> {
        let mut queue = PriorityQueue::new();
        for v in 0..cm.positions.len() {
            if !cm.vertex_removed[v] {
                self.enqueue_vertex_edges(cm, v, &mut queue);
            }
        }
        queue
    }
}

impl MeshSimplifier for EdgeCollapseSimplifier {
    fn simplify(&self, mesh: &PolygonMesh, ratio: f64) -> Result<PolygonMesh> {
        validate_ratio(ratio)?;
        if mesh.vertices.is_empty() {
            return Err(Error::EmptyMesh);
        }

        let mut triangles = mesh.triangulated();
        let target_faces = target_face_count(triangles.face_count(), ratio, self.min_faces);
        if triangles.face_count() <= target_faces {
            triangles.update_normals();
            return Ok(triangles);
        }
        let mut cm = CollapseMesh::from_triangles(&triangles);

        let mut queue = self.build_queue(&cm);
        let mut collapse_count = 0usize;

        while cm.active_face_count > target_faces {
            let Some(((a, b), edge_cost)) = queue.pop() else {
                break;
            };

            if let Some(threshold) = self.error_threshold {
                if edge_cost.cost > threshold {
                    break;
                }
            }

            if cm.vertex_removed[a] || cm.vertex_removed[b] {
                continue;
            }
            // Keep the endpoint that owns a half-edge towards the other one
            let (v1, v2, h) = match (cm.find_half_edge(a, b), cm.find_half_edge(b, a)) {
                (Some(h), _) => (a, b, h),
                (None, Some(h)) => (b, a, h),
                (None, None) => continue,
            };

            let removed_faces = if cm.half_edges[h].twin == INVALID { 1 } else { 2 };
            if cm.active_face_count < removed_faces + self.min_faces {
                continue;
            }
            if !cm.check_link_condition(h, v1, v2) {
                continue;
            }

            let q = cm.quadrics[v1] + cm.quadrics[v2];
            let (pos, _) = q.optimal_point(&cm.positions[v1], &cm.positions[v2]);
            if cm.collapse_flips_faces(v1, v2, &pos) {
                continue;
            }

            cm.collapse_edge(h, v1, v2, pos);
            collapse_count += 1;

            let ring: Vec<usize> = cm.neighbors(v1).into_iter().collect();
            self.enqueue_vertex_edges(&cm, v1, &mut queue);
            for n in ring {
                self.enqueue_vertex_edges(&cm, n, &mut queue);
            }
        }

        tracing::debug!(
            collapses = collapse_count,
            faces = cm.active_face_count,
            target = target_faces,
            "edge collapse finished"
        );
        cm.to_polygon_mesh()
    }
}
