//! Flat, GPU-ready arrays handed to the rendering sink

use meshview_algorithms::{
    compute_curvature, edge_indices_from_half_edges, prepare_face_indices, CurvatureMethod,
};
use meshview_core::{to_f32_triple, MeshWarning, PolygonMesh, Result};

/// Everything a renderer needs to draw one mesh.
///
/// Per-vertex arrays are index-aligned by vertex id: vertex `i` owns
/// `positions[3i..3i + 3]`, `normals[3i..3i + 3]` and `curvature[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderBuffers {
    pub positions: Vec<f32>,
    /// Three vertex ids per triangle
    pub triangles: Vec<u32>,
    /// Two vertex ids per undirected edge, each edge once
    pub edges: Vec<u32>,
    pub normals: Vec<f32>,
    pub curvature: Vec<f32>,
}

impl RenderBuffers {
    /// Build buffers for `mesh`, computing normals if it has none.
    ///
    /// Faces skipped during triangulation are returned as warnings.
    pub fn build(mesh: &PolygonMesh, method: CurvatureMethod) -> Result<(Self, Vec<MeshWarning>)> {
        let computed;
        let mesh = if mesh.has_normals() {
            mesh
        } else {
            let mut with_normals = mesh.clone();
            with_normals.update_normals();
            computed = with_normals;
            &computed
        };

        let faces = prepare_face_indices(mesh);
        let edges = edge_indices_from_half_edges(&mesh.half_edges());
        let curvature = compute_curvature(mesh, method)?;

        let buffers = Self {
            positions: mesh.vertices.iter().flat_map(to_f32_triple).collect(),
            triangles: faces.indices,
            edges,
            normals: mesh
                .vertex_normals()
                .iter()
                .flat_map(|n| [n.x as f32, n.y as f32, n.z as f32])
                .collect(),
            curvature: curvature.iter().map(|&k| k as f32).collect(),
        };
        Ok((buffers, faces.warnings))
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn triangle_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    pub fn edge_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.edges)
    }

    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn curvature_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.curvature)
    }

    /// Smallest and largest curvature, for color ramps
    pub fn curvature_range(&self) -> Option<(f32, f32)> {
        self.curvature.iter().copied().fold(None, |range, k| match range {
            None => Some((k, k)),
            Some((lo, hi)) => Some((lo.min(k), hi.max(k))),
        })
    }
}
