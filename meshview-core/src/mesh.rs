//! Polygon mesh topology store

use crate::error::{Error, MeshWarning, Result};
use crate::halfedge::HalfEdgeIndex;
use crate::normals::{compute_face_normals, compute_vertex_normals};
use crate::point::*;
use crate::traits::Bounded;
use crate::transform::Transform3D;
use serde::{Deserialize, Serialize};

/// A polygon mesh: dense vertex positions plus faces as ordered vertex id lists.
///
/// Faces are expected to hold at least three in-range vertex ids. The
/// constructors enforce that; code that pushes into `faces` directly must
/// tolerate downstream consumers skipping bad faces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonMesh {
    pub vertices: Vec<Point3d>,
    pub faces: Vec<Vec<usize>>,
    face_normals: Vec<Vector3d>,
    vertex_normals: Vec<Vector3d>,
}

/// Summary counts for a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshStats {
    pub vertices: usize,
    pub faces: usize,
    pub edges: usize,
    pub boundary_edges: usize,
}

impl MeshStats {
    /// V - E + F
    pub fn euler_characteristic(&self) -> i64 {
        self.vertices as i64 - self.edges as i64 + self.faces as i64
    }

    /// True when no edge lies on a boundary
    pub fn is_closed(&self) -> bool {
        self.boundary_edges == 0
    }
}

impl std::fmt::Display for MeshStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} vertices, {} faces, {} edges ({} boundary), euler {}",
            self.vertices,
            self.faces,
            self.edges,
            self.boundary_edges,
            self.euler_characteristic()
        )
    }
}

/// Check a single face against the vertex count.
///
/// Returns the warning that describes why the face must be skipped, if any.
pub fn check_face(face_index: usize, face: &[usize], vertex_count: usize) -> Option<MeshWarning> {
    if face.len() < 3 {
        return Some(MeshWarning::DegenerateFace {
            face: face_index,
            valence: face.len(),
        });
    }
    face.iter()
        .find(|&&v| v >= vertex_count)
        .map(|&index| MeshWarning::IndexOutOfRange {
            face: face_index,
            index,
            vertex_count,
        })
}

/// Fan-triangulate a polygon around its first vertex.
///
/// Yields `(pivot, prev, current)` for every `current` from the third vertex
/// on, so a triangle passes through unchanged and winding is preserved.
/// Faces with fewer than three vertices yield nothing.
pub fn fan_triangles(face: &[usize]) -> impl Iterator<Item = [usize; 3]> + '_ {
    let pivot = face.first().copied().unwrap_or(0);
    face.windows(2)
        .skip(1)
        .map(move |pair| [pivot, pair[0], pair[1]])
}

impl PolygonMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from polygons, skipping faces that are degenerate or
    /// reference missing vertices.
    ///
    /// Every skipped face produces one warning; the remaining faces keep
    /// their relative order.
    pub fn from_polygons(vertices: Vec<Point3d>, faces: Vec<Vec<usize>>) -> (Self, Vec<MeshWarning>) {
        let vertex_count = vertices.len();
        let mut warnings = Vec::new();
        let mut kept = Vec::with_capacity(faces.len());

        for (fi, face) in faces.into_iter().enumerate() {
            match check_face(fi, &face, vertex_count) {
                Some(warning) => {
                    tracing::warn!("{warning}");
                    warnings.push(warning);
                }
                None => kept.push(face),
            }
        }

        let mesh = Self {
            vertices,
            faces: kept,
            face_normals: Vec::new(),
            vertex_normals: Vec::new(),
        };
        (mesh, warnings)
    }

    /// Build a triangle mesh, failing on the first out-of-range index
    pub fn from_triangles(vertices: Vec<Point3d>, triangles: &[[usize; 3]]) -> Result<Self> {
        let mut mesh = Self {
            vertices,
            ..Self::default()
        };
        for tri in triangles {
            mesh.add_face(tri.to_vec())?;
        }
        Ok(mesh)
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// True when every face is a triangle
    pub fn is_triangle_mesh(&self) -> bool {
        self.faces.iter().all(|f| f.len() == 3)
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3d) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh, returning its ordinal.
    ///
    /// Faces with fewer than three vertices fail with `InvalidParameter`,
    /// faces referencing missing vertices with `IndexOutOfRange`.
    pub fn add_face(&mut self, face: Vec<usize>) -> Result<usize> {
        match check_face(self.faces.len(), &face, self.vertices.len()) {
            Some(MeshWarning::DegenerateFace { valence, .. }) => Err(Error::InvalidParameter(
                format!("face needs at least 3 vertices, got {valence}"),
            )),
            Some(MeshWarning::IndexOutOfRange {
                index,
                vertex_count,
                ..
            }) => Err(Error::IndexOutOfRange {
                index,
                vertex_count,
            }),
            Some(MeshWarning::InvalidIndex { index, .. }) => Err(Error::InvalidParameter(
                format!("invalid vertex index {index}"),
            )),
            None => {
                self.faces.push(face);
                self.invalidate_normals();
                Ok(self.faces.len() - 1)
            }
        }
    }

    /// Position of a vertex
    pub fn position(&self, vertex: usize) -> Option<&Point3d> {
        self.vertices.get(vertex)
    }

    /// Move a single vertex. Stored normals are dropped until the next
    /// `update_normals`.
    pub fn set_position(&mut self, vertex: usize, position: Point3d) -> Result<()> {
        let vertex_count = self.vertices.len();
        let slot = self.vertices.get_mut(vertex).ok_or(Error::IndexOutOfRange {
            index: vertex,
            vertex_count,
        })?;
        *slot = position;
        self.invalidate_normals();
        Ok(())
    }

    /// Translate by `-center` and scale uniformly by `2 / target_size`.
    ///
    /// A mesh whose extent equals `target_size` ends up spanning [-1, 1]
    /// along that axis. Uniform positive scaling keeps unit normals valid,
    /// so stored normals are left in place.
    pub fn center_and_scale(&mut self, center: Point3d, target_size: f64) -> Result<()> {
        if !target_size.is_finite() || target_size <= 0.0 {
            return Err(Error::DegenerateGeometry(format!(
                "target size must be positive, got {target_size}"
            )));
        }
        let transform = Transform3D::normalization(&center, target_size);
        for vertex in &mut self.vertices {
            *vertex = transform.transform_point(vertex);
        }
        Ok(())
    }

    /// Center the mesh on the origin and fit its longest axis into [-1, 1]
    pub fn normalize(&mut self) -> Result<()> {
        let (min, max) = self.bounding_box()?;
        let extent = max - min;
        let size = extent.x.max(extent.y).max(extent.z);
        self.center_and_scale(self.center()?, size)
    }

    /// Recompute per-face and per-vertex normals from the current positions
    pub fn update_normals(&mut self) {
        self.face_normals = compute_face_normals(&self.vertices, &self.faces);
        self.vertex_normals =
            compute_vertex_normals(self.vertices.len(), &self.faces, &self.face_normals);
    }

    /// True when normals are present and sized to the current mesh
    pub fn has_normals(&self) -> bool {
        self.vertex_normals.len() == self.vertices.len()
            && self.face_normals.len() == self.faces.len()
    }

    /// Per-face unit normals (empty until `update_normals` runs)
    pub fn face_normals(&self) -> &[Vector3d] {
        &self.face_normals
    }

    /// Per-vertex unit normals (empty until `update_normals` runs)
    pub fn vertex_normals(&self) -> &[Vector3d] {
        &self.vertex_normals
    }

    fn invalidate_normals(&mut self) {
        self.face_normals.clear();
        self.vertex_normals.clear();
    }

    /// Fan-triangulated copy of the mesh; invalid faces are dropped
    pub fn triangulated(&self) -> PolygonMesh {
        let vertex_count = self.vertices.len();
        let faces = self
            .faces
            .iter()
            .enumerate()
            .filter(|(fi, face)| check_face(*fi, face, vertex_count).is_none())
            .flat_map(|(_, face)| fan_triangles(face))
            .map(|tri| tri.to_vec())
            .collect();

        PolygonMesh {
            vertices: self.vertices.clone(),
            faces,
            face_normals: Vec::new(),
            vertex_normals: Vec::new(),
        }
    }

    /// Derive the half-edge index for the current faces
    pub fn half_edges(&self) -> HalfEdgeIndex {
        HalfEdgeIndex::build(self)
    }

    /// Vertex, face and edge counts
    pub fn stats(&self) -> MeshStats {
        let index = self.half_edges();
        MeshStats {
            vertices: self.vertices.len(),
            faces: self.faces.len(),
            edges: index.edge_count(),
            boundary_edges: index.boundary_edge_count(),
        }
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.invalidate_normals();
    }
}

impl Bounded for PolygonMesh {
    fn bounding_box(&self) -> Result<(Point3d, Point3d)> {
        let first = self.vertices.first().ok_or(Error::EmptyMesh)?;
        let mut min = *first;
        let mut max = *first;

        for vertex in &self.vertices {
            min = min.inf(vertex);
            max = max.sup(vertex);
        }

        Ok((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_cube() -> PolygonMesh {
        let vertices = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 1.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
            Point3d::new(0.0, 0.0, 1.0),
            Point3d::new(1.0, 0.0, 1.0),
            Point3d::new(1.0, 1.0, 1.0),
            Point3d::new(0.0, 1.0, 1.0),
        ];
        let faces = vec![
            vec![0, 3, 2, 1],
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![1, 2, 6, 5],
            vec![2, 3, 7, 6],
            vec![3, 0, 4, 7],
        ];
        let (mesh, warnings) = PolygonMesh::from_polygons(vertices, faces);
        assert!(warnings.is_empty());
        mesh
    }

    #[test]
    fn test_from_polygons_skips_bad_faces() {
        let vertices = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
        ];
        let faces = vec![vec![0, 1, 2], vec![0, 1], vec![0, 1, 7]];
        let (mesh, warnings) = PolygonMesh::from_polygons(vertices, faces);

        assert_eq!(mesh.face_count(), 1);
        assert_eq!(
            warnings,
            vec![
                MeshWarning::DegenerateFace { face: 1, valence: 2 },
                MeshWarning::IndexOutOfRange {
                    face: 2,
                    index: 7,
                    vertex_count: 3
                },
            ]
        );
    }

    #[test]
    fn test_add_face_rejects_invalid() {
        let mut mesh = PolygonMesh::new();
        mesh.add_vertex(Point3d::origin());
        mesh.add_vertex(Point3d::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Point3d::new(0.0, 1.0, 0.0));

        assert!(matches!(
            mesh.add_face(vec![0, 1]),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            mesh.add_face(vec![0, 1, 3]),
            Err(Error::IndexOutOfRange { index: 3, vertex_count: 3 })
        ));
        assert_eq!(mesh.add_face(vec![0, 1, 2]).unwrap(), 0);
    }

    #[test]
    fn test_fan_triangles() {
        let tris: Vec<_> = fan_triangles(&[4, 5, 6, 7, 8]).collect();
        assert_eq!(tris, vec![[4, 5, 6], [4, 6, 7], [4, 7, 8]]);

        let tri: Vec<_> = fan_triangles(&[1, 2, 3]).collect();
        assert_eq!(tri, vec![[1, 2, 3]]);

        assert_eq!(fan_triangles(&[1, 2]).count(), 0);
        assert_eq!(fan_triangles(&[]).count(), 0);
    }

    #[test]
    fn test_bounding_box() {
        let mesh = unit_cube();
        let (min, max) = mesh.bounding_box().unwrap();
        assert_eq!(min, Point3d::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3d::new(1.0, 1.0, 1.0));
        assert_eq!(mesh.center().unwrap(), Point3d::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_bounding_box_empty() {
        let mesh = PolygonMesh::new();
        assert!(matches!(mesh.bounding_box(), Err(Error::EmptyMesh)));
    }

    #[test]
    fn test_normalize_fits_unit_box() {
        let vertices = vec![
            Point3d::new(2.0, -3.0, 10.0),
            Point3d::new(6.0, -1.0, 11.0),
            Point3d::new(3.0, -2.0, 10.5),
        ];
        let mut mesh = PolygonMesh::from_triangles(vertices, &[[0, 1, 2]]).unwrap();
        mesh.normalize().unwrap();

        let (min, max) = mesh.bounding_box().unwrap();
        let center = nalgebra::center(&min, &max);
        assert_relative_eq!(center.coords.norm(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(min.x, -1.0, epsilon = 1e-6);
        assert_relative_eq!(max.x, 1.0, epsilon = 1e-6);
        // Shorter axes scale by the same factor
        assert_relative_eq!(max.y - min.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(max.z - min.z, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_center_and_scale_rejects_zero_extent() {
        let mut mesh = unit_cube();
        let before = mesh.clone();
        assert!(matches!(
            mesh.center_and_scale(Point3d::origin(), 0.0),
            Err(Error::DegenerateGeometry(_))
        ));
        assert!(mesh
            .center_and_scale(Point3d::origin(), f64::NAN)
            .is_err());
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_normalize_single_point_is_degenerate() {
        let mut mesh = PolygonMesh::new();
        mesh.add_vertex(Point3d::new(1.0, 1.0, 1.0));
        assert!(matches!(mesh.normalize(), Err(Error::DegenerateGeometry(_))));
    }

    #[test]
    fn test_update_normals_unit_length() {
        let mut mesh = unit_cube();
        assert!(!mesh.has_normals());
        mesh.update_normals();
        assert!(mesh.has_normals());
        for n in mesh.vertex_normals() {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-5);
        }
        // Corner 6 sits at (1,1,1): its normal points outward along the diagonal
        let n6 = mesh.vertex_normals()[6];
        assert!(n6.x > 0.0 && n6.y > 0.0 && n6.z > 0.0);
    }

    #[test]
    fn test_set_position_invalidates_normals() {
        let mut mesh = unit_cube();
        mesh.update_normals();
        mesh.set_position(0, Point3d::new(-1.0, 0.0, 0.0)).unwrap();
        assert!(!mesh.has_normals());
        assert!(matches!(
            mesh.set_position(42, Point3d::origin()),
            Err(Error::IndexOutOfRange { index: 42, .. })
        ));
    }

    #[test]
    fn test_triangulated_cube() {
        let mesh = unit_cube();
        let tri = mesh.triangulated();
        assert_eq!(tri.face_count(), 12);
        assert!(tri.is_triangle_mesh());
        assert_eq!(tri.vertex_count(), 8);
    }

    #[test]
    fn test_stats_cube() {
        let stats = unit_cube().stats();
        assert_eq!(stats.vertices, 8);
        assert_eq!(stats.faces, 6);
        assert_eq!(stats.edges, 12);
        assert!(stats.is_closed());
        assert_eq!(stats.euler_characteristic(), 2);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut mesh = unit_cube();
        let snapshot = mesh.clone();
        mesh.normalize().unwrap();
        assert_ne!(mesh.vertices, snapshot.vertices);
        assert_eq!(snapshot.vertices[6], Point3d::new(1.0, 1.0, 1.0));
    }
}
