//! Per-vertex adjacency built from a flat triangle index list

use crate::indices::prepare_face_indices;
use meshview_core::{Error, PolygonMesh, Result};

/// Neighbors and incident triangles of one vertex
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyEntry {
    /// Sorted, deduplicated one-ring vertex ids
    pub neighbors: Vec<usize>,
    /// Ordinals of the triangles that use this vertex
    pub faces: Vec<usize>,
}

/// One [`AdjacencyEntry`] per vertex
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyTable {
    entries: Vec<AdjacencyEntry>,
}

impl AdjacencyTable {
    /// Build adjacency from `triangle_indices` (three ids per triangle).
    ///
    /// Fails with `InvalidParameter` when the list length is not a multiple
    /// of three and with `IndexOutOfRange` when an id is not below
    /// `vertex_count`. Edges shared by more than two triangles are accepted:
    /// every incident triangle is recorded and neighbors stay a set.
    pub fn build(vertex_count: usize, triangle_indices: &[u32]) -> Result<Self> {
        if triangle_indices.len() % 3 != 0 {
            return Err(Error::InvalidParameter(format!(
                "triangle index count {} is not a multiple of 3",
                triangle_indices.len()
            )));
        }
        if let Some(&bad) = triangle_indices
            .iter()
            .find(|&&i| i as usize >= vertex_count)
        {
            return Err(Error::IndexOutOfRange {
                index: bad as usize,
                vertex_count,
            });
        }

        let mut entries = vec![AdjacencyEntry::default(); vertex_count];
        for (ti, tri) in triangle_indices.chunks_exact(3).enumerate() {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            entries[a].neighbors.extend([b, c]);
            entries[b].neighbors.extend([a, c]);
            entries[c].neighbors.extend([a, b]);
            for v in [a, b, c] {
                entries[v].faces.push(ti);
            }
        }

        for entry in &mut entries {
            entry.neighbors.sort_unstable();
            entry.neighbors.dedup();
            // A triangle repeating a vertex lists it twice, and as its own neighbor
            entry.faces.dedup();
        }
        for (v, entry) in entries.iter_mut().enumerate() {
            entry.neighbors.retain(|&n| n != v);
        }

        Ok(Self { entries })
    }

    /// Adjacency of the mesh's fan triangulation
    pub fn from_mesh(mesh: &PolygonMesh) -> Result<Self> {
        let indices = prepare_face_indices(mesh);
        Self::build(mesh.vertex_count(), &indices.indices)
    }

    /// Number of vertices covered
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, vertex: usize) -> Option<&AdjacencyEntry> {
        self.entries.get(vertex)
    }

    pub fn entries(&self) -> &[AdjacencyEntry] {
        &self.entries
    }

    /// One-ring of `vertex` (empty for unknown vertices)
    pub fn neighbors(&self, vertex: usize) -> &[usize] {
        self.entries
            .get(vertex)
            .map(|e| e.neighbors.as_slice())
            .unwrap_or(&[])
    }

    /// Triangles incident to `vertex` (empty for unknown vertices)
    pub fn faces(&self, vertex: usize) -> &[usize] {
        self.entries
            .get(vertex)
            .map(|e| e.faces.as_slice())
            .unwrap_or(&[])
    }

    /// Number of distinct neighbors
    pub fn valence(&self, vertex: usize) -> usize {
        self.neighbors(vertex).len()
    }

    /// True when `u` lists `v` exactly when `v` lists `u`
    pub fn is_symmetric(&self) -> bool {
        self.entries.iter().enumerate().all(|(v, entry)| {
            entry
                .neighbors
                .iter()
                .all(|&u| self.neighbors(u).binary_search(&v).is_ok())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_core::Point3d;

    fn make_plane_grid(size: usize) -> PolygonMesh {
        let mut vertices = Vec::new();
        for y in 0..size {
            for x in 0..size {
                vertices.push(Point3d::new(x as f64, y as f64, 0.0));
            }
        }
        let mut faces = Vec::new();
        for y in 0..(size - 1) {
            for x in 0..(size - 1) {
                let tl = y * size + x;
                let tr = tl + 1;
                let bl = (y + 1) * size + x;
                let br = bl + 1;
                faces.push([tl, bl, tr]);
                faces.push([tr, bl, br]);
            }
        }
        PolygonMesh::from_triangles(vertices, &faces).unwrap()
    }

    #[test]
    fn test_single_triangle() {
        let table = AdjacencyTable::build(3, &[0, 1, 2]).unwrap();
        assert_eq!(table.neighbors(0), &[1, 2]);
        assert_eq!(table.neighbors(1), &[0, 2]);
        assert_eq!(table.neighbors(2), &[0, 1]);
        assert_eq!(table.faces(1), &[0]);
    }

    #[test]
    fn test_neighbors_deduplicated() {
        // Two triangles sharing edge 1-2
        let table = AdjacencyTable::build(4, &[0, 1, 2, 2, 1, 3]).unwrap();
        assert_eq!(table.neighbors(1), &[0, 2, 3]);
        assert_eq!(table.neighbors(2), &[0, 1, 3]);
        assert_eq!(table.faces(1), &[0, 1]);
        assert_eq!(table.valence(0), 2);
    }

    #[test]
    fn test_isolated_vertex_has_empty_entry() {
        let table = AdjacencyTable::build(5, &[0, 1, 2]).unwrap();
        assert_eq!(table.len(), 5);
        assert!(table.neighbors(4).is_empty());
        assert!(table.faces(4).is_empty());
        assert!(table.neighbors(100).is_empty());
    }

    #[test]
    fn test_index_out_of_range() {
        let result = AdjacencyTable::build(3, &[0, 1, 3]);
        assert!(matches!(
            result,
            Err(Error::IndexOutOfRange { index: 3, vertex_count: 3 })
        ));
    }

    #[test]
    fn test_length_not_multiple_of_three() {
        assert!(matches!(
            AdjacencyTable::build(3, &[0, 1]),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_grid_symmetry() {
        let mesh = make_plane_grid(6);
        let table = AdjacencyTable::from_mesh(&mesh).unwrap();
        assert!(table.is_symmetric());

        for (v, entry) in table.entries().iter().enumerate() {
            for &u in &entry.neighbors {
                assert!(table.neighbors(u).contains(&v));
            }
        }
        // Interior vertex of a regular triangulated grid has six neighbors
        assert_eq!(table.valence(7), 6);
        assert_eq!(table.faces(7).len(), 6);
    }

    #[test]
    fn test_non_manifold_records_all_faces() {
        let table = AdjacencyTable::build(5, &[0, 1, 2, 1, 0, 3, 1, 0, 4]).unwrap();
        assert_eq!(table.faces(0), &[0, 1, 2]);
        assert_eq!(table.neighbors(0), &[1, 2, 3, 4]);
        assert!(table.is_symmetric());
    }

    #[test]
    fn test_quad_mesh_uses_fan_triangulation() {
        let vertices = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 1.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
        ];
        let (mesh, _) = PolygonMesh::from_polygons(vertices, vec![vec![0, 1, 2, 3]]);
        let table = AdjacencyTable::from_mesh(&mesh).unwrap();
        // The fan diagonal 0-2 is part of the one-ring
        assert_eq!(table.neighbors(0), &[1, 2, 3]);
        assert_eq!(table.neighbors(1), &[0, 2]);
        assert_eq!(table.faces(0), &[0, 1]);
    }
}
