//! Face and vertex normal computation
//!
//! Face normals come from the plane of a face's first three vertices. Vertex
//! normals are the normalized sum of the unit normals of incident faces.
//! Degenerate input yields zero vectors rather than NaNs; consumers treat a
//! zero normal as "no lighting normal".

use crate::mesh::check_face;
use crate::point::{Point3d, Vector3d};

/// Magnitude below which a normal is treated as undefined
pub const NORMAL_EPSILON: f64 = 1e-12;

/// Normalize `v`, or return zero if it is too short to carry a direction
#[inline]
pub fn normalize_or_zero(v: Vector3d) -> Vector3d {
    let len = v.norm();
    if len > NORMAL_EPSILON && len.is_finite() {
        v / len
    } else {
        Vector3d::zeros()
    }
}

/// Unit normal of a polygon from its first three vertices.
///
/// Zero for zero-area faces, faces with fewer than three vertices, or faces
/// referencing missing vertices.
pub fn face_normal(vertices: &[Point3d], face: &[usize]) -> Vector3d {
    let (Some(a), Some(b), Some(c)) = (
        face.first().and_then(|&i| vertices.get(i)),
        face.get(1).and_then(|&i| vertices.get(i)),
        face.get(2).and_then(|&i| vertices.get(i)),
    ) else {
        return Vector3d::zeros();
    };

    normalize_or_zero((b - a).cross(&(c - a)))
}

/// Unit normal for every face, in face order
pub fn compute_face_normals(vertices: &[Point3d], faces: &[Vec<usize>]) -> Vec<Vector3d> {
    faces.iter().map(|face| face_normal(vertices, face)).collect()
}

/// Per-vertex normals accumulated from face normals.
///
/// `face_normals` must be index-aligned with `faces`. Invalid faces
/// contribute nothing.
pub fn compute_vertex_normals(
    vertex_count: usize,
    faces: &[Vec<usize>],
    face_normals: &[Vector3d],
) -> Vec<Vector3d> {
    let mut sums = vec![Vector3d::zeros(); vertex_count];

    for (fi, (face, normal)) in faces.iter().zip(face_normals).enumerate() {
        if check_face(fi, face, vertex_count).is_some() {
            continue;
        }
        for &v in face {
            sums[v] += normal;
        }
    }

    sums.into_iter().map(normalize_or_zero).collect()
}
