//! Point and vector types

use nalgebra::{Point3, Vector3};

/// Mesh positions are stored in double precision
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// Narrow a double precision point to the single precision buffer layout
#[inline]
pub fn to_f32_triple(p: &Point3d) -> [f32; 3] {
    [p.x as f32, p.y as f32, p.z as f32]
}
