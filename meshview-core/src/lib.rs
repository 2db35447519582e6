//! Core data structures for meshview
//!
//! This crate provides the polygon mesh topology store, the derived half-edge
//! index, face/vertex normal computation and the shared error types used by
//! every other meshview crate.

pub mod point;
pub mod mesh;
pub mod halfedge;
pub mod normals;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use halfedge::*;
pub use normals::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4};
