//! # meshview algorithms
//!
//! Derived data computed from a [`PolygonMesh`](meshview_core::PolygonMesh):
//! per-vertex adjacency, GPU-ready index buffers, discrete curvature and
//! Loop subdivision.

pub mod adjacency;
pub mod indices;
pub mod curvature;
pub mod subdivision;

// Re-export commonly used items
pub use adjacency::*;
pub use indices::*;
pub use curvature::*;
pub use subdivision::*;
