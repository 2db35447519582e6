//! Mesh simplification
//!
//! Reduces a mesh to a fraction of its triangles with quadric-error edge
//! collapse. Simplification is a pure function of its input: callers keep
//! the original mesh and simplify it again for every new ratio instead of
//! simplifying an already reduced result.

pub mod quadric;
pub mod edge_collapse;

pub use quadric::*;
pub use edge_collapse::*;

use meshview_core::{Error, PolygonMesh, Result};

/// Simplify a mesh to a target density
pub trait MeshSimplifier {
    /// Simplify `mesh` keeping roughly `ratio` of its triangles.
    ///
    /// `ratio == 1.0` keeps everything, `ratio == 0.0` reduces as far as the
    /// simplifier allows. Values outside [0, 1] fail with `InvalidParameter`.
    fn simplify(&self, mesh: &PolygonMesh, ratio: f64) -> Result<PolygonMesh>;
}

/// Reject ratios outside [0, 1] (NaN included)
pub fn validate_ratio(ratio: f64) -> Result<()> {
    if (0.0..=1.0).contains(&ratio) {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "simplification ratio must be within [0, 1], got {ratio}"
        )))
    }
}

/// Number of triangles to keep for `ratio`, never below `min_faces`.
///
/// Meshes already at or under `min_faces` keep all their triangles.
pub fn target_face_count(triangle_count: usize, ratio: f64, min_faces: usize) -> usize {
    let target = (ratio * triangle_count as f64).round() as usize;
    target.max(min_faces).min(triangle_count)
}
