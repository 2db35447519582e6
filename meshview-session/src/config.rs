//! Session configuration

use meshview_algorithms::{CurvatureMethod, SubdivisionOptions};
use meshview_simplification::EdgeCollapseSimplifier;
use serde::{Deserialize, Serialize};

/// Settings applied to every mesh the session loads
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Curvature estimator for the render buffers
    pub curvature: CurvatureMethod,
    /// Edge collapse parameters used by `apply_operation`
    pub simplification: EdgeCollapseSimplifier,
    /// Keep boundary vertices fixed when subdividing
    pub fixed_subdivision_boundary: bool,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_curvature(mut self, curvature: CurvatureMethod) -> Self {
        self.curvature = curvature;
        self
    }

    pub fn with_simplification(mut self, simplification: EdgeCollapseSimplifier) -> Self {
        self.simplification = simplification;
        self
    }

    pub(crate) fn subdivision(&self, iterations: usize) -> SubdivisionOptions {
        SubdivisionOptions {
            iterations,
            smooth_boundary: !self.fixed_subdivision_boundary,
        }
    }
}
