//! Quadric error metric
//!
//! A quadric `Q` accumulates squared distances to a set of planes:
//! `error(p) = [p 1]ᵀ Q [p 1]`.

use meshview_core::{normalize_or_zero, Point3d};
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use std::ops::{Add, AddAssign};

/// Determinant magnitude below which the optimal point is not solved for
const SINGULAR_EPSILON: f64 = 1e-10;

/// Symmetric 4x4 plane-distance quadric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadric(pub Matrix4<f64>);

impl Default for Quadric {
    fn default() -> Self {
        Self(Matrix4::zeros())
    }
}

impl Quadric {
    /// Quadric of the plane through a triangle; zero for degenerate triangles
    pub fn from_triangle(v0: &Point3d, v1: &Point3d, v2: &Point3d) -> Self {
        let n = normalize_or_zero((v1 - v0).cross(&(v2 - v0)));
        if n == Vector3::zeros() {
            return Self::default();
        }
        let d = -n.dot(&v0.coords);
        Self::from_plane(&Vector4::new(n.x, n.y, n.z, d))
    }

    /// `p pᵀ` for plane `(a, b, c, d)` with unit normal
    pub fn from_plane(p: &Vector4<f64>) -> Self {
        Self(p * p.transpose())
    }

    /// Squared-distance error at `p`
    pub fn error(&self, p: &Point3d) -> f64 {
        let vh = p.to_homogeneous();
        (vh.transpose() * self.0 * vh)[0].max(0.0)
    }

    /// Position minimizing the error for an edge `(a, b)`, and that error.
    ///
    /// Solves the 3x3 system when it is well conditioned; otherwise (and
    /// whenever a candidate does better) falls back to the endpoints or the
    /// midpoint.
    pub fn optimal_point(&self, a: &Point3d, b: &Point3d) -> (Point3d, f64) {
        let mut best = (nalgebra::center(a, b), self.error(&nalgebra::center(a, b)));

        let q3: Matrix3<f64> = self.0.fixed_view::<3, 3>(0, 0).into_owned();
        let q1: Vector3<f64> = self.0.fixed_view::<3, 1>(0, 3).into_owned();
        if q3.determinant().abs() > SINGULAR_EPSILON {
            if let Some(inv) = q3.try_inverse() {
                let p = Point3d::from(-inv * q1);
                if p.coords.iter().all(|c| c.is_finite()) {
                    let cost = self.error(&p);
                    if cost < best.1 {
                        best = (p, cost);
                    }
                }
            }
        }

        for candidate in [a, b] {
            let cost = self.error(candidate);
            if cost < best.1 {
                best = (*candidate, cost);
            }
        }
        best
    }
}

impl Add for Quadric {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}
