//! Core traits for meshview

use crate::error::Result;
use crate::point::Point3d;

/// Objects with an axis-aligned extent
pub trait Bounded {
    /// Component-wise minimum and maximum over all positions.
    ///
    /// Fails with `EmptyMesh` when there is nothing to bound.
    fn bounding_box(&self) -> Result<(Point3d, Point3d)>;

    /// Midpoint of the bounding box
    fn center(&self) -> Result<Point3d> {
        let (min, max) = self.bounding_box()?;
        Ok(nalgebra::center(&min, &max))
    }
}

