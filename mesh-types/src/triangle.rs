//! Concrete triangle with resolved vertex positions.

use nalgebra::{Point3, Vector3};

/// A triangle with three vertex positions.
///
/// Unlike a face of an [`crate::IndexedMesh`], a `Triangle` owns its corner
/// positions and can answer geometric queries directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First corner.
    pub a: Point3<f64>,
    /// Second corner.
    pub b: Point3<f64>,
    /// Third corner.
    pub c: Point3<f64>,
}

impl Triangle {
    /// Create a triangle from three corner positions.
    #[inline]
    #[must_use]
    pub const fn new(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Self {
        Self { a, b, c }
    }

    /// Unit normal of the triangle, following the winding order.
    ///
    /// Returns `None` when the corners are collinear (zero-area triangle).
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::{Triangle, Point3};
    ///
    /// let tri = Triangle::new(
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// );
    /// let n = tri.normal().unwrap();
    /// assert!((n.z - 1.0).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let cross = (self.b - self.a).cross(&(self.c - self.a));
        let len = cross.norm();
        if len < 1e-12 {
            return None;
        }
        Some(cross / len)
    }

    /// Area of the triangle.
    #[must_use]
    pub fn area(&self) -> f64 {
        (self.b - self.a).cross(&(self.c - self.a)).norm() * 0.5
    }
}
