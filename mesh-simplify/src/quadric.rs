//! Quadric error metric.
//!
//! A quadric is a symmetric positive-semidefinite bilinear form on
//! homogeneous 3D points whose value at a point is the sum of squared
//! distances from that point to a set of planes. The engine accumulates one
//! quadric per vertex from the plane equations of its incident faces, plus
//! penalised virtual constraint planes along the boundary.

use nalgebra::{Matrix4, Point3, Vector3};

/// Symmetric 4×4 error form stored as its 10 independent entries.
///
/// ```text
/// [a b c d]
/// [b e f g]
/// [c f h i]
/// [d g i j]
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quadric {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
    g: f64,
    h: f64,
    i: f64,
    j: f64,
}

impl Quadric {
    /// Create a quadric from a plane equation `ax + by + cz + d = 0`.
    ///
    /// The plane normal `(a, b, c)` must be unit length for the quadric to
    /// measure squared euclidean distance.
    #[must_use]
    pub const fn from_plane(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            a: a * a,
            b: a * b,
            c: a * c,
            d: a * d,
            e: b * b,
            f: b * c,
            g: b * d,
            h: c * c,
            i: c * d,
            j: d * d,
        }
    }

    /// Create a quadric for the plane with unit normal `n` passing through
    /// `point`, i.e. with offset `d = −(n · point)`.
    #[must_use]
    pub fn from_plane_through_point(n: Vector3<f64>, point: Point3<f64>) -> Self {
        let d = -n.dot(&point.coords);
        Self::from_plane(n.x, n.y, n.z, d)
    }

    /// Return this quadric uniformly scaled by `weight`.
    ///
    /// Scaling a quadric scales the error it reports; boundary constraint
    /// planes use this to make off-boundary drift expensive.
    #[must_use]
    pub const fn scaled(mut self, weight: f64) -> Self {
        self.a *= weight;
        self.b *= weight;
        self.c *= weight;
        self.d *= weight;
        self.e *= weight;
        self.f *= weight;
        self.g *= weight;
        self.h *= weight;
        self.i *= weight;
        self.j *= weight;
        self
    }

    /// Add another quadric into this one.
    pub const fn add(&mut self, other: &Self) {
        self.a += other.a;
        self.b += other.b;
        self.c += other.c;
        self.d += other.d;
        self.e += other.e;
        self.f += other.f;
        self.g += other.g;
        self.h += other.h;
        self.i += other.i;
        self.j += other.j;
    }

    /// Sum of two quadrics.
    #[must_use]
    pub const fn sum(&self, other: &Self) -> Self {
        let mut out = *self;
        out.add(other);
        out
    }

    /// Evaluate the error `vᵀ Q v` at a point, with `v = (x, y, z, 1)`.
    #[must_use]
    pub fn evaluate(&self, p: Point3<f64>) -> f64 {
        let (x, y, z) = (p.x, p.y, p.z);
        x * (self.a * x + 2.0 * (self.b * y + self.c * z + self.d))
            + y * (self.e * y + 2.0 * (self.f * z + self.g))
            + z * (self.h * z + 2.0 * self.i)
            + self.j
    }

    /// The full symmetric 4×4 matrix form.
    #[must_use]
    pub fn homogeneous(&self) -> Matrix4<f64> {
        Matrix4::new(
            self.a, self.b, self.c, self.d, //
            self.b, self.e, self.f, self.g, //
            self.c, self.f, self.h, self.i, //
            self.d, self.g, self.i, self.j,
        )
    }

    /// The matrix form with the last row replaced by `(0, 0, 0, 1)`.
    ///
    /// Solving `Q̃ v = (0, 0, 0, 1)ᵀ` yields the point minimising `vᵀ Q v`
    /// under the homogeneous constraint `w = 1`.
    #[must_use]
    pub fn augmented(&self) -> Matrix4<f64> {
        Matrix4::new(
            self.a, self.b, self.c, self.d, //
            self.b, self.e, self.f, self.g, //
            self.c, self.f, self.h, self.i, //
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_quadric_reports_zero() {
        let q = Quadric::default();
        assert!(q.evaluate(Point3::new(1.0, 2.0, 3.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn plane_distance_squared() {
        // Plane z = 0
        let q = Quadric::from_plane(0.0, 0.0, 1.0, 0.0);

        // On the plane: zero error
        assert!(q.evaluate(Point3::new(3.0, -2.0, 0.0)).abs() < 1e-12);

        // At z = 2: squared distance 4
        assert!((q.evaluate(Point3::new(0.0, 0.0, 2.0)) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn offset_plane_through_point() {
        let n = Vector3::new(0.0, 1.0, 0.0);
        let q = Quadric::from_plane_through_point(n, Point3::new(0.0, 5.0, 0.0));

        assert!(q.evaluate(Point3::new(7.0, 5.0, -1.0)).abs() < 1e-12);
        assert!((q.evaluate(Point3::new(0.0, 8.0, 0.0)) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn sum_accumulates_planes() {
        let q1 = Quadric::from_plane(1.0, 0.0, 0.0, 0.0);
        let q2 = Quadric::from_plane(0.0, 1.0, 0.0, 0.0);
        let q = q1.sum(&q2);

        // Origin lies on both planes
        assert!(q.evaluate(Point3::origin()).abs() < 1e-12);
        // (1, 1, 0) is distance 1 from each
        assert!((q.evaluate(Point3::new(1.0, 1.0, 0.0)) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn scaled_multiplies_error() {
        let q = Quadric::from_plane(0.0, 0.0, 1.0, 0.0).scaled(100.0);
        assert!((q.evaluate(Point3::new(0.0, 0.0, 1.0)) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn matrix_forms_agree_with_evaluate() {
        let mut q = Quadric::from_plane(0.6, 0.8, 0.0, -1.5);
        q.add(&Quadric::from_plane(0.0, 0.0, 1.0, 0.25));

        let p = Point3::new(0.3, -1.2, 2.0);
        let v = nalgebra::Vector4::new(p.x, p.y, p.z, 1.0);
        let by_matrix = (v.transpose() * q.homogeneous() * v)[0];
        assert!((by_matrix - q.evaluate(p)).abs() < 1e-12);
    }

    #[test]
    fn quadrics_stay_positive_semidefinite() {
        // Sum of outer products is PSD; eigenvalues must not go negative
        let mut q = Quadric::from_plane(1.0, 0.0, 0.0, -2.0);
        q.add(&Quadric::from_plane(0.0, 0.70710678, 0.70710678, 0.5));
        q.add(&Quadric::from_plane(0.0, 0.0, 1.0, 0.0).scaled(10.0));

        let eigen = q.homogeneous().symmetric_eigen();
        for ev in eigen.eigenvalues.iter() {
            assert!(*ev > -1e-9, "eigenvalue {ev} below tolerance");
        }
    }
}
