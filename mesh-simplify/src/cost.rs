//! Collapse cost evaluation.
//!
//! For an edge with endpoints `p` and `q`, the merged quadric is
//! `Q = Q(p) + Q(q)`. The optimal position for the merged vertex minimises
//! `vᵀ Q v` under the homogeneous constraint `w = 1`, found by solving the
//! augmented system `Q̃ v = (0, 0, 0, 1)ᵀ` with a pivoted LU decomposition in
//! double precision. Near-singular systems fall back to the edge midpoint.

use nalgebra::{Point3, Vector4};

use crate::params::SimplifyParams;
use crate::quadric::Quadric;

/// The evaluated cost of collapsing one edge.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EdgeCost {
    /// Quadric error at `position`. Always `>= 0`.
    pub error: f64,
    /// Where the surviving vertex would be placed.
    pub position: Point3<f64>,
}

impl EdgeCost {
    /// Filler for slots whose cost has not been evaluated yet.
    pub(crate) fn placeholder() -> Self {
        Self {
            error: f64::INFINITY,
            position: Point3::origin(),
        }
    }
}

/// Evaluate the collapse of the edge `(p, q)` under the merged quadric.
///
/// Single precision routinely produces small negative errors on near-flat
/// regions, which is why the whole evaluation runs in `f64`; residual
/// round-off is clamped to zero without discarding the solved position.
pub(crate) fn evaluate_collapse(
    quadric_p: &Quadric,
    quadric_q: &Quadric,
    pos_p: Point3<f64>,
    pos_q: Point3<f64>,
    params: &SimplifyParams,
) -> EdgeCost {
    let merged = quadric_p.sum(quadric_q);

    let position = solve_optimal(&merged, params.pivot_epsilon)
        .unwrap_or_else(|| Point3::from((pos_p.coords + pos_q.coords) * 0.5));

    let raw = merged.evaluate(position);
    let error = if raw.abs() < params.zero_clamp {
        0.0
    } else {
        raw.max(0.0)
    };

    EdgeCost { error, position }
}

/// Solve `Q̃ v = (0, 0, 0, 1)ᵀ` for the unconstrained optimum.
///
/// Returns `None` when the augmented matrix is singular to within
/// `pivot_epsilon` (or the solution is non-finite), signalling the caller to
/// use the midpoint fallback.
fn solve_optimal(merged: &Quadric, pivot_epsilon: f64) -> Option<Point3<f64>> {
    let lu = merged.augmented().lu();
    if lu.determinant().abs() < pivot_epsilon {
        return None;
    }

    let v = lu.solve(&Vector4::new(0.0, 0.0, 0.0, 1.0))?;
    if !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()) {
        return None;
    }
    Some(Point3::new(v.x, v.y, v.z))
}
