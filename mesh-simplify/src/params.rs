//! Parameters for mesh simplification.

/// Parameters for mesh simplification.
///
/// The engine collapses the globally cheapest valid edge until no edge can be
/// collapsed below [`error_budget`](Self::error_budget).
#[derive(Debug, Clone)]
pub struct SimplifyParams {
    /// Maximum quadric error allowed for a single collapse. Edges whose
    /// optimal collapse error exceeds this are never collapsed.
    pub error_budget: f64,

    /// Weight of the virtual boundary constraint planes added to boundary
    /// vertices. Higher values make collapses that pull a vertex off the
    /// boundary proportionally more expensive. Default: 10.0
    pub boundary_penalty: f64,

    /// Maximum number of collapses to perform. If `None`, the loop runs until
    /// the budget is exhausted.
    pub max_collapses: Option<usize>,

    /// Absolute errors below this are clamped to exactly zero.
    /// Default: `5e-6`
    pub zero_clamp: f64,

    /// Determinant magnitude below which the augmented quadric system is
    /// treated as singular and the midpoint fallback is used.
    /// Default: `1e-10`
    pub pivot_epsilon: f64,
}

impl Default for SimplifyParams {
    fn default() -> Self {
        Self {
            error_budget: 1e-3,
            boundary_penalty: 10.0,
            max_collapses: None,
            zero_clamp: 5e-6,
            pivot_epsilon: 1e-10,
        }
    }
}

impl SimplifyParams {
    /// Create params with a specific error budget.
    #[must_use]
    pub fn with_error_budget(budget: f64) -> Self {
        Self {
            error_budget: budget,
            ..Default::default()
        }
    }

    /// Set the boundary penalty weight.
    #[must_use]
    pub const fn with_boundary_penalty(mut self, penalty: f64) -> Self {
        self.boundary_penalty = penalty;
        self
    }

    /// Set the maximum number of collapses.
    #[must_use]
    pub const fn with_max_collapses(mut self, max: usize) -> Self {
        self.max_collapses = Some(max);
        self
    }
}
