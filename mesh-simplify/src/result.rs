//! Result types for simplification operations.

// Counts don't overflow in practice
#![allow(clippy::cast_precision_loss)]

/// Statistics from a simplification run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplifySummary {
    /// Number of vertices in the input mesh (after welding).
    pub original_vertices: usize,

    /// Number of triangles in the input mesh.
    pub original_triangles: usize,

    /// Number of vertices in the simplified mesh.
    pub final_vertices: usize,

    /// Number of triangles in the simplified mesh.
    pub final_triangles: usize,

    /// Number of edge collapses performed.
    pub collapses_performed: usize,

    /// Number of collapse attempts rejected by the validity gates.
    pub collapses_rejected: usize,
}

impl SimplifySummary {
    /// Get the triangle reduction ratio (final / original).
    #[must_use]
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_triangles == 0 {
            1.0
        } else {
            self.final_triangles as f64 / self.original_triangles as f64
        }
    }

    /// Check if any simplification occurred.
    #[must_use]
    pub const fn was_simplified(&self) -> bool {
        self.collapses_performed > 0
    }
}

impl std::fmt::Display for SimplifySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Simplification: {} → {} triangles ({:.1}% reduction, {} collapses, {} rejected)",
            self.original_triangles,
            self.final_triangles,
            (1.0 - self.reduction_ratio()) * 100.0,
            self.collapses_performed,
            self.collapses_rejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_ratio() {
        let summary = SimplifySummary {
            original_triangles: 1000,
            final_triangles: 250,
            collapses_performed: 375,
            ..Default::default()
        };
        assert!((summary.reduction_ratio() - 0.25).abs() < 1e-12);
        assert!(summary.was_simplified());
    }

    #[test]
    fn empty_ratio_is_one() {
        let summary = SimplifySummary::default();
        assert!((summary.reduction_ratio() - 1.0).abs() < 1e-12);
        assert!(!summary.was_simplified());
    }

    #[test]
    fn display() {
        let summary = SimplifySummary {
            original_triangles: 100,
            final_triangles: 50,
            collapses_performed: 25,
            ..Default::default()
        };
        let text = format!("{summary}");
        assert!(text.contains("100"));
        assert!(text.contains("50.0%"));
    }
}
