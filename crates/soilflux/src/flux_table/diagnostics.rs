use serde::{Deserialize, Serialize};

/// Convergence summary of a generated flux table.
///
/// Tables restored from persisted records carry only the low-confidence
/// list; the solver counters stay zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FluxDiagnostics {
    /// Most interface-search iterations used by one row (composites only).
    pub max_iters: usize,
    /// Most integrand evaluations used by one node interval.
    pub max_evals: usize,
    /// Deepest quadrature subdivision reached.
    pub max_depth: usize,
    /// `(upper, lower)` grid indices of low-confidence rows.
    pub low_confidence: Vec<(usize, usize)>,
}

impl FluxDiagnostics {
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.low_confidence.is_empty()
    }
}
