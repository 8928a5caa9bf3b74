/// Indicates how the integration finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Every panel met its share of the tolerance.
    Converged,
    /// At least one panel hit the depth limit.
    MaxDepth,
    /// The evaluation budget ran out before every panel converged.
    MaxEvals,
}

/// The result of an integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    /// Integral estimate (Richardson-corrected Simpson sum).
    pub value: f64,
    /// Sum of the per-panel error estimates.
    pub error_estimate: f64,
    /// Final status.
    pub status: Status,
    /// Number of integrand evaluations.
    pub evals: usize,
    /// Deepest subdivision level reached.
    pub depth: usize,
}
