/// Control actions supported by the equation solvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the solver early and return the best estimate found so far.
    StopEarly,
}

/// Iteration event emitted by the equation solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// Iteration counter (1-based within the solver loop).
    pub iter: usize,
    /// Search bracket before this iteration's update.
    pub bracket: [f64; 2],
    /// The x value evaluated this iteration.
    pub x: f64,
    /// Residual at `x`.
    pub residual: f64,
}
