/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A residual or bracket-width tolerance was met.
    Converged,
    /// `max_iters` ran out first. The solution holds the best point seen.
    MaxIters,
    /// An observer returned [`Action::StopEarly`](super::Action::StopEarly).
    StoppedByObserver,
}

/// Outcome of a bracketed search.
///
/// Unless `status` is [`Status::Converged`], `x` is the evaluated point with
/// the smallest `|residual|`, endpoints included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    pub status: Status,
    pub x: f64,
    pub residual: f64,
    /// Iterations run, not counting the two endpoint evaluations.
    pub iters: usize,
}
