use super::{Solution, Status};

/// Smallest-magnitude residual seen so far, endpoints included.
#[derive(Debug, Clone, Copy)]
pub(super) struct Best {
    x: f64,
    residual: f64,
}

impl Best {
    /// Ties go to the left endpoint.
    pub(super) fn of_endpoints(left: (f64, f64), right: (f64, f64)) -> Self {
        let (x, residual) = if right.1.abs() < left.1.abs() { right } else { left };
        Self { x, residual }
    }

    /// Replaces the held point only on a strict improvement.
    pub(super) fn update(&mut self, x: f64, residual: f64) {
        if residual.abs() < self.residual.abs() {
            *self = Self { x, residual };
        }
    }

    pub(super) fn finish(self, status: Status, iters: usize) -> Solution {
        let Self { x, residual } = self;
        Solution {
            status,
            x,
            residual,
            iters,
        }
    }
}
