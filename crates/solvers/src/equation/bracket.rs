use thiserror::Error;

/// Reasons a pair of bounds cannot start a bracketed search.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BracketError {
    #[error("bracket bounds must be finite")]
    NonFinite,
    #[error("bracket bounds coincide")]
    ZeroWidth,
}

/// Orders a pair of bounds as `[low, high]`.
///
/// # Errors
///
/// Fails if either bound is NaN or infinite, or if both are equal.
pub(super) fn ordered([a, b]: [f64; 2]) -> Result<[f64; 2], BracketError> {
    if !(a.is_finite() && b.is_finite()) {
        return Err(BracketError::NonFinite);
    }
    match a.partial_cmp(&b) {
        Some(std::cmp::Ordering::Less) => Ok([a, b]),
        Some(std::cmp::Ordering::Greater) => Ok([b, a]),
        _ => Err(BracketError::ZeroWidth),
    }
}

/// Zero counts with the positive side, so a residual of exactly zero is
/// never treated as a sign change against a positive one.
fn changes_sign(a: f64, b: f64) -> bool {
    (a < 0.0) != (b < 0.0)
}

/// An interval `[left, right]` whose end residuals differ in sign.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    x: [f64; 2],
    residual: [f64; 2],
}

impl Bracket {
    /// Returns `None` when `residual` does not change sign across `x`.
    pub(super) fn new(x: [f64; 2], residual: [f64; 2]) -> Option<Self> {
        changes_sign(residual[0], residual[1]).then_some(Self { x, residual })
    }

    #[must_use]
    pub fn as_array(&self) -> [f64; 2] {
        self.x
    }

    #[must_use]
    pub fn residuals(&self) -> [f64; 2] {
        self.residual
    }

    #[must_use]
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.x[0] + self.x[1])
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.x[1] - self.x[0]
    }

    /// True once the width is within `x_abs_tol + x_rel_tol * |midpoint|`.
    #[must_use]
    pub fn is_x_converged(&self, x_abs_tol: f64, x_rel_tol: f64) -> bool {
        self.width() <= x_abs_tol + x_rel_tol * self.midpoint().abs()
    }

    /// Moves whichever end shares the sign of `residual` to `x`, returning
    /// the side that moved.
    pub(super) fn shrink(&mut self, x: f64, residual: f64) -> Side {
        let side = if changes_sign(self.residual[0], residual) {
            Side::Right
        } else {
            Side::Left
        };
        self.x[side.index()] = x;
        self.residual[side.index()] = residual;
        side
    }

    /// Scales the residual kept at one end.
    pub(super) fn scale_residual(&mut self, side: Side, factor: f64) {
        self.residual[side.index()] *= factor;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Side {
    Left,
    Right,
}

impl Side {
    fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn potentials_are_ordered_dry_to_wet() {
        assert_eq!(ordered([-1.0, -150.0]), Ok([-150.0, -1.0]));
        assert_eq!(ordered([-150.0, -1.0]), Ok([-150.0, -1.0]));
    }

    #[test]
    fn unusable_bounds_are_rejected() {
        assert_eq!(ordered([f64::NEG_INFINITY, -1.0]), Err(BracketError::NonFinite));
        assert_eq!(ordered([-10.0, f64::NAN]), Err(BracketError::NonFinite));
        assert_eq!(ordered([-10.0, -10.0]), Err(BracketError::ZeroWidth));
    }

    #[test]
    fn zero_residual_does_not_pair_with_positive() {
        assert!(Bracket::new([-10.0, -2.0], [0.0, 3.0]).is_none());
        assert!(Bracket::new([-10.0, -2.0], [-0.5, 0.0]).is_some());
        assert!(Bracket::new([-10.0, -2.0], [-0.5, -3.0]).is_none());
    }

    #[test]
    fn shrinking_keeps_the_sign_change() {
        let mut bracket = Bracket::new([-10.0, -2.0], [4.0, -1.0]).expect("signs differ");

        assert_eq!(bracket.shrink(-6.0, 1.5), Side::Left);
        assert_eq!(bracket.as_array(), [-6.0, -2.0]);

        assert_eq!(bracket.shrink(-4.0, -0.25), Side::Right);
        assert_eq!(bracket.as_array(), [-6.0, -4.0]);
        assert_eq!(bracket.residuals(), [1.5, -0.25]);
        assert_eq!(bracket.width(), 2.0);
        assert_eq!(bracket.midpoint(), -5.0);

        bracket.scale_residual(Side::Left, 0.5);
        assert_eq!(bracket.residuals(), [0.75, -0.25]);
    }

    #[test]
    fn convergence_uses_absolute_and_relative_width() {
        let bracket = Bracket::new([-100.0, -99.0], [1.0, -1.0]).expect("signs differ");
        assert!(!bracket.is_x_converged(0.5, 0.0));
        assert!(bracket.is_x_converged(0.5, 0.01));
        assert!(bracket.is_x_converged(1.0, 0.0));
    }
}
