use thiserror::Error;

/// The tolerance that failed [`Config::validate`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("x_abs_tol must be finite and non-negative")]
    XAbsTol,
    #[error("x_rel_tol must be finite and non-negative")]
    XRelTol,
    #[error("residual_tol must be finite and non-negative")]
    ResidualTol,
}

/// Stopping rules shared by [`bisection`](super::bisection) and
/// [`false_position`](super::false_position).
///
/// A search converges when `|residual| <= residual_tol` or when the bracket
/// width is at most `x_abs_tol + x_rel_tol * |midpoint|`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub max_iters: usize,
    pub x_abs_tol: f64,
    pub x_rel_tol: f64,
    pub residual_tol: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iters: 100,
            x_abs_tol: 1e-12,
            x_rel_tol: 1e-12,
            residual_tol: 1e-12,
        }
    }
}

impl Config {
    /// # Errors
    ///
    /// Names the first tolerance that is negative, NaN, or infinite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.x_abs_tol, ConfigError::XAbsTol),
            (self.x_rel_tol, ConfigError::XRelTol),
            (self.residual_tol, ConfigError::ResidualTol),
        ];
        match checks
            .into_iter()
            .find(|(tol, _)| !(tol.is_finite() && *tol >= 0.0))
        {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }
}
