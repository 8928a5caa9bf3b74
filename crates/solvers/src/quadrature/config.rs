use thiserror::Error;

/// Errors returned by [`Config::validate`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("abs_tol must be finite and non-negative")]
    AbsTol,
    #[error("rel_tol must be finite and non-negative")]
    RelTol,
    #[error("at least one of abs_tol and rel_tol must be positive")]
    ZeroTolerance,
}

/// Configuration for adaptive Simpson quadrature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Absolute tolerance on the integral.
    pub abs_tol: f64,
    /// Tolerance relative to the first whole-interval estimate.
    pub rel_tol: f64,
    /// Maximum bisection depth of any panel.
    pub max_depth: usize,
    /// Soft cap on integrand evaluations; checked before each subdivision.
    pub max_evals: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            abs_tol: 1e-12,
            rel_tol: 1e-10,
            max_depth: 48,
            max_evals: 20_000,
        }
    }
}

impl Config {
    /// Validates the tolerances.
    ///
    /// # Errors
    ///
    /// Returns an error if a tolerance is negative or non-finite, or if both
    /// tolerances are zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.abs_tol.is_finite() || self.abs_tol < 0.0 {
            return Err(ConfigError::AbsTol);
        }
        if !self.rel_tol.is_finite() || self.rel_tol < 0.0 {
            return Err(ConfigError::RelTol);
        }
        if self.abs_tol == 0.0 && self.rel_tol == 0.0 {
            return Err(ConfigError::ZeroTolerance);
        }
        Ok(())
    }
}
