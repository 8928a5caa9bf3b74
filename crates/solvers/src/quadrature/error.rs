use std::error::Error as StdError;

use thiserror::Error;

use super::ConfigError;

/// Errors that can occur during integration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("non-finite integration bounds [{a}, {b}]")]
    NonFiniteBounds { a: f64, b: f64 },

    #[error("non-finite integrand {value} at x = {x}")]
    NonFiniteIntegrand { x: f64, value: f64 },

    #[error("integrand evaluation failed")]
    Integrand(#[source] Box<dyn StdError + Send + Sync>),
}
