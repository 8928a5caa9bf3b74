use std::error::Error as StdError;

use thiserror::Error;

use super::{bracket::BracketError, config::ConfigError};

/// Errors that can occur while solving an equation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid bracket: {0}")]
    InvalidBracket(#[from] BracketError),

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("no root in bracket: f({left})={left_residual}, f({right})={right_residual}")]
    NoBracket {
        left: f64,
        right: f64,
        left_residual: f64,
        right_residual: f64,
    },

    #[error("non-finite residual {residual} at x = {x}")]
    NonFiniteResidual { x: f64, residual: f64 },

    #[error("residual evaluation failed")]
    Equation(#[source] Box<dyn StdError + Send + Sync>),
}
