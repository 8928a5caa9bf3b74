//! Bracketed solvers for `residual(x) = 0`.
//!
//! Both solvers need endpoint residuals of opposite sign, and they share
//! configuration, events and solution types.
//!
//! - [`bisection`] halves the bracket every iteration.
//! - [`false_position`] is Illinois-modified regula falsi. It is usually
//!   faster on smooth monotone residuals and keeps the bracket.

mod best;
mod bracket;
mod config;
mod error;
mod event;
mod solution;

pub mod bisection;
pub mod false_position;

use std::error::Error as StdError;

pub use bracket::{Bracket, BracketError};
pub use config::{Config, ConfigError};
pub use error::Error;
pub use event::{Action, Event};
pub use solution::{Solution, Status};

/// A scalar equation expressed through its residual.
pub trait Equation {
    type Error: StdError + Send + Sync + 'static;

    /// Evaluates the residual at `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if the residual cannot be computed at `x`.
    fn residual(&self, x: f64) -> Result<f64, Self::Error>;
}

/// Blanket implementation for fallible residual closures.
impl<F, E> Equation for F
where
    F: Fn(f64) -> Result<f64, E>,
    E: StdError + Send + Sync + 'static,
{
    type Error = E;

    fn residual(&self, x: f64) -> Result<f64, Self::Error> {
        self(x)
    }
}

/// Evaluates the equation and rejects non-finite residuals.
fn evaluate(equation: &impl Equation, x: f64) -> Result<f64, Error> {
    let residual = equation
        .residual(x)
        .map_err(|err| Error::Equation(Box::new(err)))?;

    if residual.is_finite() {
        Ok(residual)
    } else {
        Err(Error::NonFiniteResidual { x, residual })
    }
}

/// Outcome of evaluating the bracket endpoints.
enum Start {
    /// An endpoint already satisfies the residual tolerance.
    Done(Solution),
    /// A valid bracket and the better endpoint.
    Search(Bracket, best::Best),
}

/// Validates inputs and evaluates both bracket endpoints.
///
/// An endpoint already within `residual_tol` ends the search immediately.
fn initialize(
    equation: &impl Equation,
    bracket: [f64; 2],
    config: &Config,
) -> Result<Start, Error> {
    config.validate()?;
    let [left, right] = bracket::ordered(bracket)?;

    let mut residual = [0.0; 2];
    for (slot, x) in residual.iter_mut().zip([left, right]) {
        *slot = evaluate(equation, x)?;
        if slot.abs() <= config.residual_tol {
            return Ok(Start::Done(Solution {
                status: Status::Converged,
                x,
                residual: *slot,
                iters: 0,
            }));
        }
    }
    let [left_residual, right_residual] = residual;

    let best = best::Best::of_endpoints((left, left_residual), (right, right_residual));
    Bracket::new([left, right], residual)
        .map(|bracket| Start::Search(bracket, best))
        .ok_or(Error::NoBracket {
            left,
            right,
            left_residual,
            right_residual,
        })
}
