//! Numerical solvers used to build soil flux tables.
//!
//! - [`equation`]: bracketed root finding for a scalar residual
//! - [`quadrature`]: adaptive Simpson integration with a bounded budget
//!
//! Solvers report how they finished through a status value rather than an
//! error whenever a usable estimate exists, so callers can keep a best guess
//! and flag it instead of aborting.

mod observer;

pub mod equation;
pub mod quadrature;

pub use observer::Observer;
