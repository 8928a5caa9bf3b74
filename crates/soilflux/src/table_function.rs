//! Piecewise-linear lookup over tabulated knots.

use thiserror::Error;

/// Errors raised when building or evaluating a [`TableFunction`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TableError {
    #[error("table has no knots")]
    Empty,

    #[error("x has {x} knots but y has {y}")]
    LengthMismatch { x: usize, y: usize },

    #[error("non-finite knot at index {index}")]
    NonFiniteKnot { index: usize },

    #[error("knots descend at index {index}: {previous} > {current}")]
    Descending {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("query is not finite: {x}")]
    NonFiniteQuery { x: f64 },

    #[error("x = {x} is outside [{min}, {max}]")]
    OutOfRange { x: f64, min: f64, max: f64 },
}

/// A piecewise-linear function through `(x, y)` knots.
///
/// Knots must be non-decreasing in `x`. A repeated `x` is allowed and the
/// segment between the repeats has zero slope, so an exact query at the
/// repeated knot returns the first of its `y` values.
///
/// With `flat_ends` the first and last `y` extend indefinitely; without it a
/// query outside the knots is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct TableFunction {
    x: Vec<f64>,
    y: Vec<f64>,
    flat_ends: bool,
}

impl TableFunction {
    /// Creates a table function.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs are empty, differ in length, contain a
    /// non-finite value, or if `x` descends anywhere.
    pub fn new(x: Vec<f64>, y: Vec<f64>, flat_ends: bool) -> Result<Self, TableError> {
        if x.len() != y.len() {
            return Err(TableError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.is_empty() {
            return Err(TableError::Empty);
        }
        if let Some(index) = x
            .iter()
            .zip(&y)
            .position(|(xi, yi)| !xi.is_finite() || !yi.is_finite())
        {
            return Err(TableError::NonFiniteKnot { index });
        }
        if let Some(index) = x.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(TableError::Descending {
                index: index + 1,
                previous: x[index],
                current: x[index + 1],
            });
        }

        Ok(Self { x, y, flat_ends })
    }

    /// Returns the knot abscissae.
    #[must_use]
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Returns the knot ordinates.
    #[must_use]
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Returns the `[first, last]` knot abscissae.
    #[must_use]
    pub fn domain(&self) -> [f64; 2] {
        [self.x[0], self.x[self.x.len() - 1]]
    }

    /// Evaluates the function at `v`.
    ///
    /// Segments are located by a linear scan from the first knot, which suits
    /// short tables and near-sequential queries.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-finite query, or for a query outside the
    /// knots when `flat_ends` is false.
    #[allow(clippy::float_cmp)]
    pub fn evaluate(&self, v: f64) -> Result<f64, TableError> {
        if !v.is_finite() {
            return Err(TableError::NonFiniteQuery { x: v });
        }

        let [min, max] = self.domain();
        let last = self.y.len() - 1;
        if v < min || v > max {
            if !self.flat_ends {
                return Err(TableError::OutOfRange { x: v, min, max });
            }
            return Ok(if v < min { self.y[0] } else { self.y[last] });
        }

        // v <= max, so the scan always stops on a knot.
        let sector = self.x.iter().position(|&xs| v <= xs).unwrap_or(last);

        if sector == 0 || v == self.x[sector] {
            return Ok(self.y[sector]);
        }

        let (x0, x1) = (self.x[sector - 1], self.x[sector]);
        let (y0, y1) = (self.y[sector - 1], self.y[sector]);
        let slope = if x1 == x0 { 0.0 } else { (y1 - y0) / (x1 - x0) };

        Ok(y0 + slope * (v - x0))
    }
}
