use std::fmt;

use ndarray::{Array1, Array2};
use ninterp::{
    interpolator::Extrapolate,
    prelude::{Interp2DOwned, Interpolator},
    strategy::Linear,
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Reliability of one flux value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    Converged,
    /// The value is a best estimate from a solver or integral that did not
    /// meet its tolerance.
    Low,
}

/// One `(upper, lower)` entry of a flux grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluxRecord {
    pub upper: f64,
    pub lower: f64,
    pub flux: f64,
    pub confidence: Confidence,
}

/// Flux tabulated over upper and lower boundary potentials.
///
/// Both axes ascend strictly. Values between nodes are bilinear.
pub struct FluxGrid {
    label: String,
    upper: Vec<f64>,
    lower: Vec<f64>,
    flux: Array2<f64>,
    confidence: Array2<Confidence>,
    interp: Interp2DOwned<f64, Linear>,
}

impl FluxGrid {
    /// Builds a grid with `flux[[i, j]]` at `(upper[i], lower[j])`.
    pub(crate) fn new(
        label: String,
        upper: Vec<f64>,
        lower: Vec<f64>,
        flux: Array2<f64>,
        confidence: Array2<Confidence>,
    ) -> Result<Self, Error> {
        let shape = [upper.len(), lower.len()];
        if flux.shape() != shape || confidence.shape() != shape {
            return Err(Error::numerical(&label, "grid shape does not match its axes"));
        }
        if shape.iter().any(|&n| n < 2) {
            return Err(Error::numerical(&label, "grid needs two nodes per axis"));
        }
        let ascending = |axis: &[f64]| axis.windows(2).all(|pair| pair[0] < pair[1]);
        if !ascending(&upper) || !ascending(&lower) {
            return Err(Error::numerical(&label, "grid axes must ascend strictly"));
        }
        if flux.iter().any(|q| !q.is_finite()) {
            return Err(Error::numerical(&label, "grid holds a non-finite flux"));
        }

        let interp = Interp2DOwned::new(
            Array1::from(upper.clone()),
            Array1::from(lower.clone()),
            flux.clone(),
            Linear,
            Extrapolate::Error,
        )
        .map_err(|err| Error::numerical(&label, err))?;

        Ok(Self {
            label,
            upper,
            lower,
            flux,
            confidence,
            interp,
        })
    }

    /// Rebuilds a grid from records in upper-major order.
    pub(crate) fn from_records(label: String, records: &[FluxRecord]) -> Result<Self, Error> {
        let fail = |reason: &str| Error::numerical(&label, reason);

        let first_upper = records.first().ok_or_else(|| fail("no records"))?.upper;
        let columns = records
            .iter()
            .position(|r| r.upper.to_bits() != first_upper.to_bits())
            .unwrap_or(records.len());
        if columns == 0 || records.len() % columns != 0 {
            return Err(fail("records do not form a full grid"));
        }
        let rows = records.len() / columns;

        let upper: Vec<f64> = records.iter().step_by(columns).map(|r| r.upper).collect();
        let lower: Vec<f64> = records[..columns].iter().map(|r| r.lower).collect();

        for (index, record) in records.iter().enumerate() {
            let (i, j) = (index / columns, index % columns);
            if record.upper.to_bits() != upper[i].to_bits()
                || record.lower.to_bits() != lower[j].to_bits()
            {
                return Err(fail("records are not in upper-major grid order"));
            }
        }

        let flux = Array2::from_shape_fn((rows, columns), |(i, j)| records[i * columns + j].flux);
        let confidence =
            Array2::from_shape_fn((rows, columns), |(i, j)| records[i * columns + j].confidence);

        Self::new(label, upper, lower, flux, confidence)
    }

    /// Key string of the table owning this grid.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    #[must_use]
    pub fn flux(&self) -> &Array2<f64> {
        &self.flux
    }

    #[must_use]
    pub fn confidence(&self) -> &Array2<Confidence> {
        &self.confidence
    }

    /// Number of `(upper, lower)` entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flux.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flux.is_empty()
    }

    /// Grid indices of low-confidence entries, in row order.
    #[must_use]
    pub fn low_confidence(&self) -> Vec<(usize, usize)> {
        self.confidence
            .indexed_iter()
            .filter(|(_, c)| **c == Confidence::Low)
            .map(|(index, _)| index)
            .collect()
    }

    /// Entries ordered by upper ascending, then lower ascending.
    pub fn records(&self) -> impl Iterator<Item = FluxRecord> + '_ {
        self.flux
            .indexed_iter()
            .map(|((i, j), &flux)| FluxRecord {
                upper: self.upper[i],
                lower: self.lower[j],
                flux,
                confidence: self.confidence[[i, j]],
            })
    }

    /// Bilinear flux at `(upper, lower)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if either potential is outside its axis.
    pub fn interpolate(&self, upper: f64, lower: f64) -> Result<f64, Error> {
        self.check_axis("upper", upper, &self.upper)?;
        self.check_axis("lower", lower, &self.lower)?;
        self.interp
            .interpolate(&[upper, lower])
            .map_err(|err| Error::numerical(&self.label, err))
    }

    fn check_axis(&self, boundary: &'static str, value: f64, axis: &[f64]) -> Result<(), Error> {
        let (min, max) = (axis[0], axis[axis.len() - 1]);
        if value >= min && value <= max {
            return Ok(());
        }
        Err(Error::OutOfRange {
            table: self.label.clone(),
            boundary,
            value,
            min,
            max,
        })
    }
}

impl fmt::Debug for FluxGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluxGrid")
            .field("label", &self.label)
            .field("upper", &self.upper)
            .field("lower", &self.lower)
            .field("flux", &self.flux)
            .field("confidence", &self.confidence)
            .finish_non_exhaustive()
    }
}

impl PartialEq for FluxGrid {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
            && self.upper == other.upper
            && self.lower == other.lower
            && self.flux == other.flux
            && self.confidence == other.confidence
    }
}

/// Read access shared by single-layer and composite flux tables.
pub trait FluxLookup {
    fn grid(&self) -> &FluxGrid;

    /// Interpolated flux for a pair of boundary potentials, positive
    /// downward.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] outside the grid.
    fn flux(&self, upper: f64, lower: f64) -> Result<f64, Error> {
        self.grid().interpolate(upper, lower)
    }

    /// Returns the `[first, last]` upper boundary potentials.
    fn upper_domain(&self) -> [f64; 2] {
        let upper = self.grid().upper();
        [upper[0], upper[upper.len() - 1]]
    }

    /// Returns the `[first, last]` lower boundary potentials.
    fn lower_domain(&self) -> [f64; 2] {
        let lower = self.grid().lower();
        [lower[0], lower[lower.len() - 1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use ndarray::array;

    fn grid() -> FluxGrid {
        FluxGrid::new(
            "test".into(),
            vec![-4.0, -2.0, 0.0],
            vec![-4.0, 0.0],
            array![[0.0, -4.0], [2.0, -2.0], [4.0, 0.0]],
            Array2::from_elem((3, 2), Confidence::Converged),
        )
        .expect("valid grid")
    }

    #[test]
    fn interpolates_bilinearly() {
        let grid = grid();
        assert_relative_eq!(grid.interpolate(-2.0, -4.0).expect("in range"), 2.0);
        assert_relative_eq!(grid.interpolate(-1.0, -2.0).expect("in range"), 1.0);
        assert_relative_eq!(grid.interpolate(0.0, 0.0).expect("in range"), 0.0);
    }

    #[test]
    fn rejects_points_outside_axes() {
        let grid = grid();
        assert!(matches!(
            grid.interpolate(0.5, -1.0),
            Err(Error::OutOfRange {
                boundary: "upper",
                ..
            })
        ));
        assert!(matches!(
            grid.interpolate(-1.0, -4.5),
            Err(Error::OutOfRange {
                boundary: "lower",
                ..
            })
        ));
        assert!(matches!(
            grid.interpolate(f64::NAN, -1.0),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn records_rebuild_the_grid() {
        let grid = grid();
        let records: Vec<_> = grid.records().collect();
        assert_eq!(records.len(), 6);
        assert_eq!(records[1].upper, -4.0);
        assert_eq!(records[1].lower, 0.0);

        let rebuilt = FluxGrid::from_records("test".into(), &records).expect("full grid");
        assert_eq!(rebuilt, grid);
    }

    #[test]
    fn incomplete_records_are_rejected() {
        let records: Vec<_> = grid().records().take(5).collect();
        assert!(matches!(
            FluxGrid::from_records("test".into(), &records),
            Err(Error::Numerical { .. })
        ));
    }

    #[test]
    fn shape_must_match_axes() {
        let result = FluxGrid::new(
            "test".into(),
            vec![-4.0, 0.0],
            vec![-4.0, 0.0],
            array![[0.0, -4.0, 1.0], [4.0, 0.0, 1.0]],
            Array2::from_elem((2, 3), Confidence::Converged),
        );
        assert!(matches!(result, Err(Error::Numerical { .. })));
    }

    #[test]
    fn lists_low_confidence_entries() {
        let mut confidence = Array2::from_elem((3, 2), Confidence::Converged);
        confidence[[1, 0]] = Confidence::Low;
        let grid = FluxGrid::new(
            "test".into(),
            vec![-4.0, -2.0, 0.0],
            vec![-4.0, 0.0],
            array![[0.0, -4.0], [2.0, -2.0], [4.0, 0.0]],
            confidence,
        )
        .expect("valid grid");
        assert_eq!(grid.low_confidence(), vec![(1, 0)]);
    }
}
