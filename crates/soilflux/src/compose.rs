//! Two-layer composition of single-layer flux tables.
//!
//! Steady flow through stacked layers carries the same flux through both, so
//! for outer potentials `(hu, hl)` the interface potential `x` solves
//!
//! ```text
//! q1(hu, x) = q2(x, hl)
//! ```
//!
//! Both fluxes are monotone in `x` (one falling, one rising), so a bracketed
//! solver over the potentials shared by both soils finds the unique root.

use ndarray::Array2;
use soilflux_solvers::equation::{self, Solution, Status, bisection, false_position};

use crate::{
    Error,
    config::{ComposeConfig, InterfaceSearch},
    flux_table::{Confidence, FluxDiagnostics, FluxGrid, FluxLookup, FluxTable},
    key::CompositeKey,
    mvg::SoilHydraulicParameters,
};

/// Flux through two stacked layers.
///
/// The upper axis is the upper layer's grid and the lower axis the lower
/// layer's grid.
#[derive(Debug, PartialEq)]
pub struct CompositeFluxTable {
    key: CompositeKey,
    grid: FluxGrid,
    interfaces: Option<Array2<f64>>,
    diagnostics: FluxDiagnostics,
}

impl CompositeFluxTable {
    /// Wraps a grid restored from persisted records, which carry no
    /// interface potentials.
    pub(crate) fn from_grid(key: CompositeKey, grid: FluxGrid) -> Self {
        let diagnostics = FluxDiagnostics {
            low_confidence: grid.low_confidence(),
            ..FluxDiagnostics::default()
        };
        Self {
            key,
            grid,
            interfaces: None,
            diagnostics,
        }
    }

    #[must_use]
    pub fn key(&self) -> CompositeKey {
        self.key
    }

    /// Solved interface potential per `(upper, lower)` entry, if known.
    #[must_use]
    pub fn interfaces(&self) -> Option<&Array2<f64>> {
        self.interfaces.as_ref()
    }

    #[must_use]
    pub fn diagnostics(&self) -> &FluxDiagnostics {
        &self.diagnostics
    }
}

impl FluxLookup for CompositeFluxTable {
    fn grid(&self) -> &FluxGrid {
        &self.grid
    }
}

/// Composes the flux table of `upper` stacked on `lower`.
///
/// Rows whose interface search fails to bracket or exhausts its iterations
/// keep the smaller-magnitude layer flux at the best interface estimate and
/// are marked [`Confidence::Low`].
///
/// # Errors
///
/// Returns [`Error::Configuration`] if a table does not belong to its
/// parameters, [`Error::InvalidConfig`] for a bad config, and
/// [`Error::Numerical`] if the soils share no potentials or no row converges.
pub fn compose(
    upper: &FluxTable,
    upper_params: &SoilHydraulicParameters,
    lower: &FluxTable,
    lower_params: &SoilHydraulicParameters,
    config: &ComposeConfig,
) -> Result<CompositeFluxTable, Error> {
    config.validate()?;
    for (table, params) in [(upper, upper_params), (lower, lower_params)] {
        if table.key().soil != params.soil_id {
            return Err(Error::configuration(
                params.soil_id,
                format!("flux table {} belongs to another soil", table.key()),
            ));
        }
    }

    let key = CompositeKey {
        upper: upper.key(),
        lower: lower.key(),
    };
    let domain = [
        upper_params.hd.max(lower_params.hd),
        upper_params.he.min(lower_params.he),
    ];
    if domain[0] >= domain[1] {
        return Err(Error::numerical(
            key,
            format!(
                "soils share no potentials: [{}, {}] and [{}, {}]",
                upper_params.hd, upper_params.he, lower_params.hd, lower_params.he
            ),
        ));
    }
    log::debug!("composing {key} over interface potentials {domain:?}");

    let search = equation::Config::from(config.search);
    let (rows, columns) = (upper.nodes().len(), lower.nodes().len());
    let mut flux = Array2::zeros((rows, columns));
    let mut interfaces = Array2::zeros((rows, columns));
    let mut confidence = Array2::from_elem((rows, columns), Confidence::Converged);
    let mut diagnostics = FluxDiagnostics::default();

    for (i, &hu) in upper.nodes().iter().enumerate() {
        for (j, &hl) in lower.nodes().iter().enumerate() {
            let row = Interface {
                upper,
                lower,
                hu,
                hl,
            };
            let outcome = row.solve(domain, &search, config.method)?;

            diagnostics.max_iters = diagnostics.max_iters.max(outcome.iters);
            flux[[i, j]] = outcome.flux;
            interfaces[[i, j]] = outcome.x;
            if !outcome.converged {
                confidence[[i, j]] = Confidence::Low;
            }
        }
    }

    let grid = FluxGrid::new(
        key.to_string(),
        upper.nodes().to_vec(),
        lower.nodes().to_vec(),
        flux,
        confidence,
    )?;
    diagnostics.low_confidence = grid.low_confidence();

    if diagnostics.low_confidence.len() == grid.len() {
        return Err(Error::numerical(key, "interface search failed for every row"));
    }
    if !diagnostics.is_converged() {
        log::warn!(
            "composite {key}: {} of {} rows have low confidence",
            diagnostics.low_confidence.len(),
            grid.len()
        );
    }

    Ok(CompositeFluxTable {
        key,
        grid,
        interfaces: Some(interfaces),
        diagnostics,
    })
}

/// Interface search for one pair of outer potentials.
struct Interface<'a> {
    upper: &'a FluxTable,
    lower: &'a FluxTable,
    hu: f64,
    hl: f64,
}

struct Outcome {
    x: f64,
    flux: f64,
    iters: usize,
    converged: bool,
}

impl Interface<'_> {
    fn upper_flux(&self, x: f64) -> Result<f64, Error> {
        self.upper.flux(self.hu, x)
    }

    fn lower_flux(&self, x: f64) -> Result<f64, Error> {
        self.lower.flux(x, self.hl)
    }

    fn solve(
        &self,
        domain: [f64; 2],
        search: &equation::Config,
        method: InterfaceSearch,
    ) -> Result<Outcome, Error> {
        let residual =
            |x: f64| -> Result<f64, Error> { Ok(self.upper_flux(x)? - self.lower_flux(x)?) };

        let result = match method {
            InterfaceSearch::Bisection => bisection::solve_unobserved(&residual, domain, search),
            InterfaceSearch::FalsePosition => {
                false_position::solve_unobserved(&residual, domain, search)
            }
        };

        match result {
            Ok(Solution {
                status: Status::Converged,
                x,
                iters,
                ..
            }) => Ok(Outcome {
                x,
                flux: self.upper_flux(x)?,
                iters,
                converged: true,
            }),
            Ok(Solution { x, iters, .. }) => self.fallback(x, iters),
            Err(equation::Error::NoBracket {
                left,
                right,
                left_residual,
                right_residual,
            }) => {
                let x = if left_residual.abs() <= right_residual.abs() {
                    left
                } else {
                    right
                };
                self.fallback(x, 0)
            }
            Err(err) => Err(Error::numerical(
                CompositeKey {
                    upper: self.upper.key(),
                    lower: self.lower.key(),
                },
                format!("interface search at ({}, {}) failed: {err}", self.hu, self.hl),
            )),
        }
    }

    /// Best estimate for a row whose search did not converge.
    fn fallback(&self, x: f64, iters: usize) -> Result<Outcome, Error> {
        let (q1, q2) = (self.upper_flux(x)?, self.lower_flux(x)?);
        Ok(Outcome {
            x,
            flux: if q1.abs() <= q2.abs() { q1 } else { q2 },
            iters,
            converged: false,
        })
    }
}
