//! Steady single-layer flux tables.
//!
//! With a constant flux through a layer of thickness `dz`, Darcy's law
//! `q = -K(h) dh/dz` integrates to
//!
//! ```text
//! q(hu, hl) = (Φ(hu) - Φ(hl)) / dz,    Φ(h) = ∫_{hd}^{h} K(h') dh'
//! ```
//!
//! so a table needs only Φ at its grid nodes. Positive flux runs from the
//! upper face to the lower face.

mod diagnostics;
mod grid;

pub use diagnostics::FluxDiagnostics;
pub use grid::{Confidence, FluxGrid, FluxLookup, FluxRecord};

use ndarray::Array2;
use soilflux_solvers::quadrature;

use crate::{
    Error,
    config::FluxTableConfig,
    key::{FluxKey, Thickness},
    soil_table::SoilPropertyTable,
    table_function::TableFunction,
};

/// Flux across one layer for every pair of grid potentials.
///
/// The upper and lower axes share one node set spanning `[hd, he]`.
#[derive(Debug, PartialEq)]
pub struct FluxTable {
    key: FluxKey,
    grid: FluxGrid,
    diagnostics: FluxDiagnostics,
}

impl FluxTable {
    /// Wraps a grid restored from persisted records.
    pub(crate) fn from_grid(key: FluxKey, grid: FluxGrid) -> Result<Self, Error> {
        if grid.upper() != grid.lower() {
            return Err(Error::numerical(key, "upper and lower axes differ"));
        }
        let diagnostics = FluxDiagnostics {
            low_confidence: grid.low_confidence(),
            ..FluxDiagnostics::default()
        };
        Ok(Self {
            key,
            grid,
            diagnostics,
        })
    }

    #[must_use]
    pub fn key(&self) -> FluxKey {
        self.key
    }

    /// Layer thickness.
    #[must_use]
    pub fn dz(&self) -> Thickness {
        self.key.dz
    }

    /// Grid potentials, ascending from `hd` to `he`.
    #[must_use]
    pub fn nodes(&self) -> &[f64] {
        self.grid.upper()
    }

    #[must_use]
    pub fn diagnostics(&self) -> &FluxDiagnostics {
        &self.diagnostics
    }
}

impl FluxLookup for FluxTable {
    fn grid(&self) -> &FluxGrid {
        &self.grid
    }
}

/// Generates the flux table of a layer `dz` thick.
///
/// Nodes sit at equal steps of Φ, estimated by trapezoids over the property
/// records, so the flux between neighbouring nodes changes by about
/// `flux_resolution · ks`. Φ between nodes is then integrated adaptively. A
/// node interval whose integral does not converge keeps its best estimate,
/// and every row spanning it is marked [`Confidence::Low`].
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for a bad config and [`Error::Numerical`]
/// if the table cannot be built at all.
pub fn generate(
    properties: &SoilPropertyTable,
    dz: Thickness,
    config: &FluxTableConfig,
) -> Result<FluxTable, Error> {
    config.validate()?;

    let key = FluxKey {
        soil: properties.params().soil_id,
        dz,
    };
    log::debug!("generating flux table {key}");

    let dz_cm = dz.centimeters();
    let nodes = place_nodes(properties, &key, dz_cm, config)?;

    let integration = quadrature::Config::from(config.quadrature);
    let integrand = |h: f64| properties.conductivity(h);

    let mut phi = Vec::with_capacity(nodes.len());
    let mut unconverged = Vec::with_capacity(nodes.len());
    let mut diagnostics = FluxDiagnostics::default();
    phi.push(0.0);
    unconverged.push(0_usize);

    for pair in nodes.windows(2) {
        let solution = quadrature::integrate(integrand, [pair[0], pair[1]], &integration)
            .map_err(|err| Error::numerical(key, err))?;

        diagnostics.max_evals = diagnostics.max_evals.max(solution.evals);
        diagnostics.max_depth = diagnostics.max_depth.max(solution.depth);

        let failed = usize::from(solution.status != quadrature::Status::Converged);
        phi.push(phi[phi.len() - 1] + solution.value);
        unconverged.push(unconverged[unconverged.len() - 1] + failed);
    }

    let n = nodes.len();
    let flux = Array2::from_shape_fn((n, n), |(i, j)| (phi[i] - phi[j]) / dz_cm);
    let confidence = Array2::from_shape_fn((n, n), |(i, j)| {
        let (lo, hi) = (i.min(j), i.max(j));
        if unconverged[hi] > unconverged[lo] {
            Confidence::Low
        } else {
            Confidence::Converged
        }
    });

    let grid = FluxGrid::new(key.to_string(), nodes.clone(), nodes, flux, confidence)?;
    diagnostics.low_confidence = grid.low_confidence();

    if !diagnostics.is_converged() {
        log::warn!(
            "flux table {key}: {} of {} rows have low confidence",
            diagnostics.low_confidence.len(),
            grid.len()
        );
    }
    log::debug!("flux table {key} has {n} nodes");

    Ok(FluxTable {
        key,
        grid,
        diagnostics,
    })
}

/// Places grid nodes at equal steps of the trapezoidal Φ.
///
/// Returns strictly ascending potentials from `hd` to `he`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn place_nodes(
    properties: &SoilPropertyTable,
    key: &FluxKey,
    dz: f64,
    config: &FluxTableConfig,
) -> Result<Vec<f64>, Error> {
    let [hd, he] = properties.domain();
    let ks = properties.params().ks;

    let records = properties.records();
    let mut potentials = Vec::with_capacity(records.len());
    let mut phi = Vec::with_capacity(records.len());
    let mut total = 0.0;
    potentials.push(hd);
    phi.push(total);
    for pair in records.windows(2).rev() {
        let (wet, dry) = (&pair[0], &pair[1]);
        total += 0.5 * (wet.conductivity + dry.conductivity) * (wet.potential - dry.potential);
        potentials.push(wet.potential);
        phi.push(total);
    }
    if !(total > 0.0) {
        return Err(Error::numerical(key, "flux potential does not increase"));
    }

    let step = config.flux_resolution * ks * dz;
    let wanted = (total / step).ceil() as usize + 1;
    let count = wanted.clamp(config.min_grid_points, config.max_grid_points);

    let inverse =
        TableFunction::new(phi, potentials, false).map_err(|err| Error::numerical(key, err))?;

    let mut nodes = Vec::with_capacity(count);
    nodes.push(hd);
    for j in 1..count - 1 {
        let target = total * j as f64 / (count - 1) as f64;
        let h = inverse
            .evaluate(target)
            .map_err(|err| Error::numerical(key, err))?;
        if h > nodes[nodes.len() - 1] && h < he {
            nodes.push(h);
        }
    }
    nodes.push(he);

    Ok(nodes)
}
