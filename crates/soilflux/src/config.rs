//! Generator and store configuration.
//!
//! Every config has a [`Default`] with the values used by the reference
//! tables, a `validate` method, and serde support with missing fields taking
//! their defaults. Potentials are in cm, conductivities in cm/day.

use serde::{Deserialize, Serialize};
use soilflux_solvers::{equation, quadrature};
use thiserror::Error;
use uom::si::{f64::Length, length::centimeter};

/// Errors returned by the `validate` methods.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },

    #[error("quadrature config: {0}")]
    Quadrature(#[from] quadrature::ConfigError),

    #[error("interface search config: {0}")]
    Search(#[from] equation::ConfigError),

    #[error("cannot parse config: {0}")]
    Parse(String),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be finite and positive"))
    }
}

/// Adaptive refinement of soil property tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilTableConfig {
    /// Log-spaced intervals between `he` and `hd` before refinement.
    pub initial_intervals: usize,
    /// Flux interpolation tolerance as a fraction of `ks`.
    pub flux_tolerance: f64,
    /// Water content interpolation tolerance as a fraction of `ths`.
    pub theta_tolerance: f64,
    /// Maximum number of refinement passes.
    pub max_passes: usize,
    /// Maximum number of records in one table.
    pub max_records: usize,
}

impl Default for SoilTableConfig {
    fn default() -> Self {
        Self {
            initial_intervals: 16,
            flux_tolerance: 1e-3,
            theta_tolerance: 1e-3,
            max_passes: 24,
            max_records: 20_000,
        }
    }
}

impl SoilTableConfig {
    /// # Errors
    ///
    /// Returns an error if a tolerance is not positive or a limit leaves no
    /// room for a table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_intervals == 0 {
            return Err(ConfigError::invalid("initial_intervals", "must be at least 1"));
        }
        check_positive("flux_tolerance", self.flux_tolerance)?;
        check_positive("theta_tolerance", self.theta_tolerance)?;
        if self.max_records <= self.initial_intervals {
            return Err(ConfigError::invalid(
                "max_records",
                "must exceed initial_intervals",
            ));
        }
        Ok(())
    }
}

/// Serializable mirror of [`quadrature::Config`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadratureConfig {
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_depth: usize,
    pub max_evals: usize,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self::from(quadrature::Config::default())
    }
}

impl From<quadrature::Config> for QuadratureConfig {
    fn from(config: quadrature::Config) -> Self {
        Self {
            abs_tol: config.abs_tol,
            rel_tol: config.rel_tol,
            max_depth: config.max_depth,
            max_evals: config.max_evals,
        }
    }
}

impl From<QuadratureConfig> for quadrature::Config {
    fn from(config: QuadratureConfig) -> Self {
        Self {
            abs_tol: config.abs_tol,
            rel_tol: config.rel_tol,
            max_depth: config.max_depth,
            max_evals: config.max_evals,
        }
    }
}

/// Grid placement and integration for single-layer flux tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluxTableConfig {
    /// Target flux step between neighbouring grid nodes, as a fraction of
    /// `ks · dz` (the matric flux potential per unit thickness).
    pub flux_resolution: f64,
    pub min_grid_points: usize,
    pub max_grid_points: usize,
    pub quadrature: QuadratureConfig,
}

impl Default for FluxTableConfig {
    fn default() -> Self {
        Self {
            flux_resolution: 0.02,
            min_grid_points: 11,
            max_grid_points: 201,
            quadrature: QuadratureConfig::default(),
        }
    }
}

impl FluxTableConfig {
    /// # Errors
    ///
    /// Returns an error if the resolution is not positive, the grid bounds
    /// are inconsistent, or the quadrature config is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("flux_resolution", self.flux_resolution)?;
        if self.min_grid_points < 2 {
            return Err(ConfigError::invalid("min_grid_points", "must be at least 2"));
        }
        if self.max_grid_points < self.min_grid_points {
            return Err(ConfigError::invalid(
                "max_grid_points",
                "must not be below min_grid_points",
            ));
        }
        quadrature::Config::from(self.quadrature).validate()?;
        Ok(())
    }
}

/// Root-finding method used to locate the interface potential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceSearch {
    #[default]
    Bisection,
    FalsePosition,
}

/// Serializable mirror of [`equation::Config`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_iters: usize,
    pub x_abs_tol: f64,
    pub x_rel_tol: f64,
    pub residual_tol: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iters: 100,
            x_abs_tol: 1e-10,
            x_rel_tol: 1e-10,
            residual_tol: 1e-12,
        }
    }
}

impl From<SearchConfig> for equation::Config {
    fn from(config: SearchConfig) -> Self {
        Self {
            max_iters: config.max_iters,
            x_abs_tol: config.x_abs_tol,
            x_rel_tol: config.x_rel_tol,
            residual_tol: config.residual_tol,
        }
    }
}

/// Interface search for two-layer composition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    pub method: InterfaceSearch,
    pub search: SearchConfig,
}

impl ComposeConfig {
    /// # Errors
    ///
    /// Returns an error if the search tolerances are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        equation::Config::from(self.search).validate()?;
        Ok(())
    }
}

/// Configuration of a [`TableStore`](crate::TableStore).
///
/// `dzmin` serializes in metres, the SI base unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Thinnest layer the property tables must resolve.
    pub dzmin: Length,
    /// Evaluate conductivity from the closed form rather than integrating
    /// the retention curve.
    pub k_given: bool,
    pub soil_table: SoilTableConfig,
    pub flux_table: FluxTableConfig,
    pub compose: ComposeConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dzmin: Length::new::<centimeter>(1.0),
            k_given: true,
            soil_table: SoilTableConfig::default(),
            flux_table: FluxTableConfig::default(),
            compose: ComposeConfig::default(),
        }
    }
}

impl StoreConfig {
    /// # Errors
    ///
    /// Returns the first error found in `dzmin` or a nested config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("dzmin", self.dzmin.get::<centimeter>())?;
        self.soil_table.validate()?;
        self.flux_table.validate()?;
        self.compose.validate()
    }

    /// Parses and validates a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any validation
    /// error of the parsed config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
