//! Precomputed steady-state water flux tables for unsaturated soil layers.
//!
//! A layer's steady flux depends only on its soil, its thickness, and the
//! potentials at its two faces, so it can be tabulated once per run and then
//! read by interpolation at every time step:
//!
//! - [`mvg`]: the constitutive model, giving water content and conductivity as
//!   functions of potential, plus the soil registry
//! - [`soil_table`]: adaptively refined property tables of one soil
//! - [`flux_table`]: flux across one layer for a grid of face potentials
//! - [`compose`]: flux across two stacked layers
//! - [`store`]: keyed, single-flight cache of all of the above
//! - [`persist`]: record-list exchange form of tables
//!
//! Potentials are in cm of water (negative when unsaturated), conductivity
//! and flux in cm/day with positive flux downward, and thickness is a
//! [`uom`] length at the public boundary.
//!
//! ```no_run
//! use soilflux::{SoilHydraulicParameters, SoilId, StoreConfig, TableStore, query_flux};
//! use uom::si::{f64::Length, length::centimeter};
//!
//! let store = TableStore::new(StoreConfig::default())?;
//! store.register_soil(SoilHydraulicParameters::new(
//!     SoilId(103), 0.4, 2.0, -2.0, -10.0, 1.0 / 3.0, 1.0,
//! ))?;
//!
//! let table = store.flux_table(SoilId(103), Length::new::<centimeter>(5.0))?;
//! let q = query_flux(&*table, -3.0, -8.0)?;
//! assert!(q > 0.0);
//! # Ok::<(), soilflux::Error>(())
//! ```

mod error;

pub mod compose;
pub mod config;
pub mod flux_table;
pub mod key;
pub mod mvg;
pub mod persist;
pub mod soil_table;
pub mod store;
pub mod table_function;

pub use compose::CompositeFluxTable;
pub use config::{
    ComposeConfig, ConfigError, FluxTableConfig, InterfaceSearch, QuadratureConfig, SearchConfig,
    SoilTableConfig, StoreConfig,
};
pub use error::Error;
pub use flux_table::{Confidence, FluxDiagnostics, FluxLookup, FluxTable};
pub use key::{CompositeKey, FluxKey, PropertyKey, SoilId, Thickness};
pub use mvg::{Mvg, SoilCatalog, SoilHydraulicParameters};
pub use soil_table::{ConductivitySource, SoilPropertyTable};
pub use store::{GenerationCounts, TableStore, query_flux};
pub use table_function::{TableError, TableFunction};
