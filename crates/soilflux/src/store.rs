//! Keyed, single-flight storage of generated tables.
//!
//! A [`TableStore`] lives for one simulation run. Every table is generated at
//! most once per key, even under concurrent requests, and is then shared as
//! an immutable `Arc`. Flux tables pull their property tables through the
//! same store, and composites pull their layer tables.

mod single_flight;

use std::sync::Arc;

use uom::si::f64::Length;

use crate::{
    Error,
    compose::{self, CompositeFluxTable},
    config::{ConfigError, StoreConfig},
    flux_table::{self, FluxLookup, FluxTable},
    key::{CompositeKey, FluxKey, PropertyKey, SoilId, Thickness},
    mvg::{SoilCatalog, SoilHydraulicParameters},
    soil_table::{self, ConductivitySource, SoilPropertyTable},
};

use single_flight::SingleFlight;

/// Number of generations each cache has started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationCounts {
    pub property_tables: usize,
    pub flux_tables: usize,
    pub composite_tables: usize,
}

/// Registry of soils and cache of every table derived from them.
pub struct TableStore {
    config: StoreConfig,
    dzmin: Thickness,
    catalog: SoilCatalog,
    properties: SingleFlight<PropertyKey, SoilPropertyTable>,
    fluxes: SingleFlight<FluxKey, FluxTable>,
    composites: SingleFlight<CompositeKey, CompositeFluxTable>,
}

impl TableStore {
    /// Creates an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the config is rejected.
    pub fn new(config: StoreConfig) -> Result<Self, Error> {
        config.validate()?;
        let dzmin = Thickness::from_length(config.dzmin).ok_or(ConfigError::Invalid {
            field: "dzmin",
            reason: "must be between 1 µm and 1 km",
        })?;

        Ok(Self {
            config,
            dzmin,
            catalog: SoilCatalog::new(),
            properties: SingleFlight::default(),
            fluxes: SingleFlight::default(),
            composites: SingleFlight::default(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &SoilCatalog {
        &self.catalog
    }

    /// Validates and registers a soil.
    ///
    /// # Errors
    ///
    /// See [`SoilCatalog::register`].
    pub fn register_soil(
        &self,
        params: SoilHydraulicParameters,
    ) -> Result<Arc<SoilHydraulicParameters>, Error> {
        self.catalog.register(params)
    }

    /// Returns the property table of a registered soil, generating it on a
    /// cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unknown soil or unusable
    /// `dzmin`, and any generation error.
    pub fn soil_property_table(
        &self,
        soil: SoilId,
        dzmin: Length,
        k_given: bool,
    ) -> Result<Arc<SoilPropertyTable>, Error> {
        let key = PropertyKey {
            soil,
            dzmin: thickness(soil, dzmin)?,
            k_given,
        };
        self.property_table_for(key)
    }

    /// Returns the flux table of a layer, generating it (and its property
    /// table, at the configured `dzmin` and `k_given`) on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unknown soil or unusable `dz`,
    /// and any generation error.
    pub fn flux_table(&self, soil: SoilId, dz: Length) -> Result<Arc<FluxTable>, Error> {
        let key = FluxKey {
            soil,
            dz: thickness(soil, dz)?,
        };
        self.flux_table_for(key)
    }

    /// Returns the flux table of `soil1` (upper, `dz1` thick) stacked on
    /// `soil2` (lower, `dz2` thick), generating it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unknown soil or unusable
    /// thickness, and any generation or composition error.
    pub fn composite_flux_table(
        &self,
        soil1: SoilId,
        dz1: Length,
        soil2: SoilId,
        dz2: Length,
    ) -> Result<Arc<CompositeFluxTable>, Error> {
        let key = CompositeKey {
            upper: FluxKey {
                soil: soil1,
                dz: thickness(soil1, dz1)?,
            },
            lower: FluxKey {
                soil: soil2,
                dz: thickness(soil2, dz2)?,
            },
        };

        self.composites.get_or_generate(key, || {
            let upper_params = self.catalog.parameters_for(key.upper.soil)?;
            let lower_params = self.catalog.parameters_for(key.lower.soil)?;
            let upper = self.flux_table_for(key.upper)?;
            let lower = self.flux_table_for(key.lower)?;
            compose::compose(
                &upper,
                &upper_params,
                &lower,
                &lower_params,
                &self.config.compose,
            )
        })
    }

    /// Seeds the cache with a property table, such as one loaded from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheKeyCollision`] if the table's soil is registered
    /// with different parameters or a different table is cached under its
    /// key.
    pub fn preload_soil_property_table(
        &self,
        table: SoilPropertyTable,
    ) -> Result<Arc<SoilPropertyTable>, Error> {
        let key = table.key();
        if let Ok(registered) = self.catalog.parameters_for(key.soil) {
            if *registered != *table.params() {
                log::warn!("preloaded table {key} was built from other parameters");
                return Err(Error::CacheKeyCollision {
                    key: key.to_string(),
                    reason: "table was built from different soil parameters".into(),
                });
            }
        }
        self.properties.preload(key, table)
    }

    /// Seeds the cache with a flux table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheKeyCollision`] if a different table is cached
    /// under its key.
    pub fn preload_flux_table(&self, table: FluxTable) -> Result<Arc<FluxTable>, Error> {
        self.fluxes.preload(table.key(), table)
    }

    /// Seeds the cache with a composite flux table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheKeyCollision`] if a different table is cached
    /// under its key.
    pub fn preload_composite_flux_table(
        &self,
        table: CompositeFluxTable,
    ) -> Result<Arc<CompositeFluxTable>, Error> {
        self.composites.preload(table.key(), table)
    }

    /// Returns a cached property table without generating.
    #[must_use]
    pub fn cached_soil_property_table(&self, key: PropertyKey) -> Option<Arc<SoilPropertyTable>> {
        self.properties.get(key)
    }

    /// Returns a cached flux table without generating.
    #[must_use]
    pub fn cached_flux_table(&self, key: FluxKey) -> Option<Arc<FluxTable>> {
        self.fluxes.get(key)
    }

    /// Returns a cached composite flux table without generating.
    #[must_use]
    pub fn cached_composite_flux_table(
        &self,
        key: CompositeKey,
    ) -> Option<Arc<CompositeFluxTable>> {
        self.composites.get(key)
    }

    pub fn evict_soil_property_table(&self, key: PropertyKey) -> bool {
        self.properties.evict(key)
    }

    pub fn evict_flux_table(&self, key: FluxKey) -> bool {
        self.fluxes.evict(key)
    }

    pub fn evict_composite_flux_table(&self, key: CompositeKey) -> bool {
        self.composites.evict(key)
    }

    /// Number of published or in-flight tables across all three caches.
    #[must_use]
    pub fn cached_table_count(&self) -> usize {
        self.properties.len() + self.fluxes.len() + self.composites.len()
    }

    /// Drops every cached table. Registered soils are kept.
    pub fn clear(&self) {
        let dropped = self.cached_table_count();
        self.properties.clear();
        self.fluxes.clear();
        self.composites.clear();
        log::debug!("table store cleared, {dropped} tables dropped");
    }

    #[must_use]
    pub fn generation_counts(&self) -> GenerationCounts {
        GenerationCounts {
            property_tables: self.properties.generations(),
            flux_tables: self.fluxes.generations(),
            composite_tables: self.composites.generations(),
        }
    }

    fn property_table_for(&self, key: PropertyKey) -> Result<Arc<SoilPropertyTable>, Error> {
        self.properties.get_or_generate(key, || {
            let params = self.catalog.parameters_for(key.soil)?;
            soil_table::generate(
                &params,
                key.dzmin,
                ConductivitySource::from_k_given(key.k_given),
                &self.config.soil_table,
            )
        })
    }

    fn flux_table_for(&self, key: FluxKey) -> Result<Arc<FluxTable>, Error> {
        self.fluxes.get_or_generate(key, || {
            // Unknown soils fail here rather than inside the property cache.
            self.catalog.parameters_for(key.soil)?;
            let properties = self.property_table_for(PropertyKey {
                soil: key.soil,
                dzmin: self.dzmin,
                k_given: self.config.k_given,
            })?;
            flux_table::generate(&properties, key.dz, &self.config.flux_table)
        })
    }
}

/// Interpolated flux of any table for a pair of boundary potentials.
///
/// Never blocks; tables are immutable once published.
///
/// # Errors
///
/// Returns [`Error::OutOfRange`] outside the table's grid.
pub fn query_flux(table: &impl FluxLookup, upper: f64, lower: f64) -> Result<f64, Error> {
    table.flux(upper, lower)
}

fn thickness(soil: SoilId, length: Length) -> Result<Thickness, Error> {
    Thickness::from_length(length).ok_or_else(|| {
        Error::configuration(soil, "layer thickness must be between 1 µm and 1 km")
    })
}
