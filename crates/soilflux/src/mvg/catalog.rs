use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{Error, key::SoilId};

use super::{SoilHydraulicParameters, validate};

/// Registry of validated soil parameter sets keyed by [`SoilId`].
///
/// Registration is idempotent for identical parameters. Registering a
/// different parameter set under an existing id is a key collision, since
/// cached tables are keyed by id alone.
#[derive(Debug, Default)]
pub struct SoilCatalog {
    soils: RwLock<HashMap<SoilId, Arc<SoilHydraulicParameters>>>,
}

impl SoilCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks, validates, and registers a parameter set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] or [`Error::Validation`] if the
    /// parameters are rejected, and [`Error::CacheKeyCollision`] if the id is
    /// already bound to different parameters.
    pub fn register(
        &self,
        params: SoilHydraulicParameters,
    ) -> Result<Arc<SoilHydraulicParameters>, Error> {
        if let Some(existing) = self.get(params.soil_id) {
            return Self::same_or_collision(existing, &params);
        }

        validate(&params)?;

        let mut soils = self.soils.write();
        if let Some(existing) = soils.get(&params.soil_id) {
            return Self::same_or_collision(Arc::clone(existing), &params);
        }
        let params = Arc::new(params);
        soils.insert(params.soil_id, Arc::clone(&params));
        log::debug!("registered soil {}", params.soil_id);
        Ok(params)
    }

    /// Returns the parameters registered under `soil`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the soil is unknown.
    pub fn parameters_for(&self, soil: SoilId) -> Result<Arc<SoilHydraulicParameters>, Error> {
        self.get(soil)
            .ok_or_else(|| Error::configuration(soil, "soil is not registered"))
    }

    #[must_use]
    pub fn contains(&self, soil: SoilId) -> bool {
        self.soils.read().contains_key(&soil)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.soils.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.soils.read().is_empty()
    }

    fn get(&self, soil: SoilId) -> Option<Arc<SoilHydraulicParameters>> {
        self.soils.read().get(&soil).cloned()
    }

    fn same_or_collision(
        existing: Arc<SoilHydraulicParameters>,
        params: &SoilHydraulicParameters,
    ) -> Result<Arc<SoilHydraulicParameters>, Error> {
        if *existing == *params {
            return Ok(existing);
        }
        log::warn!("soil {} re-registered with different parameters", params.soil_id);
        Err(Error::CacheKeyCollision {
            key: format!("soil{}", params.soil_id),
            reason: "soil id is already bound to different parameters".into(),
        })
    }
}
