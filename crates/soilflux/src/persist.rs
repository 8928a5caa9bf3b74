//! Record-list exchange form of tables, for reuse across runs.
//!
//! Tables are written as their key string plus ordered records and read back
//! through the same validation as freshly generated tables.

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    compose::CompositeFluxTable,
    flux_table::{FluxGrid, FluxLookup, FluxRecord, FluxTable},
    key::{CompositeKey, FluxKey, PropertyKey},
    mvg::SoilHydraulicParameters,
    soil_table::{PropertyRecord, SoilPropertyTable},
};

/// Persisted soil property table, records ordered saturated to dry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSoilPropertyTable {
    pub key: String,
    pub records: Vec<PropertyRecord>,
}

/// Persisted single-layer or composite flux table, records ordered upper
/// ascending then lower ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedFluxTable {
    pub key: String,
    pub records: Vec<FluxRecord>,
}

impl From<&SoilPropertyTable> for PersistedSoilPropertyTable {
    fn from(table: &SoilPropertyTable) -> Self {
        Self {
            key: table.key().to_string(),
            records: table.records().to_vec(),
        }
    }
}

impl PersistedSoilPropertyTable {
    /// Rebuilds the table for the soil it was generated from.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persist`] for a malformed key or records, and
    /// [`Error::Configuration`] if `params` belong to another soil.
    pub fn into_table(self, params: &SoilHydraulicParameters) -> Result<SoilPropertyTable, Error> {
        let key: PropertyKey = self.key.parse().map_err(|err| persist(&self.key, err))?;
        SoilPropertyTable::from_records(key, *params, self.records).map_err(|err| match err {
            Error::Numerical { reason, .. } => persist(&self.key, reason),
            other => other,
        })
    }

    /// # Errors
    ///
    /// Returns [`Error::Persist`] if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|err| persist(&self.key, err))
    }

    /// # Errors
    ///
    /// Returns [`Error::Persist`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|err| persist("<json>", err))
    }
}

impl From<&FluxTable> for PersistedFluxTable {
    fn from(table: &FluxTable) -> Self {
        Self::of(table.key().to_string(), table)
    }
}

impl From<&CompositeFluxTable> for PersistedFluxTable {
    fn from(table: &CompositeFluxTable) -> Self {
        Self::of(table.key().to_string(), table)
    }
}

impl PersistedFluxTable {
    fn of(key: String, table: &impl FluxLookup) -> Self {
        Self {
            key,
            records: table.grid().records().collect(),
        }
    }

    /// Returns true if the key names a two-layer composite.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.key.contains('_')
    }

    /// Rebuilds a single-layer flux table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persist`] for a malformed key or records.
    pub fn into_flux_table(self) -> Result<FluxTable, Error> {
        let key: FluxKey = self.key.parse().map_err(|err| persist(&self.key, err))?;
        let grid = self.grid()?;
        FluxTable::from_grid(key, grid).map_err(|err| persist(&self.key, err))
    }

    /// Rebuilds a composite flux table. Interface potentials are not
    /// persisted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persist`] for a malformed key or records.
    pub fn into_composite(self) -> Result<CompositeFluxTable, Error> {
        let key: CompositeKey = self.key.parse().map_err(|err| persist(&self.key, err))?;
        let grid = self.grid()?;
        Ok(CompositeFluxTable::from_grid(key, grid))
    }

    /// # Errors
    ///
    /// Returns [`Error::Persist`] if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|err| persist(&self.key, err))
    }

    /// # Errors
    ///
    /// Returns [`Error::Persist`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|err| persist("<json>", err))
    }

    fn grid(&self) -> Result<FluxGrid, Error> {
        FluxGrid::from_records(self.key.clone(), &self.records)
            .map_err(|err| persist(&self.key, err))
    }
}

fn persist(key: &str, reason: impl ToString) -> Error {
    Error::Persist {
        key: key.to_owned(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        compose,
        config::{ComposeConfig, FluxTableConfig, SoilTableConfig},
        flux_table::{self, Confidence},
        key::{SoilId, Thickness},
        soil_table::{self, ConductivitySource},
    };

    fn loam() -> SoilHydraulicParameters {
        SoilHydraulicParameters::new(SoilId(103), 0.4, 2.0, -2.0, -10.0, 1.0 / 3.0, 1.0)
    }

    fn properties() -> SoilPropertyTable {
        soil_table::generate(
            &loam(),
            Thickness::from_centimeters(1.0).expect("valid thickness"),
            ConductivitySource::Closed,
            &SoilTableConfig::default(),
        )
        .expect("property table generates")
    }

    fn flux() -> FluxTable {
        flux_table::generate(
            &properties(),
            Thickness::from_centimeters(5.0).expect("valid thickness"),
            &FluxTableConfig::default(),
        )
        .expect("flux table generates")
    }

    #[test]
    fn property_table_survives_json() {
        let table = properties();
        let json = PersistedSoilPropertyTable::from(&table)
            .to_json()
            .expect("serializes");
        let restored = PersistedSoilPropertyTable::from_json(&json)
            .expect("parses")
            .into_table(&loam())
            .expect("rebuilds");
        assert_eq!(restored, table);
    }

    #[test]
    fn flux_table_survives_json() {
        let table = flux();
        let persisted = PersistedFluxTable::from(&table);
        assert!(!persisted.is_composite());
        assert_eq!(persisted.key, "soil103dz50");
        assert_eq!(persisted.records[0].confidence, Confidence::Converged);

        let json = persisted.to_json().expect("serializes");
        let restored = PersistedFluxTable::from_json(&json)
            .expect("parses")
            .into_flux_table()
            .expect("rebuilds");
        assert_eq!(restored.grid(), table.grid());
        assert_eq!(restored.key(), table.key());
    }

    #[test]
    fn composite_survives_json() {
        let table = flux();
        let composite = compose::compose(&table, &loam(), &table, &loam(), &ComposeConfig::default())
            .expect("composes");
        let persisted = PersistedFluxTable::from(&composite);
        assert!(persisted.is_composite());

        let json = persisted.to_json().expect("serializes");
        let restored = PersistedFluxTable::from_json(&json)
            .expect("parses")
            .into_composite()
            .expect("rebuilds");
        assert_eq!(restored.grid(), composite.grid());
        assert!(restored.interfaces().is_none());
    }

    #[test]
    fn malformed_input_is_a_persist_error() {
        assert!(matches!(
            PersistedFluxTable::from_json("{\"key\": 3}"),
            Err(Error::Persist { .. })
        ));

        let mut persisted = PersistedFluxTable::from(&flux());
        persisted.records.pop();
        assert!(matches!(
            persisted.into_flux_table(),
            Err(Error::Persist { .. })
        ));

        let persisted = PersistedFluxTable {
            key: "soil103".into(),
            records: Vec::new(),
        };
        assert!(matches!(
            persisted.into_flux_table(),
            Err(Error::Persist { .. })
        ));

        let mut persisted = PersistedSoilPropertyTable::from(&properties());
        persisted.records.reverse();
        assert!(matches!(
            persisted.into_table(&loam()),
            Err(Error::Persist { .. })
        ));
    }
}
