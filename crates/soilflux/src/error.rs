use thiserror::Error;

use crate::{config::ConfigError, key::SoilId};

/// Errors produced while building, caching, or querying soil tables.
///
/// Every variant names the soil or table key involved; table keys encode both
/// the soil identity and the layer thickness.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The hydraulic parameters are physically inconsistent or unknown.
    ///
    /// Raised before any table work begins and never retried.
    #[error("configuration error for soil {soil}: {reason}")]
    Configuration { soil: SoilId, reason: String },

    /// The constitutive model failed its self-check.
    #[error("validation failed for soil {soil}: {reason}")]
    Validation { soil: SoilId, reason: String },

    /// A whole table (or a whole composition) could not be produced.
    ///
    /// Failures of individual rows do not raise this; they are recorded as
    /// low-confidence rows instead.
    #[error("numerical failure building {table}: {reason}")]
    Numerical { table: String, reason: String },

    /// A query point lies outside the table domain.
    #[error("{boundary} = {value} is outside [{min}, {max}] of {table}")]
    OutOfRange {
        table: String,
        boundary: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Two distinct inputs resolved to the same cache key.
    ///
    /// Cannot happen for well-formed input and is treated as fatal.
    #[error("cache key collision on {key}: {reason}")]
    CacheKeyCollision { key: String, reason: String },

    /// A generator or store configuration was rejected.
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Persisted table data could not be read back.
    #[error("malformed persisted table {key}: {reason}")]
    Persist { key: String, reason: String },
}

impl Error {
    /// Returns true for errors caused by the caller's configuration rather
    /// than by numerics or queries.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::Validation { .. }
                | Self::CacheKeyCollision { .. }
                | Self::InvalidConfig(_)
        )
    }

    pub(crate) fn configuration(soil: SoilId, reason: impl Into<String>) -> Self {
        Self::Configuration {
            soil,
            reason: reason.into(),
        }
    }

    pub(crate) fn numerical(table: impl ToString, reason: impl ToString) -> Self {
        Self::Numerical {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }
}
