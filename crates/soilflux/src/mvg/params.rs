use serde::{Deserialize, Serialize};

use crate::{Error, key::SoilId};

/// Hydraulic description of one soil.
///
/// Potentials are in cm of water head and negative when unsaturated;
/// conductivity is in cm/day; water content is a volume fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilHydraulicParameters {
    pub soil_id: SoilId,
    /// Saturated water content.
    pub ths: f64,
    /// Saturated hydraulic conductivity.
    pub ks: f64,
    /// Air-entry potential; the soil is saturated above it.
    pub he: f64,
    /// Dry-end potential; tables span `[hd, he]`.
    pub hd: f64,
    /// Pore-connectivity exponent applied to relative saturation in the
    /// conductivity relation.
    pub p: f64,
    /// Characteristic potential scaling the retention curve.
    pub hg: f64,
    /// Retention shape exponent `m`.
    pub em: f64,
    /// Retention shape exponent `n`.
    pub en: f64,
}

impl SoilHydraulicParameters {
    /// Shape exponent `n` used when none is given.
    pub const DEFAULT_EN: f64 = 2.0;

    /// Creates a parameter set with the Mualem-constrained default shape
    /// (`en = 2`, `em = 1 - 1/en`).
    #[must_use]
    pub fn new(soil_id: SoilId, ths: f64, ks: f64, he: f64, hd: f64, p: f64, hg: f64) -> Self {
        Self {
            soil_id,
            ths,
            ks,
            he,
            hd,
            p,
            hg,
            em: 1.0 - 1.0 / Self::DEFAULT_EN,
            en: Self::DEFAULT_EN,
        }
    }

    /// Returns a copy with explicit retention shape exponents.
    #[must_use]
    pub fn with_shape(self, em: f64, en: f64) -> Self {
        Self { em, en, ..self }
    }

    /// Checks that the parameters describe a physically consistent soil.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first violated constraint.
    pub fn check(&self) -> Result<(), Error> {
        let fail = |reason: &str| Err(Error::configuration(self.soil_id, reason));

        let values = [
            self.ths, self.ks, self.he, self.hd, self.p, self.hg, self.em, self.en,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return fail("all parameters must be finite");
        }
        if self.ths <= 0.0 || self.ths > 1.0 {
            return fail("ths must lie in (0, 1]");
        }
        if self.ks <= 0.0 {
            return fail("ks must be positive");
        }
        if self.he >= 0.0 {
            return fail("he must be negative");
        }
        if self.hd >= self.he {
            return fail("hd must be below he");
        }
        if self.hg <= 0.0 {
            return fail("hg must be positive");
        }
        if self.p < 0.0 {
            return fail("p must be non-negative");
        }
        if self.em <= 0.0 || self.em >= 1.0 {
            return fail("em must lie in (0, 1)");
        }
        if self.en <= 1.0 {
            return fail("en must exceed 1");
        }
        Ok(())
    }
}
