//! Structured cache keys.
//!
//! Thickness is quantized to whole micrometres when a key is formed, so two
//! requests for the "same" thickness always agree on the key and on the
//! thickness used for generation. The string forms are the external
//! identifiers of persisted tables and round-trip exactly. Parsing accepts
//! only the canonical form, so zero-padded strings such as `soil0103dz0050`
//! are rejected rather than silently normalized.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uom::si::{
    f64::Length,
    length::{centimeter, micrometer},
};

/// Error returned when a key string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse key `{input}`: {reason}")]
pub struct KeyParseError {
    pub input: String,
    pub reason: &'static str,
}

impl KeyParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_owned(),
            reason,
        }
    }
}

/// Identity of a soil hydraulic parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SoilId(pub u32);

impl fmt::Display for SoilId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SoilId {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(KeyParseError::new(s, "soil id must be a decimal integer"));
        }
        if s.len() > 1 && s.starts_with('0') {
            return Err(KeyParseError::new(s, "soil id has leading zeros"));
        }
        s.parse()
            .map(SoilId)
            .map_err(|_| KeyParseError::new(s, "soil id out of range"))
    }
}

/// A layer thickness quantized to whole micrometres.
///
/// Displays in millimetres (`5 cm` → `50`, `2.5 mm` → `2.5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Thickness {
    micrometres: u64,
}

impl Thickness {
    /// Largest representable thickness (1 km); larger values are rejected.
    const MAX_MICROMETRES: u64 = 1_000_000_000;

    /// Quantizes a length, returning `None` unless it is finite and at least
    /// one micrometre after rounding.
    #[must_use]
    pub fn from_length(length: Length) -> Option<Self> {
        Self::from_micrometres_f64(length.get::<micrometer>())
    }

    /// Quantizes a thickness given in centimetres.
    #[must_use]
    pub fn from_centimeters(cm: f64) -> Option<Self> {
        Self::from_micrometres_f64(cm * 10_000.0)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from_micrometres_f64(um: f64) -> Option<Self> {
        if !um.is_finite() {
            return None;
        }
        let rounded = um.round();
        if rounded < 1.0 || rounded > Self::MAX_MICROMETRES as f64 {
            return None;
        }
        Some(Self {
            micrometres: rounded as u64,
        })
    }

    /// Returns the thickness in whole micrometres.
    #[must_use]
    pub fn micrometres(self) -> u64 {
        self.micrometres
    }

    /// Returns the thickness in centimetres.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn centimeters(self) -> f64 {
        self.micrometres as f64 / 10_000.0
    }

    /// Returns the thickness as a length.
    #[must_use]
    pub fn length(self) -> Length {
        Length::new::<centimeter>(self.centimeters())
    }
}

impl fmt::Display for Thickness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.micrometres / 1000;
        let frac = self.micrometres % 1000;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:03}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Thickness {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));

        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !is_digits(whole) || !is_digits(frac) {
            return Err(KeyParseError::new(s, "thickness must be a decimal in mm"));
        }
        if whole.len() > 1 && whole.starts_with('0') {
            return Err(KeyParseError::new(s, "thickness has leading zeros"));
        }
        if s.contains('.') && (frac.is_empty() || frac.len() > 3 || frac.ends_with('0')) {
            return Err(KeyParseError::new(
                s,
                "thickness fraction must have 1-3 significant digits",
            ));
        }

        let whole: u64 = whole
            .parse()
            .map_err(|_| KeyParseError::new(s, "thickness out of range"))?;
        let frac: u64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<3}")
                .parse()
                .map_err(|_| KeyParseError::new(s, "thickness out of range"))?
        };

        let micrometres = whole
            .checked_mul(1000)
            .and_then(|um| um.checked_add(frac))
            .filter(|um| (1..=Self::MAX_MICROMETRES).contains(um))
            .ok_or_else(|| KeyParseError::new(s, "thickness out of range"))?;

        Ok(Self { micrometres })
    }
}

/// Key of a soil property table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    pub soil: SoilId,
    pub dzmin: Thickness,
    pub k_given: bool,
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "soil{}dzmin{}k{}",
            self.soil,
            self.dzmin,
            u8::from(self.k_given)
        )
    }
}

impl FromStr for PropertyKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("soil")
            .ok_or_else(|| KeyParseError::new(s, "missing `soil` prefix"))?;
        let (soil, rest) = rest
            .split_once("dzmin")
            .ok_or_else(|| KeyParseError::new(s, "missing `dzmin` marker"))?;
        let (dzmin, flag) = rest
            .rsplit_once('k')
            .ok_or_else(|| KeyParseError::new(s, "missing `k` flag"))?;
        let k_given = match flag {
            "0" => false,
            "1" => true,
            _ => return Err(KeyParseError::new(s, "`k` flag must be 0 or 1")),
        };

        Ok(Self {
            soil: soil.parse()?,
            dzmin: dzmin.parse()?,
            k_given,
        })
    }
}

/// Key of a single-layer flux table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FluxKey {
    pub soil: SoilId,
    pub dz: Thickness,
}

impl fmt::Display for FluxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "soil{}dz{}", self.soil, self.dz)
    }
}

impl FromStr for FluxKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("soil")
            .ok_or_else(|| KeyParseError::new(s, "missing `soil` prefix"))?;
        let (soil, dz) = rest
            .split_once("dz")
            .ok_or_else(|| KeyParseError::new(s, "missing `dz` marker"))?;

        Ok(Self {
            soil: soil.parse()?,
            dz: dz.parse()?,
        })
    }
}

/// Key of a two-layer composite flux table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    pub upper: FluxKey,
    pub lower: FluxKey,
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.upper, self.lower)
    }
}

impl FromStr for CompositeKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (upper, lower) = s
            .split_once('_')
            .ok_or_else(|| KeyParseError::new(s, "missing `_` separator"))?;

        Ok(Self {
            upper: upper.parse()?,
            lower: lower.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn thickness(cm: f64) -> Thickness {
        Thickness::from_centimeters(cm).expect("valid thickness")
    }

    #[test]
    fn flux_key_uses_tenfold_thickness() {
        let key = FluxKey {
            soil: SoilId(103),
            dz: thickness(5.0),
        };
        assert_eq!(key.to_string(), "soil103dz50");
        assert_eq!("soil103dz50".parse::<FluxKey>(), Ok(key));
    }

    #[test]
    fn fractional_thickness_round_trips() {
        for (cm, text) in [(0.25, "2.5"), (0.3, "3"), (1.2345, "12.345"), (0.0001, "0.001")] {
            let dz = thickness(cm);
            assert_eq!(dz.to_string(), text);
            assert_eq!(text.parse::<Thickness>(), Ok(dz));
        }
    }

    #[test]
    fn nearby_lengths_share_a_key() {
        let a = Thickness::from_length(Length::new::<centimeter>(0.3)).expect("valid");
        let b = thickness(0.1 + 0.2);
        assert_eq!(a, b);
        assert_relative_eq!(a.centimeters(), 0.3);
    }

    #[test]
    fn rejects_degenerate_thickness() {
        assert!(Thickness::from_centimeters(0.0).is_none());
        assert!(Thickness::from_centimeters(-5.0).is_none());
        assert!(Thickness::from_centimeters(f64::NAN).is_none());
        assert!("".parse::<Thickness>().is_err());
        assert!("5.".parse::<Thickness>().is_err());
        assert!("5.10".parse::<Thickness>().is_err());
        assert!("-5".parse::<Thickness>().is_err());
        assert!("0".parse::<Thickness>().is_err());
    }

    #[test]
    fn property_key_round_trips() {
        let key = PropertyKey {
            soil: SoilId(109),
            dzmin: thickness(1.0),
            k_given: true,
        };
        assert_eq!(key.to_string(), "soil109dzmin10k1");
        assert_eq!(key.to_string().parse::<PropertyKey>(), Ok(key));
        assert!("soil109dzmin10k2".parse::<PropertyKey>().is_err());
    }

    #[test]
    fn composite_key_round_trips() {
        let key = CompositeKey {
            upper: FluxKey {
                soil: SoilId(103),
                dz: thickness(5.0),
            },
            lower: FluxKey {
                soil: SoilId(109),
                dz: thickness(10.0),
            },
        };
        assert_eq!(key.to_string(), "soil103dz50_soil109dz100");
        assert_eq!(key.to_string().parse::<CompositeKey>(), Ok(key));
    }

    #[test]
    fn flux_key_rejects_property_key() {
        assert!("soil103dzmin10k1".parse::<FluxKey>().is_err());
        assert!("103dz50".parse::<FluxKey>().is_err());
        assert!("soildz50".parse::<FluxKey>().is_err());
    }

    #[test]
    fn zero_padded_keys_are_rejected() {
        assert!("soil0103dz0050".parse::<FluxKey>().is_err());
        assert!("soil0103dz50".parse::<FluxKey>().is_err());
        assert!("soil103dz050".parse::<FluxKey>().is_err());
        assert!("00.5".parse::<Thickness>().is_err());
        assert!(
            "soil0103dz0050_soil0109dz0100"
                .parse::<CompositeKey>()
                .is_err()
        );

        assert_eq!("0".parse::<SoilId>(), Ok(SoilId(0)));
        let dz: Thickness = "0.5".parse().expect("canonical thickness");
        assert_eq!(dz.to_string(), "0.5");
        for text in ["soil103dz50", "soil0dz2.5"] {
            let key: FluxKey = text.parse().expect("canonical key");
            assert_eq!(key.to_string(), text);
        }
    }
}
