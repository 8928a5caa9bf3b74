//! Modified Mualem–van Genuchten constitutive model.
//!
//! Retention below the air-entry potential `he`:
//!
//! ```text
//! Sv(h) = (1 + (|h| / hg)^en)^(-em)
//! S(h)  = Sv(h) / Sv(he)
//! θ(h)  = ths · S(h)
//! ```
//!
//! Conductivity, with `F(Sv) = 1 - (1 - Sv^(1/em))^em`:
//!
//! ```text
//! K(h) = ks · S^p · (F(Sv(h)) / F(Sv(he)))²
//! ```
//!
//! Both curves are scaled so that `θ(he) = ths` and `K(he) = ks`, and the soil
//! is saturated for `h >= he`.

mod catalog;
mod params;

pub use catalog::SoilCatalog;
pub use params::SoilHydraulicParameters;

use crate::Error;

/// Number of potentials sampled by [`validate`].
const VALIDATION_SAMPLES: usize = 17;

/// Closed-form evaluation of one soil's retention and conductivity curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mvg {
    params: SoilHydraulicParameters,
    sv_air_entry: f64,
    f_air_entry: f64,
}

impl Mvg {
    /// Prepares the model for a checked parameter set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the parameters are inconsistent.
    pub fn new(params: &SoilHydraulicParameters) -> Result<Self, Error> {
        params.check()?;

        let sv_air_entry = sv(params, params.he);
        Ok(Self {
            params: *params,
            sv_air_entry,
            f_air_entry: mualem(params.em, sv_air_entry),
        })
    }

    #[must_use]
    pub fn params(&self) -> &SoilHydraulicParameters {
        &self.params
    }

    /// Relative saturation `S` at potential `h`, in `(0, 1]`.
    #[must_use]
    pub fn saturation(&self, h: f64) -> f64 {
        if h >= self.params.he {
            1.0
        } else {
            sv(&self.params, h) / self.sv_air_entry
        }
    }

    /// Water content at potential `h`.
    #[must_use]
    pub fn water_content(&self, h: f64) -> f64 {
        self.params.ths * self.saturation(h)
    }

    /// Hydraulic conductivity at potential `h`, in `[0, ks]`.
    #[must_use]
    pub fn conductivity_at(&self, h: f64) -> f64 {
        if h >= self.params.he {
            return self.params.ks;
        }
        let sv_h = sv(&self.params, h);
        self.relative_conductivity(sv_h / self.sv_air_entry, sv_h)
    }

    /// Matric potential for water content `theta`.
    ///
    /// Returns `he` at or above saturation. Suction decreases monotonically
    /// as `theta` increases.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `theta` is not finite, not positive,
    /// or so small that its suction overflows `f64`.
    pub fn potential(&self, theta: f64) -> Result<f64, Error> {
        let SoilHydraulicParameters {
            ths, he, hg, em, en, ..
        } = self.params;

        let out_of_range = || Error::OutOfRange {
            table: format!("soil{}", self.params.soil_id),
            boundary: "theta",
            value: theta,
            min: 0.0,
            max: ths,
        };

        if !theta.is_finite() || theta <= 0.0 {
            return Err(out_of_range());
        }
        if theta >= ths {
            return Ok(he);
        }

        let sv_h = theta / ths * self.sv_air_entry;
        let suction = hg * (sv_h.powf(-1.0 / em) - 1.0).powf(1.0 / en);
        if !suction.is_finite() {
            return Err(out_of_range());
        }
        Ok(-suction.max(-he))
    }

    /// Hydraulic conductivity for water content `theta`, in `[0, ks]`.
    ///
    /// Returns 0 for `theta <= 0` and `ks` at or above saturation.
    #[must_use]
    pub fn conductivity(&self, theta: f64) -> f64 {
        // Written this way so NaN also maps to zero.
        if !(theta > 0.0) {
            return 0.0;
        }
        if theta >= self.params.ths {
            return self.params.ks;
        }
        let s = theta / self.params.ths;
        self.relative_conductivity(s, s * self.sv_air_entry)
    }

    fn relative_conductivity(&self, s: f64, sv_h: f64) -> f64 {
        let SoilHydraulicParameters { ks, p, em, .. } = self.params;
        let ratio = mualem(em, sv_h) / self.f_air_entry;
        (ks * s.powf(p) * ratio * ratio).clamp(0.0, ks)
    }
}

/// Unscaled van Genuchten saturation.
fn sv(params: &SoilHydraulicParameters, h: f64) -> f64 {
    (1.0 + (h.abs() / params.hg).powf(params.en)).powf(-params.em)
}

/// Mualem pore-connectivity integral in closed form.
fn mualem(em: f64, sv: f64) -> f64 {
    1.0 - (1.0 - sv.powf(1.0 / em)).powf(em)
}

/// Self-check of a parameter set, run before any table is generated.
///
/// Samples log-spaced potentials between `he` and `hd` and checks that the
/// curves are finite, bounded, monotone, saturated at `he`, and that
/// `potential` inverts `water_content`.
///
/// # Errors
///
/// Returns [`Error::Configuration`] for inconsistent parameters and
/// [`Error::Validation`] if any check fails.
pub fn validate(params: &SoilHydraulicParameters) -> Result<(), Error> {
    let model = Mvg::new(params)?;
    let soil = params.soil_id;
    let fail = |reason: String| Err(Error::Validation { soil, reason });

    if model.water_content(params.he) != params.ths || model.conductivity_at(params.he) != params.ks
    {
        return fail("curves are not saturated at he".into());
    }

    let (lo, hi) = ((-params.he).ln(), (-params.hd).ln());
    let mut previous = (params.ths, params.ks);

    for i in 0..VALIDATION_SAMPLES {
        let fraction = i as f64 / (VALIDATION_SAMPLES - 1) as f64;
        let h = -(lo + fraction * (hi - lo)).exp();
        let theta = model.water_content(h);
        let k = model.conductivity_at(h);

        if !theta.is_finite() || theta <= 0.0 || theta > params.ths {
            return fail(format!("water content {theta} out of (0, ths] at h = {h}"));
        }
        if !k.is_finite() || k < 0.0 || k > params.ks {
            return fail(format!("conductivity {k} out of [0, ks] at h = {h}"));
        }
        if theta > previous.0 || k > previous.1 {
            return fail(format!("curves are not monotone at h = {h}"));
        }

        let back = model.potential(theta)?;
        if (back - h).abs() > 1e-6 * h.abs() + 1e-9 {
            return fail(format!("potential({theta}) = {back}, expected {h}"));
        }

        let via_theta = model.conductivity(theta);
        if (via_theta - k).abs() > 1e-6 * params.ks {
            return fail(format!(
                "conductivity({theta}) = {via_theta} disagrees with K(h) = {k}"
            ));
        }

        previous = (theta, k);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::key::SoilId;

    fn loam() -> SoilHydraulicParameters {
        SoilHydraulicParameters::new(SoilId(103), 0.4, 2.0, -2.0, -10.0, 1.0 / 3.0, 1.0)
    }

    fn clay() -> SoilHydraulicParameters {
        SoilHydraulicParameters::new(SoilId(109), 0.6, 0.2, -2.0, -40.0, 1.0 / 9.0, 1.0)
    }

    #[test]
    fn saturated_at_and_above_air_entry() {
        let model = Mvg::new(&loam()).expect("valid params");
        for h in [-2.0, -1.0, 0.0, 3.0] {
            assert_eq!(model.water_content(h), 0.4);
            assert_eq!(model.conductivity_at(h), 2.0);
        }
        assert_eq!(model.potential(0.4), Ok(-2.0));
        assert_eq!(model.potential(0.45), Ok(-2.0));
        assert_eq!(model.conductivity(0.4), 2.0);
    }

    #[test]
    fn water_content_matches_closed_form() {
        let model = Mvg::new(&loam()).expect("valid params");
        // Sv(-10) / Sv(-2) with en = 2, em = 0.5
        let expected = 0.4 * (5.0_f64 / 101.0).sqrt();
        assert_relative_eq!(model.water_content(-10.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn potential_inverts_water_content() {
        let model = Mvg::new(&clay()).expect("valid params");
        for h in [-2.5, -4.0, -10.0, -25.0, -40.0] {
            let theta = model.water_content(h);
            let back = model.potential(theta).expect("positive theta");
            assert_relative_eq!(back, h, max_relative = 1e-9);
        }
    }

    #[test]
    fn potential_rises_with_water_content() {
        let model = Mvg::new(&loam()).expect("valid params");
        let mut previous = f64::NEG_INFINITY;
        for i in 1..=40 {
            let theta = 0.01 * f64::from(i);
            let h = model.potential(theta).expect("positive theta");
            assert!(h.is_finite());
            assert!(h >= previous, "h({theta}) = {h} < {previous}");
            previous = h;
        }
    }

    #[test]
    fn potential_rejects_non_positive_theta() {
        let model = Mvg::new(&loam()).expect("valid params");
        assert!(matches!(
            model.potential(0.0),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            model.potential(f64::NAN),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn potential_stays_finite_for_tiny_theta() {
        let model = Mvg::new(&loam()).expect("valid params");
        for theta in [1e-3, 1e-50, 1e-100] {
            let h = model.potential(theta).expect("representable suction");
            assert!(h.is_finite() && h < -10.0, "h({theta}) = {h}");
        }
        for theta in [1e-160, 1e-200, f64::MIN_POSITIVE] {
            assert!(
                matches!(
                    model.potential(theta),
                    Err(Error::OutOfRange {
                        boundary: "theta",
                        ..
                    })
                ),
                "theta = {theta}"
            );
        }
    }

    #[test]
    fn conductivity_is_bounded_and_monotone() {
        let model = Mvg::new(&clay()).expect("valid params");
        assert_eq!(model.conductivity(0.0), 0.0);
        assert_eq!(model.conductivity(-0.1), 0.0);
        assert_eq!(model.conductivity(f64::NAN), 0.0);

        let mut previous = 0.0;
        for i in 1..=60 {
            let theta = 0.01 * f64::from(i);
            let k = model.conductivity(theta);
            assert!((0.0..=0.2).contains(&k), "K({theta}) = {k}");
            assert!(k >= previous);
            previous = k;
        }
    }

    #[test]
    fn conductivity_paths_agree() {
        let model = Mvg::new(&loam()).expect("valid params");
        for h in [-2.2, -3.0, -6.0, -9.5] {
            let theta = model.water_content(h);
            assert_relative_eq!(
                model.conductivity(theta),
                model.conductivity_at(h),
                max_relative = 1e-10
            );
        }
    }

    #[test]
    fn validate_accepts_reference_soils() {
        assert_eq!(validate(&loam()), Ok(()));
        assert_eq!(validate(&clay()), Ok(()));
        assert_eq!(validate(&loam().with_shape(0.3, 1.6)), Ok(()));
    }

    #[test]
    fn validate_reports_configuration_errors() {
        let params = SoilHydraulicParameters { ks: -1.0, ..loam() };
        assert!(matches!(
            validate(&params),
            Err(Error::Configuration { .. })
        ));
    }
}
