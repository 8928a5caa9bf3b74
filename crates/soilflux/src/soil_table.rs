//! Soil property tables: water content and conductivity tabulated over
//! potential on an adaptively refined grid.

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    config::SoilTableConfig,
    key::{PropertyKey, Thickness},
    mvg::{self, Mvg, SoilHydraulicParameters},
    table_function::{TableError, TableFunction},
};

/// One tabulated state of the soil.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub theta: f64,
    pub potential: f64,
    pub conductivity: f64,
}

/// How record conductivities are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConductivitySource {
    /// The closed-form conductivity of the constitutive model.
    Closed,
    /// Mualem's integral of the tabulated retention curve.
    Mualem,
}

impl ConductivitySource {
    #[must_use]
    pub fn from_k_given(k_given: bool) -> Self {
        if k_given { Self::Closed } else { Self::Mualem }
    }

    #[must_use]
    pub fn k_given(self) -> bool {
        self == Self::Closed
    }
}

/// Tabulated retention and conductivity of one soil.
///
/// Records run from saturation (`he`, `ths`, `ks`) to the dry end (`hd`),
/// with potential strictly decreasing and water content and conductivity
/// non-increasing. Lookups interpolate linearly between records.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilPropertyTable {
    key: PropertyKey,
    params: SoilHydraulicParameters,
    records: Vec<PropertyRecord>,
    retention: TableFunction,
    conductivity: TableFunction,
}

impl SoilPropertyTable {
    /// Builds a table from existing records, such as persisted ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Numerical`] if the records are not finite, do not
    /// span `[hd, he]` of the soil, or are not monotone.
    pub fn from_records(
        key: PropertyKey,
        params: SoilHydraulicParameters,
        records: Vec<PropertyRecord>,
    ) -> Result<Self, Error> {
        if key.soil != params.soil_id {
            return Err(Error::configuration(
                params.soil_id,
                format!("table {key} belongs to another soil"),
            ));
        }
        check_records(&key, &params, &records)?;

        let dry_first = || records.iter().rev();
        let retention = TableFunction::new(
            dry_first().map(|r| r.potential).collect(),
            dry_first().map(|r| r.theta).collect(),
            false,
        )
        .map_err(|err| Error::numerical(key, err))?;
        let conductivity = TableFunction::new(
            dry_first().map(|r| r.theta).collect(),
            dry_first().map(|r| r.conductivity).collect(),
            false,
        )
        .map_err(|err| Error::numerical(key, err))?;

        Ok(Self {
            key,
            params,
            records,
            retention,
            conductivity,
        })
    }

    #[must_use]
    pub fn key(&self) -> PropertyKey {
        self.key
    }

    #[must_use]
    pub fn params(&self) -> &SoilHydraulicParameters {
        &self.params
    }

    /// Records ordered from saturated to dry.
    #[must_use]
    pub fn records(&self) -> &[PropertyRecord] {
        &self.records
    }

    /// Returns `[hd, he]`.
    #[must_use]
    pub fn domain(&self) -> [f64; 2] {
        [self.params.hd, self.params.he]
    }

    /// Interpolated water content at potential `h`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `h` is outside [`Self::domain`].
    pub fn water_content(&self, h: f64) -> Result<f64, Error> {
        self.lookup(&self.retention, h, "potential")
    }

    /// Interpolated conductivity at potential `h`, looked up through the
    /// water content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `h` is outside [`Self::domain`].
    pub fn conductivity(&self, h: f64) -> Result<f64, Error> {
        let theta = self.water_content(h)?;
        self.lookup(&self.conductivity, theta, "theta")
    }

    fn lookup(&self, f: &TableFunction, v: f64, boundary: &'static str) -> Result<f64, Error> {
        f.evaluate(v).map_err(|err| match err {
            TableError::OutOfRange { x, min, max } => Error::OutOfRange {
                table: self.key.to_string(),
                boundary,
                value: x,
                min,
                max,
            },
            TableError::NonFiniteQuery { x } => Error::OutOfRange {
                table: self.key.to_string(),
                boundary,
                value: x,
                min: f.domain()[0],
                max: f.domain()[1],
            },
            other => Error::numerical(self.key, other),
        })
    }
}

/// Generates the property table of a soil.
///
/// Starts from log-spaced potentials between `he` and `hd` and bisects (in
/// `ln(-h)`) every interval whose linear interpolation misses the model at
/// the midpoint by more than the configured tolerances. The flux tolerance
/// applies to the conductivity error times the interval width over `dzmin`,
/// which bounds the flux error of a layer `dzmin` thick.
///
/// # Errors
///
/// Returns [`Error::Configuration`] or [`Error::Validation`] for bad
/// parameters, [`Error::InvalidConfig`] for a bad config, and
/// [`Error::Numerical`] if refinement does not converge within its limits or
/// the result is not monotone.
pub fn generate(
    params: &SoilHydraulicParameters,
    dzmin: Thickness,
    source: ConductivitySource,
    config: &SoilTableConfig,
) -> Result<SoilPropertyTable, Error> {
    config.validate()?;
    mvg::validate(params)?;
    let model = Mvg::new(params)?;

    let key = PropertyKey {
        soil: params.soil_id,
        dzmin,
        k_given: source.k_given(),
    };
    log::debug!("generating soil property table {key}");

    let potentials = refine(&model, &key, dzmin.centimeters(), config)?;
    let mut records: Vec<PropertyRecord> = potentials
        .iter()
        .map(|&h| PropertyRecord {
            theta: model.water_content(h),
            potential: h,
            conductivity: model.conductivity_at(h),
        })
        .collect();

    if source == ConductivitySource::Mualem {
        apply_mualem(params, &mut records);
    }

    let table = SoilPropertyTable::from_records(key, *params, records)?;
    log::debug!("soil property table {key} has {} records", table.records.len());
    Ok(table)
}

/// Refines the potential grid until every interval meets the tolerances.
///
/// Returns potentials from `he` down to `hd`.
fn refine(
    model: &Mvg,
    key: &PropertyKey,
    dzmin: f64,
    config: &SoilTableConfig,
) -> Result<Vec<f64>, Error> {
    let params = model.params();
    let (wet, dry) = ((-params.he).ln(), (-params.hd).ln());
    let n = config.initial_intervals;

    #[allow(clippy::cast_precision_loss)]
    let mut potentials: Vec<f64> = (0..=n)
        .map(|i| match i {
            0 => params.he,
            i if i == n => params.hd,
            i => -(wet + (dry - wet) * i as f64 / n as f64).exp(),
        })
        .collect();

    let flux_tol = config.flux_tolerance * params.ks;
    let theta_tol = config.theta_tolerance * params.ths;

    for pass in 1..=config.max_passes {
        let mut refined = Vec::with_capacity(2 * potentials.len());
        refined.push(potentials[0]);

        for pair in potentials.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if let Some(mid) = split_point(model, a, b, dzmin, flux_tol, theta_tol) {
                refined.push(mid);
            }
            refined.push(b);
        }

        let splits = refined.len() - potentials.len();
        log::trace!("{key}: pass {pass} split {splits} intervals");

        if refined.len() > config.max_records {
            return Err(Error::numerical(
                key,
                format!(
                    "refinement exceeded {} records on pass {pass}",
                    config.max_records
                ),
            ));
        }
        potentials = refined;
        if splits == 0 {
            return Ok(potentials);
        }
    }

    Err(Error::numerical(
        key,
        format!(
            "refinement did not converge within {} passes",
            config.max_passes
        ),
    ))
}

/// Returns the geometric midpoint of `[b, a]` if the interval must be split.
fn split_point(
    model: &Mvg,
    a: f64,
    b: f64,
    dzmin: f64,
    flux_tol: f64,
    theta_tol: f64,
) -> Option<f64> {
    let mid = -(0.5 * ((-a).ln() + (-b).ln())).exp();
    if !(mid < a && mid > b) {
        return None;
    }

    let fraction = (mid - a) / (b - a);
    let linear = |ya: f64, yb: f64| ya + (yb - ya) * fraction;

    let theta_error = (model.water_content(mid)
        - linear(model.water_content(a), model.water_content(b)))
    .abs();
    let k_error = (model.conductivity_at(mid)
        - linear(model.conductivity_at(a), model.conductivity_at(b)))
    .abs();

    (theta_error > theta_tol || k_error * (a - b) / dzmin > flux_tol).then_some(mid)
}

/// Replaces record conductivities with Mualem's integral of the tabulated
/// retention curve, `K = ks · S^p · (I(S) / I(1))²` with `I(S) = ∫ dS / |h|`
/// accumulated by trapezoids from the dry end, so `K = 0` at the dry end.
fn apply_mualem(params: &SoilHydraulicParameters, records: &mut [PropertyRecord]) {
    let saturation = |r: &PropertyRecord| r.theta / params.ths;
    if records.len() < 2 {
        return;
    }

    let last = records.len() - 1;
    let mut integral = vec![0.0; records.len()];
    for i in (0..last).rev() {
        let (wet, dry) = (&records[i], &records[i + 1]);
        let ds = saturation(wet) - saturation(dry);
        integral[i] =
            integral[i + 1] + 0.5 * ds * (1.0 / wet.potential.abs() + 1.0 / dry.potential.abs());
    }

    let total = integral[0];
    for (record, partial) in records.iter_mut().zip(integral) {
        let ratio = partial / total;
        record.conductivity =
            (params.ks * saturation(record).powf(params.p) * ratio * ratio).clamp(0.0, params.ks);
    }
}

/// Checks that records are finite, span the soil's domain, and are monotone.
fn check_records(
    key: &PropertyKey,
    params: &SoilHydraulicParameters,
    records: &[PropertyRecord],
) -> Result<(), Error> {
    let fail = |reason: String| Err(Error::numerical(key, reason));

    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return fail("table has no records".into());
    };
    if records.len() < 2 {
        return fail("table needs at least two records".into());
    }
    if let Some(i) = records.iter().position(|r| {
        !r.theta.is_finite() || !r.potential.is_finite() || !r.conductivity.is_finite()
    }) {
        return fail(format!("record {i} is not finite"));
    }

    #[allow(clippy::float_cmp)]
    let spans_domain = first.potential == params.he && last.potential == params.hd;
    if !spans_domain {
        return fail(format!(
            "records span [{}, {}], expected [{}, {}]",
            last.potential, first.potential, params.hd, params.he
        ));
    }
    if last.theta <= 0.0 || first.theta > params.ths || last.conductivity < 0.0 {
        return fail("records leave the physical bounds".into());
    }

    if let Some(i) = records.windows(2).position(|pair| {
        pair[1].potential >= pair[0].potential
            || pair[1].theta > pair[0].theta
            || pair[1].conductivity > pair[0].conductivity
    }) {
        return fail(format!("records are not monotone at index {}", i + 1));
    }
    Ok(())
}
