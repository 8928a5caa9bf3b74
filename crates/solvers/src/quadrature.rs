//! Adaptive Simpson quadrature with a bounded evaluation budget.
//!
//! The integrator subdivides only where the Simpson estimate disagrees with
//! its two halves, so piecewise-smooth integrands (such as tabulated
//! conductivity curves with kinks at their knots) are resolved without
//! refining the smooth parts.

mod config;
mod error;
mod solution;

use std::error::Error as StdError;

pub use config::{Config, ConfigError};
pub use error::Error;
pub use solution::{Solution, Status};

/// Integrates `f` over `bounds`.
///
/// When the depth or evaluation budget runs out the best available estimate
/// is still returned, with a status other than [`Status::Converged`].
///
/// # Errors
///
/// Returns an error if the config or bounds are invalid, or if `f` fails or
/// returns a non-finite value.
pub fn integrate<F, E>(f: F, bounds: [f64; 2], config: &Config) -> Result<Solution, Error>
where
    F: Fn(f64) -> Result<f64, E>,
    E: StdError + Send + Sync + 'static,
{
    config.validate()?;

    let [a, b] = bounds;
    if !a.is_finite() || !b.is_finite() {
        return Err(Error::NonFiniteBounds { a, b });
    }

    #[allow(clippy::float_cmp)]
    if a == b {
        return Ok(Solution {
            value: 0.0,
            error_estimate: 0.0,
            status: Status::Converged,
            evals: 0,
            depth: 0,
        });
    }

    let mut run = Run {
        f: &f,
        config,
        evals: 0,
        depth: 0,
        status: Status::Converged,
        error_estimate: 0.0,
    };

    let fa = run.eval(a)?;
    let fb = run.eval(b)?;
    let m = 0.5 * (a + b);
    let fm = run.eval(m)?;
    let whole = simpson(a, b, fa, fm, fb);
    let tol = config.abs_tol.max(config.rel_tol * whole.abs());

    let value = run.refine(Panel { a, b, fa, fm, fb, whole }, tol, 0)?;

    Ok(Solution {
        value,
        error_estimate: run.error_estimate,
        status: run.status,
        evals: run.evals,
        depth: run.depth,
    })
}

/// A Simpson panel with cached endpoint and midpoint values.
#[derive(Debug, Clone, Copy)]
struct Panel {
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
}

/// Mutable bookkeeping for one integration.
struct Run<'a, F> {
    f: &'a F,
    config: &'a Config,
    evals: usize,
    depth: usize,
    status: Status,
    error_estimate: f64,
}

impl<F, E> Run<'_, F>
where
    F: Fn(f64) -> Result<f64, E>,
    E: StdError + Send + Sync + 'static,
{
    fn eval(&mut self, x: f64) -> Result<f64, Error> {
        self.evals += 1;
        let value = (self.f)(x).map_err(|err| Error::Integrand(Box::new(err)))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::NonFiniteIntegrand { x, value })
        }
    }

    fn refine(&mut self, panel: Panel, tol: f64, depth: usize) -> Result<f64, Error> {
        let Panel { a, b, fa, fm, fb, whole } = panel;
        let m = 0.5 * (a + b);
        let flm = self.eval(0.5 * (a + m))?;
        let frm = self.eval(0.5 * (m + b))?;
        let left = simpson(a, m, fa, flm, fm);
        let right = simpson(m, b, fm, frm, fb);
        let delta = left + right - whole;

        self.depth = self.depth.max(depth);

        if delta.abs() <= 15.0 * tol {
            self.error_estimate += delta.abs() / 15.0;
            return Ok(left + right + delta / 15.0);
        }

        if depth >= self.config.max_depth {
            self.status = Status::MaxDepth;
            self.error_estimate += delta.abs() / 15.0;
            return Ok(left + right + delta / 15.0);
        }

        if self.evals >= self.config.max_evals {
            self.status = Status::MaxEvals;
            self.error_estimate += delta.abs() / 15.0;
            return Ok(left + right + delta / 15.0);
        }

        let left_value = self.refine(
            Panel {
                a,
                b: m,
                fa,
                fm: flm,
                fb: fm,
                whole: left,
            },
            0.5 * tol,
            depth + 1,
        )?;
        let right_value = self.refine(
            Panel {
                a: m,
                b,
                fa: fm,
                fm: frm,
                fb,
                whole: right,
            },
            0.5 * tol,
            depth + 1,
        )?;

        Ok(left_value + right_value)
    }
}

/// Simpson's rule on `[a, b]` given the endpoint and midpoint values.
fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    use approx::assert_relative_eq;

    fn ok(f: impl Fn(f64) -> f64) -> impl Fn(f64) -> Result<f64, Infallible> {
        move |x| Ok(f(x))
    }

    #[test]
    fn cubic_is_exact() {
        let solution = integrate(ok(|x| x * x * x - x), [0.0, 2.0], &Config::default())
            .expect("should integrate");

        assert_eq!(solution.status, Status::Converged);
        assert_relative_eq!(solution.value, 2.0, epsilon = 1e-12);
        assert_eq!(solution.evals, 5);
    }

    #[test]
    fn reversed_bounds_flip_sign() {
        let forward = integrate(ok(f64::exp), [0.0, 1.0], &Config::default())
            .expect("should integrate");
        let backward = integrate(ok(f64::exp), [1.0, 0.0], &Config::default())
            .expect("should integrate");

        assert_relative_eq!(forward.value, 1.0_f64.exp() - 1.0, epsilon = 1e-9);
        assert_relative_eq!(forward.value, -backward.value, epsilon = 1e-12);
    }

    #[test]
    fn resolves_kinked_integrand() {
        let solution = integrate(ok(|x: f64| (x - 0.3).abs()), [0.0, 1.0], &Config::default())
            .expect("should integrate");

        assert_eq!(solution.status, Status::Converged);
        assert_relative_eq!(solution.value, 0.045 + 0.245, epsilon = 1e-9);
        assert!(solution.depth > 0);
    }

    #[test]
    fn empty_interval_is_zero() {
        let solution =
            integrate(ok(f64::exp), [2.0, 2.0], &Config::default()).expect("should integrate");
        assert_eq!(solution.value, 0.0);
        assert_eq!(solution.evals, 0);
    }

    #[test]
    fn exhausted_depth_keeps_estimate() {
        let config = Config {
            max_depth: 0,
            ..Config::default()
        };
        let solution = integrate(ok(|x: f64| (x - 0.3).abs()), [0.0, 1.0], &config)
            .expect("should return estimate");

        assert_eq!(solution.status, Status::MaxDepth);
        assert_relative_eq!(solution.value, 0.29, epsilon = 0.05);
    }

    #[test]
    fn rejects_non_finite_integrand() {
        let result = integrate(ok(|x: f64| 1.0 / x), [0.0, 1.0], &Config::default());
        assert!(matches!(result, Err(Error::NonFiniteIntegrand { .. })));
    }

    #[test]
    fn rejects_non_finite_bounds() {
        let result = integrate(ok(f64::exp), [0.0, f64::INFINITY], &Config::default());
        assert!(matches!(result, Err(Error::NonFiniteBounds { .. })));
    }
}
