use crate::Observer;

use super::{Action, Config, Equation, Error, Event, Solution, Start, Status, evaluate, initialize};

/// Halves `bracket` until a tolerance in `config` is met.
///
/// `observer` sees each midpoint with the bracket it split, and may stop the
/// search early.
///
/// # Errors
///
/// Returns an error if the bracket is invalid or does not change sign, the
/// config is invalid, or the residual cannot be evaluated.
pub fn solve<Obs>(
    equation: &impl Equation,
    bracket: [f64; 2],
    config: &Config,
    mut observer: Obs,
) -> Result<Solution, Error>
where
    Obs: Observer<Event, Action>,
{
    let (mut bracket, mut best) = match initialize(equation, bracket, config)? {
        Start::Done(solution) => return Ok(solution),
        Start::Search(bracket, best) => (bracket, best),
    };

    for iter in 1..=config.max_iters {
        let mid = bracket.midpoint();
        let residual = evaluate(equation, mid)?;

        let event = Event {
            iter,
            bracket: bracket.as_array(),
            x: mid,
            residual,
        };

        best.update(mid, residual);

        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(best.finish(Status::StoppedByObserver, iter));
        }

        bracket.shrink(mid, residual);

        if residual.abs() <= config.residual_tol
            || bracket.is_x_converged(config.x_abs_tol, config.x_rel_tol)
        {
            return Ok(Solution {
                status: Status::Converged,
                x: mid,
                residual,
                iters: iter,
            });
        }
    }

    Ok(best.finish(Status::MaxIters, config.max_iters))
}

/// [`solve`] with no observer.
///
/// # Errors
///
/// Returns an error if the bracket is invalid or does not change sign, the
/// config is invalid, or the residual cannot be evaluated.
pub fn solve_unobserved(
    equation: &impl Equation,
    bracket: [f64; 2],
    config: &Config,
) -> Result<Solution, Error> {
    solve(equation, bracket, config, ())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    use approx::assert_relative_eq;

    use crate::equation::ConfigError;

    /// Decreasing in `x` over negative potentials, with a root at `-e²`.
    fn log_suction(x: f64) -> Result<f64, Infallible> {
        Ok((-x).ln() - 2.0)
    }

    #[test]
    fn locates_root_over_negative_potentials() {
        let solution = solve_unobserved(&log_suction, [-100.0, -1.0], &Config::default())
            .expect("root is bracketed");

        assert_eq!(solution.status, Status::Converged);
        assert_relative_eq!(solution.x, -(2.0_f64.exp()), epsilon = 1e-9);
        assert!(solution.residual.abs() < 1e-9);
    }

    #[test]
    fn bracket_halves_every_iteration() {
        let mut widths = Vec::new();
        let observer = |event: &Event| {
            widths.push(event.bracket[1] - event.bracket[0]);
            None
        };
        solve(&log_suction, [-100.0, -1.0], &Config::default(), observer)
            .expect("root is bracketed");

        assert_relative_eq!(widths[0], 99.0);
        for pair in widths.windows(2).take(20) {
            assert_relative_eq!(pair[1], 0.5 * pair[0], max_relative = 1e-12);
        }
    }

    #[test]
    fn early_stop_reports_best_point_seen() {
        let mut seen = Vec::new();
        let observer = |event: &Event| {
            seen.push(event.residual.abs());
            (event.iter == 4).then_some(Action::StopEarly)
        };

        let solution = solve(&log_suction, [-100.0, -1.0], &Config::default(), observer)
            .expect("stopping is not an error");

        assert_eq!(solution.status, Status::StoppedByObserver);
        assert_eq!(solution.iters, 4);
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|r| solution.residual.abs() <= *r));
    }

    #[test]
    fn bound_order_does_not_matter() {
        let forward = solve_unobserved(&log_suction, [-100.0, -1.0], &Config::default())
            .expect("root is bracketed");
        let reversed = solve_unobserved(&log_suction, [-1.0, -100.0], &Config::default())
            .expect("root is bracketed");

        assert_eq!(reversed.status, Status::Converged);
        assert_relative_eq!(reversed.x, forward.x);
        assert_eq!(reversed.iters, forward.iters);
    }

    #[test]
    fn root_at_an_endpoint_needs_no_iterations() {
        let shifted = |x: f64| Ok::<_, Infallible>(x + 1.0);
        let solution =
            solve_unobserved(&shifted, [-1.0, 3.0], &Config::default()).expect("endpoint root");

        assert_eq!(solution.status, Status::Converged);
        assert_eq!(solution.iters, 0);
        assert_relative_eq!(solution.x, -1.0);
    }

    #[test]
    fn same_sign_endpoints_carry_their_residuals() {
        let result = solve_unobserved(&log_suction, [-5.0, -1.0], &Config::default());
        let Err(Error::NoBracket {
            left,
            right,
            left_residual,
            right_residual,
        }) = result
        else {
            panic!("expected NoBracket, got {result:?}");
        };

        assert_relative_eq!(left, -5.0);
        assert_relative_eq!(right, -1.0);
        assert_relative_eq!(left_residual, 5.0_f64.ln() - 2.0);
        assert_relative_eq!(right_residual, -2.0);
    }

    #[test]
    fn negative_residual_tolerance_is_rejected() {
        let config = Config {
            residual_tol: -1e-3,
            ..Config::default()
        };
        let result = solve_unobserved(&log_suction, [-100.0, -1.0], &config);
        assert!(matches!(
            result,
            Err(Error::InvalidConfig(ConfigError::ResidualTol))
        ));
    }

    #[test]
    fn nan_inside_the_bracket_is_reported() {
        let holed =
            |x: f64| Ok::<_, Infallible>(if x > -3.0 && x < -2.0 { f64::NAN } else { x + 2.5 });
        let result = solve_unobserved(&holed, [-10.0, 0.0], &Config::default());

        let Err(Error::NonFiniteResidual { x, residual }) = result else {
            panic!("expected NonFiniteResidual, got {result:?}");
        };
        assert_relative_eq!(x, -2.5);
        assert!(residual.is_nan());
    }

    #[test]
    fn empty_iteration_budget_returns_the_better_endpoint() {
        let config = Config {
            max_iters: 0,
            ..Config::default()
        };
        let solution = solve_unobserved(&log_suction, [-100.0, -1.0], &config)
            .expect("budget exhaustion is not an error");

        assert_eq!(solution.status, Status::MaxIters);
        assert_eq!(solution.iters, 0);
        // |ln 100 - 2| ≈ 2.6 is worse than |ln 1 - 2| = 2
        assert_relative_eq!(solution.x, -1.0);
    }
}
