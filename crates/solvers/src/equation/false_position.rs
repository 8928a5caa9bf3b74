use crate::Observer;

use super::{
    Action, Config, Equation, Error, Event, Solution, Start, Status, bracket::Side, evaluate,
    initialize,
};

/// Finds a root of the equation using the Illinois false-position method.
///
/// Each iteration intersects the secant through the bracket endpoints with
/// zero. When the same endpoint is retained twice in a row its residual is
/// halved, which restores superlinear convergence on convex residuals.
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

    let mut last_replaced: Option<Side> = None;

    for iter in 1..=config.max_iters {
        let x = secant_point(bracket.as_array(), bracket.residuals());
        let residual = evaluate(equation, x)?;

        let event = Event {
            iter,
            bracket: bracket.as_array(),
            x,
            residual,
        };

        best.update(x, residual);

        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(best.finish(Status::StoppedByObserver, iter));
        }

        if residual.abs() <= config.residual_tol {
            return Ok(Solution {
                status: Status::Converged,
                x,
                residual,
                iters: iter,
            });
        }

        let replaced = bracket.shrink(x, residual);
        if last_replaced == Some(replaced) {
            let retained = match replaced {
                Side::Left => Side::Right,
                Side::Right => Side::Left,
            };
            bracket.scale_residual(retained, 0.5);
        }
        last_replaced = Some(replaced);

        if bracket.is_x_converged(config.x_abs_tol, config.x_rel_tol) {
            return Ok(best.finish(Status::Converged, iter));
        }
    }

    Ok(best.finish(Status::MaxIters, config.max_iters))
}

/// Runs false position without observation.
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

/// Returns the zero of the secant through the bracket endpoints.
///
/// Falls back to the midpoint if the secant point leaves the open bracket.
fn secant_point([left, right]: [f64; 2], [f_left, f_right]: [f64; 2]) -> f64 {
    let x = (left * f_right - right * f_left) / (f_right - f_left);
    if x > left && x < right {
        x
    } else {
        0.5 * (left + right)
    }
}
