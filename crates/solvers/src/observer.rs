/// Hook into a running search.
///
/// The equation solvers call `observe` once per iteration with an
/// [`equation::Event`](crate::equation::Event) and stop when it answers
/// [`Action::StopEarly`](crate::equation::Action::StopEarly). Answering
/// `None` lets the search go on.
///
/// Closures of the form `|event| -> Option<Action>` work directly, and `()`
/// never intervenes.
pub trait Observer<E, A> {
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _: &E) -> Option<A> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::equation::{Action, Event};

    fn event(iter: usize) -> Event {
        Event {
            iter,
            bracket: [-10.0, -2.0],
            x: -6.0,
            residual: 0.5,
        }
    }

    #[test]
    fn unit_never_intervenes() {
        for iter in 1..=5 {
            assert_eq!(Observer::<Event, Action>::observe(&mut (), &event(iter)), None);
        }
    }

    #[test]
    fn closures_keep_state_between_calls() {
        let mut seen = Vec::new();
        let mut stop_at_third = |event: &Event| {
            seen.push(event.iter);
            (seen.len() == 3).then_some(Action::StopEarly)
        };

        assert_eq!(stop_at_third.observe(&event(1)), None);
        assert_eq!(stop_at_third.observe(&event(2)), None);
        assert_eq!(stop_at_third.observe(&event(3)), Some(Action::StopEarly));
        assert_eq!(seen, [1, 2, 3]);
    }
}
