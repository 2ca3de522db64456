use super::ExplorationStrategy;
use crate::monitor::Monitor;
use crate::operation::OperationId;

/// Wraps a strategy to detect potentially infinite fair loops: after every
/// step it polls all registered monitors, and if every one of them has
/// stayed continuously hot for `temperature` steps in a row (the "bounded
/// look-back window" of spec.md §4.1) it declares a liveness violation.
pub struct LivenessWrapper<S: ExplorationStrategy> {
    inner: S,
    monitors: Vec<Box<dyn Monitor>>,
    temperature: usize,
    hot_streak: usize,
    violation: Option<String>,
}

impl<S: ExplorationStrategy> LivenessWrapper<S> {
    pub fn new(inner: S, monitors: Vec<Box<dyn Monitor>>, temperature: usize) -> Self {
        LivenessWrapper {
            inner,
            monitors,
            temperature,
            hot_streak: 0,
            violation: None,
        }
    }

    fn poll_monitors(&mut self) {
        if self.violation.is_some() {
            return;
        }
        if self.monitors.is_empty() {
            return;
        }
        let all_hot = self.monitors.iter().all(|m| m.is_hot());
        if all_hot {
            self.hot_streak += 1;
            if self.hot_streak > self.temperature {
                let offenders = self
                    .monitors
                    .iter()
                    .map(|m| m.name().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.violation = Some(offenders);
            }
        } else {
            self.hot_streak = 0;
        }
    }
}

impl<S: ExplorationStrategy> Clone for LivenessWrapper<S> {
    fn clone(&self) -> Self {
        // Monitors hold mutable user-defined automaton state that does not
        // have a meaningful "clone" across iterations; each iteration gets
        // fresh monitor bookkeeping via `initialize_iteration` instead.
        panic!("LivenessWrapper is not clonable; reset via initialize_iteration instead")
    }
}

impl<S: ExplorationStrategy> ExplorationStrategy for LivenessWrapper<S> {
    fn initialize_iteration(&mut self, iteration_index: usize) -> bool {
        self.hot_streak = 0;
        self.violation = None;
        self.inner.initialize_iteration(iteration_index)
    }

    fn get_next_operation(
        &mut self,
        enabled: &[OperationId],
        current: Option<OperationId>,
        is_yielding: bool,
    ) -> Option<OperationId> {
        let next = self.inner.get_next_operation(enabled, current, is_yielding);
        self.poll_monitors();
        next
    }

    fn get_next_boolean_choice(&mut self, current: OperationId, max_value: u32) -> Option<bool> {
        self.inner.get_next_boolean_choice(current, max_value)
    }

    fn get_next_integer_choice(&mut self, current: OperationId, max_value: i32) -> Option<i32> {
        self.inner.get_next_integer_choice(current, max_value)
    }

    fn scheduled_steps(&self) -> usize {
        self.inner.scheduled_steps()
    }

    fn max_steps_reached(&self) -> bool {
        self.inner.max_steps_reached()
    }

    fn is_fair(&self) -> bool {
        self.inner.is_fair()
    }

    fn reset(&mut self) {
        self.hot_streak = 0;
        self.violation = None;
        self.inner.reset();
    }

    fn check_liveness(&mut self) -> Option<String> {
        self.violation.take()
    }

    /// Feeds `event` to every owned monitor. `poll_monitors` (called after
    /// every scheduling decision, not here) is what actually turns a
    /// sustained all-hot state into a violation; this just updates each
    /// monitor's own automaton.
    fn on_event(&mut self, event: &str) {
        for monitor in &mut self.monitors {
            monitor.on_event(event);
        }
    }
}
