use super::ExplorationStrategy;
use crate::operation::OperationId;
use indexmap::IndexMap;

/// Wraps a (possibly unfair) strategy to guarantee every continuously
/// enabled operation is eventually scheduled: tracks, per operation, how
/// many consecutive steps it has been enabled but not chosen; once any
/// counter exceeds `threshold` that operation is forced to run next,
/// overriding whatever the inner strategy would have picked (spec.md §4.1
/// "Fairness detail").
#[derive(Clone)]
pub struct FairnessWrapper<S: ExplorationStrategy> {
    inner: S,
    threshold: usize,
    skipped: IndexMap<OperationId, usize>,
}

impl<S: ExplorationStrategy> FairnessWrapper<S> {
    pub fn new(inner: S, threshold: usize) -> Self {
        FairnessWrapper {
            inner,
            threshold,
            skipped: IndexMap::new(),
        }
    }

    /// Every continuously-enabled operation is scheduled within
    /// `2 * threshold` steps (spec.md §8 invariant): a threshold-exceeding
    /// counter forces a choice on or before the step after it crosses
    /// `threshold`, and the counter only grows while the operation stays
    /// enabled without running.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    fn starved(&self, enabled: &[OperationId]) -> Option<OperationId> {
        enabled
            .iter()
            .copied()
            .find(|op| self.skipped.get(op).copied().unwrap_or(0) >= self.threshold)
    }

    fn record_step(&mut self, enabled: &[OperationId], chosen: OperationId) {
        for &op in enabled {
            if op == chosen {
                self.skipped.insert(op, 0);
            } else {
                *self.skipped.entry(op).or_insert(0) += 1;
            }
        }
        self.skipped.retain(|op, _| enabled.contains(op));
    }
}

impl<S: ExplorationStrategy> ExplorationStrategy for FairnessWrapper<S> {
    fn initialize_iteration(&mut self, iteration_index: usize) -> bool {
        self.skipped.clear();
        self.inner.initialize_iteration(iteration_index)
    }

    fn get_next_operation(
        &mut self,
        enabled: &[OperationId],
        current: Option<OperationId>,
        is_yielding: bool,
    ) -> Option<OperationId> {
        let chosen = match self.starved(enabled) {
            Some(op) => Some(op),
            None => self.inner.get_next_operation(enabled, current, is_yielding),
        }?;
        self.record_step(enabled, chosen);
        Some(chosen)
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
        true
    }

    fn reset(&mut self) {
        self.skipped.clear();
        self.inner.reset();
    }

    fn check_liveness(&mut self) -> Option<String> {
        self.inner.check_liveness()
    }

    fn on_event(&mut self, event: &str) {
        self.inner.on_event(event);
    }
}
