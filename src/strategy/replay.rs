use super::ExplorationStrategy;
use crate::operation::OperationId;
use crate::trace::{ChoiceKind, ChoiceValue, Trace};

/// Deterministically replays a previously captured `Trace` (spec.md §6,
/// `replay_trace`). Every choice point is answered by consulting the next
/// recorded entry instead of any strategy logic; running out of entries
/// (e.g. because the code under test changed) is a bug in the caller, not
/// something this strategy can recover from, so it terminates the
/// iteration via `BoundReached` rather than panicking.
#[derive(Clone)]
pub struct ReplayStrategy {
    trace: Trace,
    cursor: usize,
}

impl ReplayStrategy {
    pub fn new(trace: Trace) -> Self {
        ReplayStrategy { trace, cursor: 0 }
    }

    fn next_entry(&mut self, expected: ChoiceKind) -> Option<ChoiceValue> {
        let entry = self.trace.steps.get(self.cursor)?;
        if entry.choice_kind != expected {
            return None;
        }
        self.cursor += 1;
        Some(entry.value.clone())
    }
}

impl ExplorationStrategy for ReplayStrategy {
    fn initialize_iteration(&mut self, iteration_index: usize) -> bool {
        // A trace captures exactly one iteration; replay only ever offers
        // that single fresh interleaving.
        self.cursor = 0;
        iteration_index == 0
    }

    fn get_next_operation(
        &mut self,
        enabled: &[OperationId],
        _current: Option<OperationId>,
        _is_yielding: bool,
    ) -> Option<OperationId> {
        match self.next_entry(ChoiceKind::Operation)? {
            ChoiceValue::Operation(id) if enabled.contains(&id) => Some(id),
            _ => None,
        }
    }

    fn get_next_boolean_choice(&mut self, _current: OperationId, _max_value: u32) -> Option<bool> {
        match self.next_entry(ChoiceKind::Bool)? {
            ChoiceValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn get_next_integer_choice(&mut self, _current: OperationId, _max_value: i32) -> Option<i32> {
        match self.next_entry(ChoiceKind::Int)? {
            ChoiceValue::Int(i) => Some(i),
            _ => None,
        }
    }

    fn scheduled_steps(&self) -> usize {
        self.cursor
    }

    fn max_steps_reached(&self) -> bool {
        self.cursor >= self.trace.steps.len()
    }

    fn is_fair(&self) -> bool {
        false
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}
