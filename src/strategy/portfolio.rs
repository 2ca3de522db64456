use super::ExplorationStrategy;
use crate::operation::OperationId;

/// `strategy: portfolio:[…]` (spec.md §6) — cycles through a list of inner
/// strategies across iterations, iteration `i` using strategy `i % len`.
/// The simplest reading consistent with "diverse strategies sampling a
/// bounded search space" (spec.md §1); see DESIGN.md for the alternatives
/// considered.
#[derive(Clone)]
pub struct PortfolioStrategy {
    members: Vec<Box<dyn ExplorationStrategy>>,
    active: usize,
}

impl PortfolioStrategy {
    pub fn new(members: Vec<Box<dyn ExplorationStrategy>>) -> Self {
        assert!(!members.is_empty(), "portfolio strategy needs at least one member");
        PortfolioStrategy { members, active: 0 }
    }

    fn current(&mut self) -> &mut Box<dyn ExplorationStrategy> {
        &mut self.members[self.active]
    }
}

impl ExplorationStrategy for PortfolioStrategy {
    fn initialize_iteration(&mut self, iteration_index: usize) -> bool {
        self.active = iteration_index % self.members.len();
        self.current().initialize_iteration(iteration_index)
    }

    fn get_next_operation(
        &mut self,
        enabled: &[OperationId],
        current: Option<OperationId>,
        is_yielding: bool,
    ) -> Option<OperationId> {
        self.current().get_next_operation(enabled, current, is_yielding)
    }

    fn get_next_boolean_choice(&mut self, current: OperationId, max_value: u32) -> Option<bool> {
        self.current().get_next_boolean_choice(current, max_value)
    }

    fn get_next_integer_choice(&mut self, current: OperationId, max_value: i32) -> Option<i32> {
        self.current().get_next_integer_choice(current, max_value)
    }

    fn scheduled_steps(&self) -> usize {
        self.members[self.active].scheduled_steps()
    }

    fn max_steps_reached(&self) -> bool {
        self.members[self.active].max_steps_reached()
    }

    fn is_fair(&self) -> bool {
        self.members[self.active].is_fair()
    }

    fn reset(&mut self) {
        self.current().reset();
    }

    fn check_liveness(&mut self) -> Option<String> {
        self.current().check_liveness()
    }

    fn on_event(&mut self, event: &str) {
        self.current().on_event(event);
    }
}
