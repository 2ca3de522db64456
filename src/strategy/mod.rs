//! Pluggable decision policies: given the set of currently enabled
//! operations, answer "which one runs next", plus the nondeterministic
//! boolean/integer choices a test body can ask for.
//!
//! Modeled directly on the `Scheduler` trait shape used by Rust concurrency
//! testing tools in this space (an oracle consulted once per scheduling
//! decision, carrying its own PRNG/bookkeeping state across an iteration,
//! reset between iterations).

mod dfs;
mod fairness;
mod liveness;
mod pct;
mod portfolio;
mod random;
mod replay;

pub use dfs::DfsStrategy;
pub use fairness::FairnessWrapper;
pub use liveness::LivenessWrapper;
pub use pct::PctStrategy;
pub use portfolio::PortfolioStrategy;
pub use random::RandomStrategy;
pub use replay::ReplayStrategy;

use crate::operation::OperationId;
use dyn_clone::DynClone;

/// A pure decision policy. Strategies never call back into the scheduler —
/// they only ever look at the arguments they're given and their own
/// internal state.
pub trait ExplorationStrategy: DynClone + Send {
    /// Called before each fresh iteration. Returns `false` to signal the
    /// search is exhausted and no further iterations should run (only
    /// meaningful for strategies with a finite, enumerable search space,
    /// e.g. bounded DFS).
    fn initialize_iteration(&mut self, iteration_index: usize) -> bool;

    /// Choose the next operation to run, given the operations that are
    /// currently enabled (in ascending `OperationId` order), the operation
    /// that just asked (`current`, `None` before the first choice of the
    /// iteration), and whether `current` is yielding (a hint, not a
    /// reordering directive — see spec.md §4.1 "Tie-breaks & orderings").
    ///
    /// Returns `None` to signal the iteration should terminate with
    /// `BoundReached`.
    fn get_next_operation(
        &mut self,
        enabled: &[OperationId],
        current: Option<OperationId>,
        is_yielding: bool,
    ) -> Option<OperationId>;

    /// Choose a deterministic boolean for the currently running operation.
    fn get_next_boolean_choice(&mut self, current: OperationId, max_value: u32) -> Option<bool>;

    /// Choose a deterministic integer in `[0, max_value)`.
    fn get_next_integer_choice(&mut self, current: OperationId, max_value: i32) -> Option<i32>;

    /// Number of scheduling decisions made so far this iteration.
    fn scheduled_steps(&self) -> usize;

    /// True once an internal step bound for this iteration has been hit.
    fn max_steps_reached(&self) -> bool;

    /// True if this strategy (or a fairness wrapper around it) guarantees
    /// every continuously-enabled operation eventually runs.
    fn is_fair(&self) -> bool;

    /// Reset all per-iteration bookkeeping (step counters, priority change
    /// points, visited-prefix state). Called by `initialize_iteration`
    /// implementations, and exposed separately so wrappers can reset an
    /// inner strategy without re-running its `initialize_iteration` logic.
    fn reset(&mut self);

    /// Consulted by the scheduler after every step. Returns the name of an
    /// offending monitor if a liveness violation has just been detected.
    /// Only `LivenessWrapper` overrides this; every other strategy is not
    /// liveness-aware and reports nothing.
    fn check_liveness(&mut self) -> Option<String> {
        None
    }

    /// Forwards a test-body-emitted event (spec.md §6 "Specification monitor
    /// contract": `Monitor::on_event`) to whichever monitors this strategy
    /// owns. Only `LivenessWrapper` does anything with this; every other
    /// strategy ignores events, since only it owns `Monitor`s.
    fn on_event(&mut self, _event: &str) {}
}

dyn_clone::clone_trait_object!(ExplorationStrategy);

/// Lets a boxed strategy serve as the concrete `S` a wrapper like
/// `FairnessWrapper<S>` is generic over, so `Config`'s runtime strategy
/// selection (which only ever produces a `Box<dyn ExplorationStrategy>`,
/// since the concrete kind is a runtime choice) can still be wrapped.
impl ExplorationStrategy for Box<dyn ExplorationStrategy> {
    fn initialize_iteration(&mut self, iteration_index: usize) -> bool {
        (**self).initialize_iteration(iteration_index)
    }

    fn get_next_operation(
        &mut self,
        enabled: &[OperationId],
        current: Option<OperationId>,
        is_yielding: bool,
    ) -> Option<OperationId> {
        (**self).get_next_operation(enabled, current, is_yielding)
    }

    fn get_next_boolean_choice(&mut self, current: OperationId, max_value: u32) -> Option<bool> {
        (**self).get_next_boolean_choice(current, max_value)
    }

    fn get_next_integer_choice(&mut self, current: OperationId, max_value: i32) -> Option<i32> {
        (**self).get_next_integer_choice(current, max_value)
    }

    fn scheduled_steps(&self) -> usize {
        (**self).scheduled_steps()
    }

    fn max_steps_reached(&self) -> bool {
        (**self).max_steps_reached()
    }

    fn is_fair(&self) -> bool {
        (**self).is_fair()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn check_liveness(&mut self) -> Option<String> {
        (**self).check_liveness()
    }

    fn on_event(&mut self, event: &str) {
        (**self).on_event(event)
    }
}
