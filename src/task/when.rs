//! `when_all`/`when_any` (spec.md §4.2): register the caller's interest in a
//! set of tasks as a wait, returning a fresh result task that completes once
//! the aggregate condition holds.

use super::handle::{spawn, Task};
use crate::operation::{OpVec, OperationStatus, WaitSet};
use crate::scheduler;

/// Block until every task in `tasks` has completed, returning all of their
/// results in order. Matches `when_all`'s contract: rejects an empty set
/// with `AssertionFailure("cannot wait for zero tasks")` (spec.md §8 boundary
/// behavior), rather than silently returning a completed empty task.
pub fn when_all<T: Send + 'static>(tasks: Vec<Task<T>>) -> Task<Vec<T>> {
    scheduler::assert_or_fail(!tasks.is_empty(), "cannot wait for zero tasks");
    let ids: OpVec = tasks.iter().map(|t| t.id()).collect();
    spawn("when_all", None, move || {
        scheduler::block_current_on(WaitSet::All(ids), OperationStatus::BlockedOnWaitAll);
        tasks.into_iter().map(|t| t.join()).collect()
    })
}

/// Block until any task in `tasks` has completed, returning the index of the
/// first one observed finished along with its result.
pub fn when_any<T: Send + 'static>(tasks: Vec<Task<T>>) -> Task<(usize, T)> {
    scheduler::assert_or_fail(!tasks.is_empty(), "cannot wait for zero tasks");
    let ids: OpVec = tasks.iter().map(|t| t.id()).collect();
    spawn("when_any", None, move || {
        scheduler::block_current_on(WaitSet::Any(ids), OperationStatus::BlockedOnWaitAny);
        let index = tasks
            .iter()
            .position(|t| t.is_finished())
            .expect("when_any woke with no member finished");
        let result = tasks[index].join();
        (index, result)
    })
}
