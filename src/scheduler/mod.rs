//! The kernel: registration of operations, the single-step protocol, the
//! enable/wait state machine, and nondeterministic choice. `OperationScheduler`
//! is a thin, panicking-on-cancellation façade over `SchedulerState` — every
//! function here is meant to be called from inside a running operation's
//! coroutine, never from the driver loop itself.

mod execution;
mod state;

pub(crate) use execution::Execution;
use execution::cancel_current_operation;

use crate::error::CoyoteError;
use crate::operation::{OperationId, OperationStatus, WaitSet};
use state::SchedulerState;
use std::any::Any;

/// Register and start a new operation running `body`, returning its id. The
/// spawn protocol (spec.md §4.2) is: register, start, then
/// `wait_operation_start` before the spawning operation continues, so the
/// child is always visible to anyone who looks it up afterward.
pub(crate) fn spawn_operation<F>(name: String, stack_size: usize, body: F) -> OperationId
where
    F: FnOnce() + Send + 'static,
{
    let id = SchedulerState::with(|st| st.register_operation(name, stack_size, body));
    SchedulerState::with(|st| st.start_operation(id));
    SchedulerState::with(|st| st.wait_operation_start(id));
    id
}

/// `schedule_next_operation`: ask the scheduler to pick who runs next,
/// suspending the caller if it isn't chosen. Unwinds the calling coroutine
/// if the iteration has already decided to stop.
pub(crate) fn schedule_next_operation(is_yielding: bool) {
    if let Err(CoyoteError::ExecutionCancelled) = SchedulerState::schedule_next_operation(is_yielding) {
        cancel_current_operation();
    }
}

pub(crate) fn get_next_boolean_choice(max_value: u32) -> bool {
    match SchedulerState::get_next_boolean_choice(max_value) {
        Ok(b) => b,
        Err(_) => cancel_current_operation(),
    }
}

pub(crate) fn get_next_integer_choice(max_value: i32) -> i32 {
    match SchedulerState::get_next_integer_choice(max_value) {
        Ok(i) => i,
        Err(_) => cancel_current_operation(),
    }
}

/// `assert(condition, message)`: the primitive the test-body contract
/// (spec.md §6) requires. Terminates the iteration with `AssertionFailure`
/// and unwinds the calling operation when `condition` is false.
pub(crate) fn assert_or_fail(condition: bool, message: impl Into<String>) {
    if !condition {
        SchedulerState::notify_assertion_failure(message.into());
        cancel_current_operation();
    }
}

pub(crate) fn notify_uncontrolled_concurrency(detail: impl Into<String>) -> ! {
    let detail = detail.into();
    SchedulerState::with(|st| {
        if st.terminated.is_none() {
            st.terminated = Some(crate::error::TerminationReason::Failed(
                CoyoteError::UncontrolledConcurrency { detail },
            ));
        }
    });
    cancel_current_operation();
}

pub(crate) fn detach() {
    SchedulerState::detach();
}

/// `coyote::notify_monitor_event`'s crate-internal half: forwards to
/// whichever strategy is active this iteration.
pub(crate) fn notify_event(event: &str) {
    SchedulerState::notify_event(event);
}

pub(crate) fn current_operation_name() -> String {
    SchedulerState::with(|st| st.current_op().name.clone())
}

/// Guards `Task<T>`'s entry points (`join`, `is_finished`) against a task
/// handle that outlived the iteration it was spawned in (spec.md §4.2
/// "Uncontrolled-task detection"): each `verify`/`run_test` iteration gets a
/// fresh `SchedulerState` with its own operation-id space starting back at 0,
/// so a `Task<T>` a user smuggled out of one iteration (stashed in a
/// variable the `Fn` test body captures across calls) and joins from a later
/// one refers to an id this iteration never registered. Unlike
/// `require_attached`'s case, the caller here *is* a live, attached
/// operation, so this reports through the normal error taxonomy —
/// `CoyoteError::UncontrolledConcurrency` — instead of a raw panic.
pub(crate) fn require_known_operation(id: OperationId) {
    if !SchedulerState::with(|st| st.contains(id)) {
        let caller = current_operation_name();
        notify_uncontrolled_concurrency(format!(
            "operation '{caller}' touched task {id}, which does not belong to this iteration \
             (a Task<T> handle escaped the iteration it was spawned in)"
        ));
    }
}

/// Block the current operation on `wait`, handing off its turn. Returns
/// once the wait is satisfied and the scheduler has re-enabled us.
pub(crate) fn block_current_on(wait: WaitSet, status: OperationStatus) {
    if let Err(CoyoteError::ExecutionCancelled) = SchedulerState::block_current_on(wait, status) {
        cancel_current_operation();
    }
}

pub(crate) fn complete_current(result: Option<Box<dyn Any + Send>>) {
    SchedulerState::complete_current(result);
}

pub(crate) fn take_result(id: OperationId) -> Option<Box<dyn Any + Send>> {
    SchedulerState::take_result(id)
}

pub(crate) fn is_finished(id: OperationId) -> bool {
    SchedulerState::is_finished(id)
}

/// True if called from inside a running operation under an active
/// iteration. `future::block_on` and the controlled primitives use this to
/// detect uncontrolled use outside of `verify`/`run_test`.
pub(crate) fn is_attached() -> bool {
    SchedulerState::try_with(|_| ()).is_some()
}

/// Guards every entry point into the controlled surface (`task::spawn`,
/// `future::block_on`, `Task::join`). `SchedulerState` lives behind a
/// `scoped_thread_local!`, so it is only ever set on the OS thread currently
/// running `Execution::run`; a call reaching here from any other thread means
/// the caller escaped the controller entirely (spec.md §4.2
/// "Uncontrolled-task detection": the engine enforces at-most-one-running-
/// operation, so a second, uncontrolled OS thread touching the controlled
/// surface is exactly the hard error the spec names `UncontrolledConcurrency`).
///
/// There is no running iteration to terminate from this thread — unlike
/// `notify_uncontrolled_concurrency`, which reports into an iteration that is
/// still attached — so this panics directly rather than unwinding through
/// `cancel_current_operation`.
pub(crate) fn require_attached(surface: &str) {
    if !is_attached() {
        panic!(
            "coyote: `{surface}` called without an active controlled iteration — uncontrolled \
             concurrency detected. Every concurrent operation a test body performs must go \
             through `coyote::task`/`coyote::future` from inside `coyote::verify`/`run_test`; \
             raw OS threads touching the controlled surface bypass the scheduler entirely."
        );
    }
}
