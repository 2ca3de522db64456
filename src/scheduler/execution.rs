//! The driver loop for one iteration: resumes exactly one operation's
//! coroutine at a time, chosen by `SchedulerState::advance_to_next`, until
//! the scheduler declares the iteration `Finished` or `Stopped`. Modeled on
//! TraceForge's `Execution::run`/`Execution::step`.

use super::state::{ScheduledOp, SchedulerState};
use crate::error::TerminationReason;
use crate::operation::OperationId;
use crate::runtime::continuation::DEFAULT_STACK_SIZE;
use crate::strategy::ExplorationStrategy;
use crate::trace::Trace;
use std::any::Any;
use std::cell::RefCell;
use std::panic;

/// Internal signal a cancelled operation unwinds with. Caught only here,
/// at the driver; never reported as a failure (spec.md §7).
struct Cancelled;

/// Runs `test_body` to completion (or to a terminating condition) under one
/// scheduling strategy, returning why the iteration stopped and the trace
/// of choices that produced it.
pub(crate) struct Execution {
    strategy: Box<dyn ExplorationStrategy>,
    max_steps_hard: usize,
    stack_size: usize,
    seed: u64,
}

impl Execution {
    pub(crate) fn new(
        strategy: Box<dyn ExplorationStrategy>,
        max_steps_hard: usize,
        stack_size: usize,
        seed: u64,
    ) -> Self {
        Execution {
            strategy,
            max_steps_hard,
            stack_size: if stack_size == 0 { DEFAULT_STACK_SIZE } else { stack_size },
            seed,
        }
    }

    pub(crate) fn run<F>(self, test_body: F) -> (TerminationReason, Trace, usize)
    where
        F: FnOnce() + Send + 'static,
    {
        let state = RefCell::new(SchedulerState::new(self.strategy, self.max_steps_hard, self.seed));
        let stack_size = self.stack_size;

        SchedulerState::enter(state, move || {
            SchedulerState::with(|st| {
                let root = st.register_operation("root".to_string(), stack_size, test_body);
                st.start_operation(root);
            });

            while Self::step() {}

            SchedulerState::with(|st| {
                let reason = st.terminated.clone().unwrap_or(TerminationReason::Passed);
                let steps = st.step_count();
                (reason, st.trace.clone(), steps)
            })
        })
    }

    /// Run a single step: resume whichever operation the scheduler chose.
    /// Returns `true` if the iteration should keep going.
    fn step() -> bool {
        enum NextStep {
            Run(std::rc::Rc<RefCell<crate::runtime::continuation::Continuation>>, OperationId),
            Stop,
        }

        let next = SchedulerState::with(|st| match st.advance_to_next() {
            // `st` is already borrowed here; fetch the continuation straight
            // off it (`continuation_of`) rather than through
            // `SchedulerState::continuation`, which re-enters
            // `SchedulerState::with` and would double-borrow the same
            // `RefCell`.
            ScheduledOp::Some(id) => NextStep::Run(st.continuation_of(id), id),
            ScheduledOp::Finished | ScheduledOp::Stopped => NextStep::Stop,
            ScheduledOp::None => unreachable!("advance_to_next always resolves to a concrete state"),
        });

        match next {
            NextStep::Stop => false,
            NextStep::Run(continuation, id) => {
                let result = panic::catch_unwind(panic::AssertUnwindSafe(|| continuation.borrow_mut().resume()));
                match result {
                    Ok(finished) => {
                        if finished {
                            SchedulerState::complete_current(None);
                        }
                        true
                    }
                    Err(payload) => {
                        Self::handle_panic(id, payload);
                        true
                    }
                }
            }
        }
    }

    fn handle_panic(id: OperationId, payload: Box<dyn Any + Send>) {
        if payload.downcast_ref::<Cancelled>().is_some() {
            // Expected unwind from a cancelled operation; the real
            // termination reason was already recorded by whoever cancelled
            // it. Treat the operation as completed so the loop doesn't try
            // to resume it again.
            SchedulerState::complete_current(None);
            return;
        }
        let message = describe_panic(&payload);
        let name = format!("{id}");
        SchedulerState::notify_unhandled_exception(name, message);
        SchedulerState::complete_current(None);
    }
}

fn describe_panic(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Panic with the engine's internal cancellation marker. Called from
/// `schedule_next_operation` and the choice functions once they observe
/// `ExecutionCancelled`, so that the operation's coroutine unwinds instead
/// of continuing to run user code after the iteration has already decided
/// to stop.
pub(crate) fn cancel_current_operation() -> ! {
    panic::resume_unwind(Box::new(Cancelled))
}
