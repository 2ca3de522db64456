//! Stackful coroutine wrapper around the `generator` crate.
//!
//! Every operation's body runs as one of these. The scheduler resumes at
//! most one continuation at a time from its single run loop
//! (`scheduler::execution`); the continuation yields back to that loop at
//! every scheduler-visible step (`schedule_next_operation`, a boolean/integer
//! choice, or a blocking wait), never through a real OS-level context switch.

use generator::{done, Generator, Gn};

/// Default stack size for an operation's coroutine, in bytes. Generous
/// enough for a few levels of ordinary recursion and `async` state-machine
/// nesting without needing per-test tuning.
pub const DEFAULT_STACK_SIZE: usize = 4 * 1024 * 1024;

/// A single resumable operation body. `()`-in, `()`-out: the continuation
/// communicates with the scheduler purely through shared `ExecutionState`,
/// not through values passed across `resume`/`yield_`.
pub struct Continuation {
    gen: Generator<'static, (), ()>,
    done: bool,
}

impl Continuation {
    /// Wrap `f` as a coroutine with the given stack size. `f` is expected to
    /// call back into the scheduler (via `schedule_next_operation` and
    /// friends) rather than ever blocking the underlying OS thread.
    pub fn new<F>(stack_size: usize, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let gen = Gn::new_opt(stack_size, move || {
            f();
            done!();
        });
        Continuation { gen, done: false }
    }

    /// Resume execution until the next yield point or completion. Returns
    /// `true` if the operation's body ran to completion on this resume.
    pub fn resume(&mut self) -> bool {
        if self.done {
            return true;
        }
        let resumed = self.gen.resume();
        if resumed.is_none() || self.gen.is_done() {
            self.done = true;
        }
        self.done
    }

    pub fn finished(&self) -> bool {
        self.done
    }
}

/// Yield the currently running continuation back to the scheduler's run
/// loop. Called from inside `schedule_next_operation` and the choice
/// functions, never directly by user code.
pub fn yield_to_scheduler() {
    generator::yield_with(());
}
