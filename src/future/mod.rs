//! The `async`/`.await` surface layered on top of the coroutine substrate
//! (SPEC_FULL.md §4 SUPPLEMENT "Rust-native async surface"), matching the
//! public surface already exercised by the teacher's own
//! `tests/sync/notify.rs` (`future::block_on(async { future::spawn(async
//! move { ... }).await ... })`).
//!
//! Every `.await` boundary a test body writes becomes a scheduler-visible
//! step: a `Poll::Pending` result calls `schedule_next_operation` before the
//! future is polled again, so control only ever returns to user code at a
//! point the scheduler chose.

use crate::scheduler;
use crate::task::{self, Task};
use futures::task::noop_waker_ref;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Drive `future` to completion inside the current operation. Every
/// `Poll::Pending` hands the turn back to the scheduler
/// (`schedule_next_operation(true)`, `is_yielding = true` since the operation
/// is choosing to give up its turn rather than blocking on another
/// operation) before polling again.
pub fn block_on<F: Future>(future: F) -> F::Output {
    scheduler::require_attached("future::block_on");
    let mut future = Box::pin(future);
    let waker = noop_waker_ref().clone();
    let mut cx = Context::from_waker(&waker);
    loop {
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(value) => return value,
            Poll::Pending => scheduler::schedule_next_operation(true),
        }
    }
}

/// Spawn `future` as a new operation, returning a `JoinHandle` that resolves
/// once it completes. This is `future`'s async-flavored counterpart to
/// `task::spawn`'s closure-flavored one: internally it just drives `future`
/// with `block_on` inside the new operation's body.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let inner = task::spawn("future::spawn", None, move || block_on(future));
    JoinHandle { inner }
}

/// Give up the current turn exactly once, the controlled analogue of
/// `std::thread::yield_now`. Counts as one scheduling step.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            Poll::Pending
        }
    }
}

/// An abstracted delay: gives up the turn `steps` times before resolving.
/// Controlled delays return whenever the scheduler decides, not when a
/// timeout elapses (spec.md §4.2 "Cancellation" note applies the same
/// reasoning to delays: they are scheduling points, not wall-clock waits).
pub fn delay(steps: usize) -> Delay {
    Delay { remaining: steps }
}

pub struct Delay {
    remaining: usize,
}

impl Future for Delay {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.remaining == 0 {
            Poll::Ready(())
        } else {
            self.remaining -= 1;
            Poll::Pending
        }
    }
}

/// Raised in place of a panic when a `JoinHandle`'s underlying operation
/// never produced a result (the task's body panicked with something other
/// than the engine's own cancellation marker).
#[derive(Debug, Clone)]
pub struct JoinError {
    message: String,
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task panicked: {}", self.message)
    }
}

impl std::error::Error for JoinError {}

/// A future-flavored handle to a `future::spawn`ed task. Polling it never
/// blocks; it reports `Pending` until the underlying operation completes.
pub struct JoinHandle<T> {
    inner: Task<T>,
}

impl<T: Send + 'static> Future for JoinHandle<T> {
    type Output = Result<T, JoinError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.inner.try_join_nonblocking() {
            Some(Ok(value)) => Poll::Ready(Ok(value)),
            Some(Err(message)) => Poll::Ready(Err(JoinError { message })),
            None => Poll::Pending,
        }
    }
}
