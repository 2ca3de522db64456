//! `Task<T>` and the spawn protocol (spec.md §4.2): wraps a scheduler
//! operation with a typed result, the way TraceForge's own thread handles
//! wrap a `TaskId`.

use crate::operation::OperationId;
use crate::operation::{OperationStatus, WaitSet};
use crate::scheduler;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Accepted syntactically everywhere the platform this crate mirrors accepts
/// one, but best-effort: cancelling a token never short-circuits a
/// scheduling decision (spec.md §4.2 "Cancellation"). `request_cancel` only
/// flips a flag a task's own body may choose to poll.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A handle to a spawned operation's eventual result. Joining a `Task<T>`
/// blocks the calling operation (`BlockedOnWaitAll` on a single-member set)
/// until the target completes; the handle itself stays valid afterward so it
/// can also be folded into a `when_all`/`when_any` set.
pub struct Task<T> {
    pub(crate) id: OperationId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Task {
            id: self.id,
            _marker: PhantomData,
        }
    }
}
impl<T> Copy for Task<T> {}

impl<T: Send + 'static> Task<T> {
    pub(crate) fn from_id(id: OperationId) -> Self {
        Task {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        scheduler::require_known_operation(self.id);
        scheduler::is_finished(self.id)
    }

    /// Block until this task completes and return its result. Matches
    /// `schedule_function<T>`'s promise of a typed result (spec.md §4.2).
    ///
    /// Panics if the task's body panicked with something other than the
    /// engine's own cancellation marker — by the time that happens the
    /// iteration is already tearing down, so the panic simply continues the
    /// unwind through this caller too.
    pub fn join(&self) -> T {
        scheduler::require_attached("Task::join");
        if !self.is_finished() {
            scheduler::block_current_on(WaitSet::One(self.id), OperationStatus::BlockedOnWaitAll);
        }
        let result = scheduler::take_result(self.id)
            .expect("joined task completed without a result (it must have panicked)");
        *result
            .downcast::<T>()
            .expect("Task<T>::join downcast mismatch: result type does not match T")
    }

    /// Non-panicking variant used by `future::JoinHandle`: once the task has
    /// completed, reports whether it actually produced a result (it may have
    /// panicked instead).
    pub(crate) fn try_join_nonblocking(&self) -> Option<Result<T, String>> {
        if !self.is_finished() {
            return None;
        }
        Some(match scheduler::take_result(self.id) {
            Some(result) => Ok(*result
                .downcast::<T>()
                .expect("Task<T>::join downcast mismatch: result type does not match T")),
            None => Err("task panicked before producing a result".to_string()),
        })
    }
}

/// `schedule_function`: register and start a new operation running `body`,
/// returning a `Task<T>` that can later be joined for `body`'s return value.
/// `cancel_token` is accepted for API compatibility and otherwise unused
/// (spec.md §4.2 "Cancellation").
pub fn spawn<F, T>(name: impl Into<String>, cancel_token: Option<CancellationToken>, body: F) -> Task<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    scheduler::require_attached("task::spawn");
    if let Some(token) = &cancel_token {
        if token.is_cancelled() {
            log::warn!("spawn called with an already-cancelled token; token is accepted but best-effort and has no effect on scheduling");
        }
    }
    let id = scheduler::spawn_operation(name.into(), 0, move || {
        let result: Box<dyn std::any::Any + Send> = Box::new(body());
        scheduler::complete_current(Some(result));
    });
    Task::from_id(id)
}
