//! `SchedulerState` is the portion of a single iteration's state reachable
//! from inside a running operation's coroutine (to register new operations,
//! block/unblock them, consult the strategy, etc). Modeled directly on
//! TraceForge's own `ExecutionState`: a scoped thread-local makes it
//! reachable from deeply nested library code without threading a handle
//! through every call, and is valid only between `Execution::run` entry and
//! exit (Design Note 9(c): "one task-local entry per iteration").

use crate::error::{CoyoteError, TerminationReason};
use crate::operation::{OpVec, Operation, OperationId, OperationStatus, WaitSet, DEFAULT_INLINE_OPS};
use crate::runtime::continuation::{yield_to_scheduler, Continuation};
use crate::strategy::ExplorationStrategy;
use crate::trace::{ChoiceKind, ChoiceValue, Trace};
use indexmap::IndexMap;
use scoped_tls::scoped_thread_local;
use smallvec::SmallVec;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

scoped_thread_local! {
    static SCHEDULER_STATE: RefCell<SchedulerState>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScheduledOp {
    /// No operation has ever been scheduled yet this iteration.
    None,
    /// This operation is the one that should run next / is running.
    Some(OperationId),
    /// The scheduler decided to stop (bound reached or a failure).
    Stopped,
    /// Every operation has completed.
    Finished,
}

impl ScheduledOp {
    pub(crate) fn id(&self) -> Option<OperationId> {
        match self {
            ScheduledOp::Some(id) => Some(*id),
            _ => None,
        }
    }

    fn take(&mut self) -> Self {
        std::mem::replace(self, ScheduledOp::None)
    }
}

struct OpEntry {
    operation: Operation,
    continuation: Rc<RefCell<Continuation>>,
}

pub(crate) struct SchedulerState {
    ops: IndexMap<OperationId, OpEntry>,
    pub(crate) current: ScheduledOp,
    next: ScheduledOp,
    pending_is_yielding: bool,
    step_count: usize,
    attached: bool,
    pub(crate) terminated: Option<TerminationReason>,
    strategy: Box<dyn ExplorationStrategy>,
    max_steps_hard: usize,
    next_id: usize,
    pub(crate) trace: Trace,
}

impl SchedulerState {
    pub(crate) fn new(strategy: Box<dyn ExplorationStrategy>, max_steps_hard: usize, seed: u64) -> Self {
        SchedulerState {
            ops: IndexMap::new(),
            current: ScheduledOp::None,
            next: ScheduledOp::None,
            pending_is_yielding: false,
            step_count: 0,
            attached: true,
            terminated: None,
            strategy,
            max_steps_hard,
            next_id: 0,
            trace: Trace::new(seed),
        }
    }

    #[inline]
    pub(crate) fn with<F, T>(f: F) -> T
    where
        F: FnOnce(&mut SchedulerState) -> T,
    {
        SCHEDULER_STATE.with(|cell| f(&mut cell.borrow_mut()))
    }

    #[inline]
    pub(crate) fn try_with<F, T>(f: F) -> Option<T>
    where
        F: FnOnce(&mut SchedulerState) -> T,
    {
        if SCHEDULER_STATE.is_set() {
            SCHEDULER_STATE.with(|cell| cell.try_borrow_mut().ok().map(|mut s| f(&mut s)))
        } else {
            None
        }
    }

    pub(crate) fn enter<F, T>(state: RefCell<SchedulerState>, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        SCHEDULER_STATE.set(&state, f)
    }

    fn current_id(&self) -> OperationId {
        self.current.id().expect("no operation is currently running")
    }

    pub(crate) fn op(&self, id: OperationId) -> &Operation {
        &self.ops[&id].operation
    }

    /// Whether `id` was registered in this iteration's operation table — used
    /// to detect a `Task<T>` handle that escaped to a later iteration (each
    /// iteration starts a fresh `SchedulerState` with its own id space from 0).
    pub(crate) fn contains(&self, id: OperationId) -> bool {
        self.ops.contains_key(&id)
    }

    fn op_mut(&mut self, id: OperationId) -> &mut Operation {
        &mut self.ops.get_mut(&id).unwrap().operation
    }

    pub(crate) fn current_op(&self) -> &Operation {
        self.op(self.current_id())
    }

    /// Exposed `pub(crate)` (rather than private) so `Execution::step` can
    /// call it on a `&SchedulerState` it already holds from inside a
    /// `SchedulerState::with` closure, instead of going through
    /// `SchedulerState::continuation` and re-entering `with` — which would
    /// try to borrow the same `RefCell` a second time and panic.
    pub(crate) fn continuation_of(&self, id: OperationId) -> Rc<RefCell<Continuation>> {
        Rc::clone(&self.ops[&id].continuation)
    }

    /// `register_operation`: allocate a fresh, strictly-increasing id, wrap
    /// `body` as a coroutine, and insert the operation in `None` status.
    /// Ids are scheduler-assigned, so the "panic on id collision" clause of
    /// spec.md §4.1's contract table can never actually trigger here; kept
    /// as a debug assertion documenting the invariant.
    pub(crate) fn register_operation<F>(&mut self, name: String, stack_size: usize, body: F) -> OperationId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = OperationId(self.next_id);
        self.next_id += 1;
        debug_assert!(!self.ops.contains_key(&id), "operation id collision");
        let operation = Operation::new(id, name);
        let continuation = Rc::new(RefCell::new(Continuation::new(stack_size, body)));
        self.ops.insert(id, OpEntry { operation, continuation });
        id
    }

    /// `start_operation`: transition a freshly registered operation into
    /// `Enabled` so the scheduler will consider it.
    pub(crate) fn start_operation(&mut self, id: OperationId) {
        let op = self.op_mut(id);
        assert_eq!(op.status, OperationStatus::None, "operation already started");
        op.status = OperationStatus::Enabled;
    }

    /// `wait_operation_start`: in the cooperative single-thread model,
    /// registration and `start_operation` both run synchronously on the
    /// spawning operation's own turn, so there is no real race to wait out;
    /// this asserts the invariant `wait_operation_start` exists to
    /// guarantee rather than actually blocking anything.
    pub(crate) fn wait_operation_start(&self, id: OperationId) {
        assert_ne!(self.op(id).status, OperationStatus::None, "child not yet started");
    }

    fn enabled_ids(&self) -> SmallVec<[OperationId; DEFAULT_INLINE_OPS]> {
        self.ops
            .values()
            .filter(|e| e.operation.is_enabled())
            .map(|e| e.operation.id)
            .collect()
    }

    /// Decide (but do not yet act on) which operation runs next. Idempotent
    /// within a step: if `next` is already set (because `schedule_next_operation`
    /// already ran the decision inline) this is a no-op, matching the
    /// teacher's `schedule()` guard.
    fn decide_next(&mut self) {
        if self.next != ScheduledOp::None {
            return;
        }
        if self.terminated.is_some() {
            self.next = ScheduledOp::Stopped;
            return;
        }

        let enabled = self.enabled_ids();

        if enabled.is_empty() {
            if self.ops.values().all(|e| e.operation.finished()) {
                self.next = ScheduledOp::Finished;
            } else {
                let blocked = self
                    .ops
                    .values()
                    .filter(|e| !e.operation.finished())
                    .map(|e| format!("{} ({})", e.operation.name, e.operation.id))
                    .collect::<Vec<_>>();
                self.terminated = Some(TerminationReason::Failed(CoyoteError::Deadlock { blocked }));
                self.next = ScheduledOp::Stopped;
            }
            return;
        }

        if self.step_count >= self.max_steps_hard {
            self.terminated = Some(TerminationReason::BoundReached);
            self.next = ScheduledOp::Stopped;
            return;
        }

        let current_id = self.current.id();
        match self
            .strategy
            .get_next_operation(&enabled, current_id, self.pending_is_yielding)
        {
            Some(id) => {
                self.step_count += 1;
                self.trace.push(ChoiceKind::Operation, ChoiceValue::Operation(id));
                self.next = ScheduledOp::Some(id);
            }
            None => {
                self.terminated = Some(TerminationReason::BoundReached);
                self.next = ScheduledOp::Stopped;
            }
        }

        if let Some(monitor) = self.strategy.check_liveness() {
            self.terminated = Some(TerminationReason::Failed(CoyoteError::LivenessViolation {
                monitor,
            }));
            // Whatever operation was just chosen above must not actually run:
            // the driver's next `advance_to_next` (or this call, if it was
            // made directly from the driver rather than through
            // `schedule_next_operation`) has to see `Stopped`, not a
            // dangling `next` pointing at an operation that should never be
            // resumed again.
            self.next = ScheduledOp::Stopped;
        }
    }

    /// Advance `current` to whatever `decide_next` chose. Called only from
    /// the driver loop, never from inside a running operation.
    ///
    /// Also moves the operation-state-machine status (spec.md §4.1) between
    /// `Enabled` and `Running`: the operation losing its turn drops back to
    /// `Enabled` (unless it already moved itself on to a `BlockedOn*` status
    /// or `Completed`, which `Running` must never clobber), and the one
    /// chosen to run is promoted to `Running`, asserting spec.md §8's
    /// invariant that at most one operation is ever `Running`.
    pub(crate) fn advance_to_next(&mut self) -> ScheduledOp {
        self.decide_next();
        let previous = self.current.id();
        self.current = self.next.take();

        if let Some(prev) = previous {
            let op = self.op_mut(prev);
            if op.status == OperationStatus::Running {
                op.status = OperationStatus::Enabled;
            }
        }
        if let Some(id) = self.current.id() {
            debug_assert!(
                self.ops
                    .values()
                    .all(|e| e.operation.id == id || e.operation.status != OperationStatus::Running),
                "at most one operation may be Running at a time"
            );
            self.op_mut(id).status = OperationStatus::Running;
        }

        self.current
    }

    /// `schedule_next_operation`: the core per-step entry point called by a
    /// running operation at every scheduler-visible point. Returns once this
    /// operation has been chosen to run again (possibly immediately, if the
    /// strategy kept it running).
    ///
    /// Because exactly one coroutine ever runs at a time, a `yield_to_scheduler`
    /// call here only ever returns when the driver loop has resumed *this*
    /// coroutine specifically (it is the only one the driver can resume) —
    /// there is no separate "wake up just to unwind" signal to check for
    /// afterwards. An operation that is suspended when the iteration
    /// terminates simply never gets resumed again; its coroutine (and
    /// anything it owns) is unwound safely when the scheduler state is
    /// dropped at the end of the iteration, via `generator`'s own
    /// cancel-on-drop behavior for unfinished generators.
    pub(crate) fn schedule_next_operation(is_yielding: bool) -> Result<(), CoyoteError> {
        let switch = Self::with(|state| {
            if !state.attached || state.terminated.is_some() {
                return Err(CoyoteError::ExecutionCancelled);
            }
            state.pending_is_yielding = is_yielding;
            state.decide_next();
            if state.terminated.is_some() {
                return Err(CoyoteError::ExecutionCancelled);
            }
            let current = state.current_id();
            if state.next.id() == Some(current) {
                // The strategy kept us running: consume the decision
                // ourselves so the driver's next `advance_to_next` call
                // doesn't see a stale `next` and skip deciding afresh.
                state.next = ScheduledOp::None;
                Ok(false)
            } else {
                Ok(true)
            }
        })?;

        if switch {
            yield_to_scheduler();
        }
        Ok(())
    }

    pub(crate) fn get_next_boolean_choice(max_value: u32) -> Result<bool, CoyoteError> {
        Self::with(|state| {
            if state.terminated.is_some() {
                return Err(CoyoteError::ExecutionCancelled);
            }
            let current = state.current_id();
            match state.strategy.get_next_boolean_choice(current, max_value) {
                Some(b) => {
                    state.step_count += 1;
                    state.trace.push(ChoiceKind::Bool, ChoiceValue::Bool(b));
                    Ok(b)
                }
                None => {
                    state.terminated = Some(TerminationReason::BoundReached);
                    Err(CoyoteError::ExecutionCancelled)
                }
            }
        })
    }

    pub(crate) fn get_next_integer_choice(max_value: i32) -> Result<i32, CoyoteError> {
        Self::with(|state| {
            if state.terminated.is_some() {
                return Err(CoyoteError::ExecutionCancelled);
            }
            let current = state.current_id();
            match state.strategy.get_next_integer_choice(current, max_value) {
                Some(i) => {
                    state.step_count += 1;
                    state.trace.push(ChoiceKind::Int, ChoiceValue::Int(i));
                    Ok(i)
                }
                None => {
                    state.terminated = Some(TerminationReason::BoundReached);
                    Err(CoyoteError::ExecutionCancelled)
                }
            }
        })
    }

    pub(crate) fn notify_assertion_failure(msg: String) {
        Self::with(|state| {
            if state.terminated.is_none() {
                state.terminated = Some(TerminationReason::Failed(CoyoteError::AssertionFailure(msg)));
            }
        });
    }

    pub(crate) fn notify_unhandled_exception(operation: String, message: String) {
        Self::with(|state| {
            if state.terminated.is_none() {
                state.terminated = Some(TerminationReason::Failed(
                    CoyoteError::UnhandledExceptionInOperation { operation, message },
                ));
            }
        });
    }

    pub(crate) fn detach() {
        Self::with(|state| state.attached = false);
    }

    /// Forward a test-body-emitted event to the strategy in play (spec.md §6
    /// "Specification monitor contract"). A no-op unless the strategy is, or
    /// wraps, a `LivenessWrapper` — every other strategy's `on_event` default
    /// ignores it.
    pub(crate) fn notify_event(event: &str) {
        Self::with(|state| state.strategy.on_event(event));
    }

    /// Block the currently running operation on `wait`, giving up its turn.
    pub(crate) fn block_current_on(wait: WaitSet, status: OperationStatus) -> Result<(), CoyoteError> {
        Self::with(|state| {
            let id = state.current_id();
            let op = state.op_mut(id);
            op.waits_on = wait;
            op.status = status;
        });
        Self::schedule_next_operation(false)
    }

    /// Mark the currently running operation `Completed`, stash its result,
    /// and wake up everyone blocked on it. A no-op if the operation is
    /// already `Completed`: a task's body typically stashes its own typed
    /// result with this call before returning, and the driver then observes
    /// the finished coroutine and calls this again with `None` to make sure
    /// every path through `step()` ends in `Completed` — the second call
    /// must not clobber the real result with `None`.
    pub(crate) fn complete_current(result: Option<Box<dyn Any + Send>>) {
        let id = Self::with(|state| state.current_id());
        if Self::with(|state| state.op(id).finished()) {
            return;
        }
        Self::with(|state| {
            let op = state.op_mut(id);
            op.status = OperationStatus::Completed;
            op.result = result;
        });
        Self::wake_waiters_on(id);
    }

    fn wake_waiters_on(completed: OperationId) {
        Self::with(|state| {
            let waiter_ids: OpVec = state
                .ops
                .values()
                .filter(|e| e.operation.waits_on.members().contains(&completed))
                .map(|e| e.operation.id)
                .collect();
            for waiter in waiter_ids {
                let satisfied = {
                    let op = state.op(waiter);
                    match &op.waits_on {
                        WaitSet::One(_) => true,
                        WaitSet::All(members) => members.iter().all(|m| state.op(*m).finished()),
                        WaitSet::Any(members) => members.iter().any(|m| state.op(*m).finished()),
                        WaitSet::None => false,
                    }
                };
                if satisfied {
                    let op = state.op_mut(waiter);
                    op.status = OperationStatus::Enabled;
                    op.waits_on = WaitSet::None;
                }
            }
        });
    }

    /// Retrieve a completed operation's stashed result, if any.
    pub(crate) fn take_result(id: OperationId) -> Option<Box<dyn Any + Send>> {
        Self::with(|state| state.op_mut(id).result.take())
    }

    pub(crate) fn is_finished(id: OperationId) -> bool {
        Self::with(|state| state.op(id).finished())
    }

    pub(crate) fn step_count(&self) -> usize {
        self.step_count
    }
}
