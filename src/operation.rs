//! The unit the scheduler steps: an `Operation` and its state machine.

use smallvec::SmallVec;
use std::any::Any;
use std::fmt;

/// Default inline capacity for small per-operation collections (wait sets,
/// enabled-set snapshots). Most iterations juggle a handful of live
/// operations; this avoids a heap allocation for the common case.
pub const DEFAULT_INLINE_OPS: usize = 8;

pub type OpVec = SmallVec<[OperationId; DEFAULT_INLINE_OPS]>;

/// Stable, monotonic identifier assigned by `register_operation`. Ordering
/// over `OperationId` is the creation order and is used as the deterministic
/// order in which the enabled set is presented to a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId(pub usize);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// The operation state machine (spec.md §4.1).
///
/// `None -> Enabled <-> Running`; `Enabled`/`Running` can drop into either
/// `BlockedOn*` state and come back to `Enabled` once the wait is satisfied;
/// every state can terminate into `Completed`, which is absorbing. spec.md
/// §4.1 also names `BlockedOnReceive`/`BlockedOnResource` for primitives
/// (channel receive, an opaque external resource) that this crate's task
/// controller has no module for — see DESIGN.md — so only the two statuses
/// `task`/`when` actually produce are represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// Registered but never started.
    None,
    /// Runnable: the scheduler may choose this operation next.
    Enabled,
    /// Currently executing; at most one operation holds this status.
    Running,
    /// Waiting for every operation in its wait set to complete.
    BlockedOnWaitAll,
    /// Waiting for any operation in its wait set to complete.
    BlockedOnWaitAny,
    /// Terminal. Never re-enabled once reached.
    Completed,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Completed)
    }
}

/// Why an operation is currently blocked, if at all.
#[derive(Debug, Clone)]
pub enum WaitSet {
    /// Not waiting on anything.
    None,
    /// Waiting on exactly one other operation.
    One(OperationId),
    /// Waiting on every operation in the set (`when_all`/`wait_all`).
    All(OpVec),
    /// Waiting on any operation in the set (`when_any`/`wait_any`).
    Any(OpVec),
}

impl WaitSet {
    pub fn members(&self) -> OpVec {
        match self {
            WaitSet::None => OpVec::new(),
            WaitSet::One(id) => {
                let mut v = OpVec::new();
                v.push(*id);
                v
            }
            WaitSet::All(v) | WaitSet::Any(v) => v.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, WaitSet::None)
    }
}

/// Root async state-machine identity of the code an operation is running.
/// Used only to decide whether a task-awaiter continuation can run inline
/// (same root frame) or must be rescheduled as a new operation (spec.md
/// §4.2, `schedule_task_awaiter_continuation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootFrameId(pub OperationId);

/// The scheduler's atom: a unit of user-observable concurrent work that can
/// be paused and resumed.
pub struct Operation {
    pub id: OperationId,
    pub name: String,
    pub status: OperationStatus,
    pub waits_on: WaitSet,
    pub root_frame: RootFrameId,
    /// One-shot marker: set when a continuation is currently being awaited
    /// inline so re-entrant scheduling calls can detect it.
    pub currently_awaited_frame: bool,
    /// Result of the operation's body, stashed here on completion so a
    /// `JoinHandle`/`Task<T>` awaiting it can retrieve a typed value. Absent
    /// until `Completed`.
    pub result: Option<Box<dyn Any + Send>>,
    /// Set when the operation's body panicked with something other than the
    /// engine's own cancellation signal.
    pub panic_message: Option<String>,
}

impl Operation {
    pub fn new(id: OperationId, name: String) -> Self {
        Operation {
            id,
            name,
            status: OperationStatus::None,
            waits_on: WaitSet::None,
            root_frame: RootFrameId(id),
            currently_awaited_frame: false,
            result: None,
            panic_message: None,
        }
    }

    pub fn finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// A candidate the strategy may choose to run next: either runnable but
    /// idle (`Enabled`) or already the active operation (`Running`, i.e. it
    /// may be chosen again and simply keep going — spec.md §4.1's
    /// "`Enabled` ↔ `Running`" is a two-way edge, not a one-way handoff).
    pub fn is_enabled(&self) -> bool {
        matches!(self.status, OperationStatus::Enabled | OperationStatus::Running)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("waits_on", &self.waits_on)
            .finish()
    }
}
