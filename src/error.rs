//! The error taxonomy an iteration can terminate with.
//!
//! `CoyoteError` is the user-visible surface; `ExecutionCancelled` is the one
//! variant that is never supposed to reach a caller (it unwinds suspended
//! operations when an iteration is torn down early) and is swallowed at the
//! iteration boundary instead of being reported.

use std::fmt;

/// Why a single iteration stopped before all operations completed cleanly.
#[derive(Debug, Clone)]
pub enum CoyoteError {
    /// `assert(condition, message)` failed inside user or internal code.
    AssertionFailure(String),
    /// No operation was enabled and the test had not completed.
    Deadlock { blocked: Vec<String> },
    /// A liveness monitor stayed hot longer than the configured temperature.
    LivenessViolation { monitor: String },
    /// User code used a concurrency primitive that bypassed the controller.
    UncontrolledConcurrency { detail: String },
    /// An operation's code panicked and the panic was not `assert`-shaped.
    UnhandledExceptionInOperation { operation: String, message: String },
    /// Internal unwind signal used to tear down suspended operations once the
    /// scheduler has been detached or has terminated for another reason.
    /// Never surfaces past the iteration driver.
    ExecutionCancelled,
}

impl fmt::Display for CoyoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoyoteError::AssertionFailure(msg) => write!(f, "assertion failure: {msg}"),
            CoyoteError::Deadlock { blocked } => {
                write!(f, "deadlock! blocked operations: [{}]", blocked.join(", "))
            }
            CoyoteError::LivenessViolation { monitor } => {
                write!(f, "liveness violation: monitor '{monitor}' stayed hot")
            }
            CoyoteError::UncontrolledConcurrency { detail } => {
                write!(f, "uncontrolled concurrency detected: {detail}")
            }
            CoyoteError::UnhandledExceptionInOperation { operation, message } => {
                write!(f, "unhandled exception in operation '{operation}': {message}")
            }
            CoyoteError::ExecutionCancelled => write!(f, "execution cancelled"),
        }
    }
}

impl std::error::Error for CoyoteError {}

impl CoyoteError {
    /// True for the one variant that must never be reported to a user driver.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CoyoteError::ExecutionCancelled)
    }

    /// The exit-code bucket this error belongs to (see `spec.md` §6). All
    /// failure kinds currently map to the same "a violation was found" code;
    /// the distinction is kept separate (`kind_name`) for trace/report output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            CoyoteError::AssertionFailure(_) => "assertion-failure",
            CoyoteError::Deadlock { .. } => "deadlock",
            CoyoteError::LivenessViolation { .. } => "liveness-violation",
            CoyoteError::UncontrolledConcurrency { .. } => "uncontrolled-concurrency",
            CoyoteError::UnhandledExceptionInOperation { .. } => "unhandled-exception",
            CoyoteError::ExecutionCancelled => "cancelled",
        }
    }
}

/// Why a single iteration's scheduling loop stopped. This is a superset of
/// `CoyoteError`: `BoundReached` is explicitly not a failure (spec.md §7).
#[derive(Debug, Clone)]
pub enum TerminationReason {
    /// The test body and every operation it spawned completed normally.
    Passed,
    /// `max_scheduling_steps` was exceeded with no violation found. Counted
    /// towards coverage accounting, not reported as a bug.
    BoundReached,
    /// The iteration ended in one of the error-taxonomy outcomes.
    Failed(CoyoteError),
}

impl TerminationReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, TerminationReason::Failed(e) if !e.is_cancellation())
    }
}
