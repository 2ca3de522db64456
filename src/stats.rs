//! Aggregate result of a `verify`/`run_test` call across all iterations.

use crate::error::CoyoteError;
use crate::trace::Trace;

/// One iteration that did not pass cleanly.
#[derive(Debug, Clone)]
pub struct Failure {
    pub iteration: usize,
    pub seed: u64,
    pub step_count: usize,
    pub error: CoyoteError,
    pub trace: Trace,
}

/// Aggregate outcome across all iterations `verify` ran. `execs` and `block`
/// are named the way the teacher's own test suite already reads them off of
/// `Stats` (`stats.execs`, `stats.block`).
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Number of iterations actually executed (may be less than
    /// `Config::iterations` if the strategy's search space was exhausted
    /// first, or if a failure stopped the run and `keep_going_after_error`
    /// was false).
    pub execs: usize,
    /// Number of iterations that ended in `Deadlock` or `BoundReached`
    /// rather than a clean pass.
    pub block: usize,
    pub failures: Vec<Failure>,
}

impl Stats {
    /// Exit code per spec.md §6: 0 all iterations passed, 1 a violation was
    /// found (a failure that isn't just `BoundReached`/deadlock-as-coverage
    /// is present), 2 is reserved for configuration errors and is never
    /// produced here (callers that fail to even build a valid `Config`
    /// should return it themselves before calling `verify`).
    pub fn exit_code(&self) -> i32 {
        if self.failures.is_empty() {
            exitcode::OK as i32
        } else {
            1
        }
    }
}
