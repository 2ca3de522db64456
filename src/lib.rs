//! Coyote-core: a systematic concurrency testing engine. It repeatedly runs
//! a test body under a chosen `ExplorationStrategy`, controlling every
//! scheduling decision a cooperatively-multitasked set of operations makes,
//! to sample the space of possible interleavings instead of trusting
//! whichever one the OS happened to produce.
//!
//! ```ignore
//! let stats = coyote::verify(
//!     coyote::Config::builder().with_iterations(1000).build(),
//!     || {
//!         coyote::future::block_on(async {
//!             let a = coyote::task::spawn("writer", None, || { /* ... */ });
//!             a.join();
//!         });
//!     },
//! );
//! assert_eq!(stats.exit_code(), 0);
//! ```

mod config;
mod error;
pub mod future;
mod monitor;
mod operation;
mod runtime;
mod scheduler;
mod stats;
pub mod strategy;
pub mod task;
mod trace;

pub use config::{Config, ConfigBuilder, StepBound, StrategyKind};
pub use error::{CoyoteError, TerminationReason};
pub use monitor::{Monitor, StartFinishMonitor};
pub use operation::OperationId;
pub use stats::{Failure, Stats};
pub use trace::{ChoiceKind, ChoiceValue, Trace, TraceEntry};

use scheduler::Execution;
use std::sync::Once;
use strategy::{
    DfsStrategy, ExplorationStrategy, FairnessWrapper, PctStrategy, PortfolioStrategy,
    RandomStrategy, ReplayStrategy,
};

static LOGGING: Once = Once::new();

fn install_logging(level: log::LevelFilter) {
    // Idempotent: the first `verify`/`run_test` call in a process pins the
    // max level for every later call too, matching a test harness wiring up
    // logging once per process rather than per test.
    LOGGING.call_once(|| {
        log::set_max_level(level);
    });
}

fn build_strategy(config: &Config) -> Box<dyn ExplorationStrategy> {
    fn build_kind(kind: &StrategyKind, config: &Config) -> Box<dyn ExplorationStrategy> {
        match kind {
            StrategyKind::Random => Box::new(RandomStrategy::new(config.seed)),
            StrategyKind::Pct { k } => Box::new(PctStrategy::new(config.seed, *k, config.max_steps.soft)),
            StrategyKind::Dfs { max_depth } => Box::new(DfsStrategy::new(*max_depth)),
            StrategyKind::Portfolio(members) => {
                Box::new(PortfolioStrategy::new(members.iter().map(|m| build_kind(m, config)).collect()))
            }
        }
    }

    if let Some(path) = &config.replay_trace {
        let trace = Trace::load_from_path(path)
            .unwrap_or_else(|e| panic!("failed to load replay trace from {}: {e}", path.display()));
        return Box::new(ReplayStrategy::new(trace));
    }

    let base = build_kind(&config.strategy, config);
    if config.fairness {
        // `FairnessWrapper<S>` is generic over a concrete strategy type;
        // `Config` only ever hands us a `Box<dyn ExplorationStrategy>` here
        // (the concrete kind was a runtime choice), so it plays the role of
        // `S` directly via the blanket `ExplorationStrategy` impl for boxed
        // trait objects.
        Box::new(FairnessWrapper::new(base, config.max_steps.soft))
    } else {
        base
    }
}

/// Run `test_body` under `config`, exploring `config.iterations` distinct
/// schedules (fewer if a strategy's search space is exhausted first, or if a
/// failure is found and `keep_going_after_error` is false). This is the
/// engine's primary entry point; `run_test` is an alias with the name used
/// in spec.md §6.
pub fn verify<F>(config: Config, test_body: F) -> Stats
where
    F: Fn() + Send + Sync + Clone + 'static,
{
    verify_with_strategy(config, build_strategy, test_body)
}

/// Like `verify`, but takes a ready-made strategy instead of building one
/// from `Config::strategy`. Needed to compose wrappers `Config` has no
/// dedicated option for, e.g. `LivenessWrapper` with user-authored
/// `Monitor`s: `Config::strategy`/`with_fairness` only ever select among the
/// built-in kinds.
pub fn verify_with_strategy<F>(
    config: Config,
    build: impl FnOnce(&Config) -> Box<dyn ExplorationStrategy>,
    test_body: F,
) -> Stats
where
    F: Fn() + Send + Sync + Clone + 'static,
{
    install_logging(config.verbosity);

    let mut strategy = build(&config);
    let mut stats = Stats::default();

    for iteration in 0..config.iterations {
        if !strategy.initialize_iteration(iteration) {
            log::debug!("strategy search space exhausted after {iteration} iterations");
            break;
        }

        let execution = Execution::new(strategy.clone(), config.max_steps.hard, config.stack_size, config.seed);
        let body = test_body.clone();
        let (reason, trace, step_count) = execution.run(move || body());

        stats.execs += 1;

        match &reason {
            TerminationReason::Passed => {
                log::trace!("iteration {iteration}: passed in {step_count} steps");
            }
            TerminationReason::BoundReached => {
                log::debug!("iteration {iteration}: bound reached after {step_count} steps");
                stats.block += 1;
            }
            TerminationReason::Failed(err) if err.is_cancellation() => {
                // Only possible if the iteration was torn down without ever
                // reaching a real termination reason; treat like a bound.
                stats.block += 1;
            }
            TerminationReason::Failed(err) => {
                log::error!("iteration {iteration}: {err} (seed {}, {step_count} steps)", config.seed);
                stats.failures.push(Failure {
                    iteration,
                    seed: config.seed,
                    step_count,
                    error: err.clone(),
                    trace,
                });
                if !config.keep_going_after_error {
                    break;
                }
            }
        }
    }

    stats
}

/// Alias for `verify`, matching spec.md §6's own vocabulary
/// (`run_test(config, test_body)`).
pub fn run_test<F>(config: Config, test_body: F) -> Stats
where
    F: Fn() + Send + Sync + Clone + 'static,
{
    verify(config, test_body)
}

/// The primitive the test-body contract requires (spec.md §6): terminate the
/// iteration with `AssertionFailure` and unwind the calling operation if
/// `condition` is false. Callable only from inside a running operation.
pub fn assert(condition: bool, message: impl Into<String>) {
    scheduler::assert_or_fail(condition, message);
}

/// Signal that a controlled resource wait outside the `WaitSet` vocabulary
/// is being used (spec.md §4.2): detaches the caller from scheduling
/// accounting without ending the iteration. Rarely needed directly; most
/// test bodies only ever go through `task`/`future`.
pub fn detach() {
    scheduler::detach();
}

/// Controlled nondeterministic boolean choice (spec.md §3 "Nondeterministic
/// choice point", §4.1 `get_next_boolean_choice`): consults the active
/// strategy, counts as one scheduling step, and is recorded in the iteration's
/// trace so a replay reproduces the same answer. `max` bounds the choice the
/// way `get_next_integer_choice`'s `max` does; strategies are free to ignore
/// it (`RandomStrategy` always draws a fair coin) but it is still threaded
/// through so a strategy that wants it (e.g. a biased or PCT-style chooser)
/// can see it. Callable only from inside a running operation.
pub fn nondet_bool(max: u32) -> bool {
    scheduler::get_next_boolean_choice(max)
}

/// Controlled nondeterministic integer choice in `[0, max)` (spec.md §3, §4.1
/// `get_next_integer_choice`). Same step/replay contract as `nondet_bool`.
/// Callable only from inside a running operation.
pub fn nondet_int(max: i32) -> i32 {
    scheduler::get_next_integer_choice(max)
}

/// The test body's half of the specification monitor contract (spec.md §6):
/// feeds `event` to every `Monitor` owned by the active `LivenessWrapper`, so
/// its hot/cold automaton can advance. A no-op when no `LivenessWrapper` is in
/// play (e.g. `verify` without `verify_with_strategy`'s monitor composition).
/// Callable only from inside a running operation.
pub fn notify_monitor_event(event: impl AsRef<str>) {
    scheduler::notify_event(event.as_ref());
}
