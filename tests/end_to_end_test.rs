//! The six end-to-end scenarios from spec.md §8, one test each.

use coyote::strategy::{LivenessWrapper, RandomStrategy};
use coyote::{task, Config, StartFinishMonitor, StrategyKind};
use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

/// 1. Data-race on shared cell: two tasks write 3 and 5 into a shared cell,
/// the parent joins both and asserts the final value is 5. Left
/// uncontrolled, at least one of 200 random iterations should observe 3.
#[test]
fn data_race_on_shared_cell_is_found_by_random_exploration() {
    let cell = Arc::new(AtomicI32::new(0));
    let cell2 = cell.clone();
    let f = move || {
        let cell = cell2.clone();
        let c1 = cell.clone();
        let c2 = cell.clone();
        let a = task::spawn("writer-3", None, move || c1.store(3, Ordering::SeqCst));
        let b = task::spawn("writer-5", None, move || c2.store(5, Ordering::SeqCst));
        a.join();
        b.join();
        coyote::assert(cell.load(Ordering::SeqCst) == 5, "final cell value should be 5");
    };

    let stats = coyote::verify(
        Config::builder()
            .with_iterations(200)
            .with_strategy(StrategyKind::Random)
            .with_seed(11)
            .with_keep_going_after_error(true)
            .build(),
        f,
    );

    assert!(
        !stats.failures.is_empty(),
        "expected at least one interleaving where writer-3 ran last"
    );
}

/// 2. Parallel-then-wait ordering: the parent writes 5 after spawning a
/// child that writes 3, then waits on the child and asserts 5. An
/// interleaving where the child runs after the parent's write breaks that
/// assertion.
#[test]
fn parallel_then_wait_ordering_can_fail() {
    let cell = Arc::new(AtomicI32::new(0));
    let cell2 = cell.clone();
    let f = move || {
        let cell = cell2.clone();
        let child_cell = cell.clone();
        let child = task::spawn("child-writes-3", None, move || {
            child_cell.store(3, Ordering::SeqCst);
        });
        cell.store(5, Ordering::SeqCst);
        child.join();
        coyote::assert(cell.load(Ordering::SeqCst) == 5, "parent's write should be the final one");
    };

    let stats = coyote::verify(
        Config::builder()
            .with_iterations(200)
            .with_strategy(StrategyKind::Random)
            .with_seed(5)
            .with_keep_going_after_error(true)
            .build(),
        f,
    );

    assert!(!stats.failures.is_empty(), "expected the child-runs-last interleaving to be found");
}

/// 3. Interleaving enumeration: two tasks each log `>X` then yield once then
/// `<X`; over many PCT iterations all 6 legal orderings of
/// `{>foo <foo >bar <bar}` should appear.
#[test]
fn pct_enumerates_interleavings_of_two_bracketed_logs() {
    let seen: Arc<Mutex<HashSet<Vec<&'static str>>>> = Arc::new(Mutex::new(HashSet::new()));
    let seen2 = seen.clone();
    let f = move || {
        let seen = seen2.clone();
        coyote::future::block_on(async move {
            let log = Arc::new(Mutex::new(Vec::new()));
            let l1 = log.clone();
            let l2 = log.clone();
            let h1 = coyote::future::spawn(async move {
                l1.lock().unwrap().push(">foo");
                coyote::future::yield_now().await;
                l1.lock().unwrap().push("<foo");
            });
            let h2 = coyote::future::spawn(async move {
                l2.lock().unwrap().push(">bar");
                coyote::future::yield_now().await;
                l2.lock().unwrap().push("<bar");
            });
            h1.await.unwrap();
            h2.await.unwrap();
            seen.lock().unwrap().insert(log.lock().unwrap().clone());
        });
    };

    let stats = coyote::verify(
        Config::builder()
            .with_iterations(1000)
            .with_strategy(StrategyKind::Pct { k: 3 })
            .with_seed(3)
            // PCT's change points are sampled over `[0, max_steps.soft)`;
            // keeping that bound close to this test's actual handful of
            // scheduling decisions per iteration (rather than the default
            // 10_000) means a change point actually falls inside most
            // iterations instead of almost never being reached.
            .with_max_steps(12, 1_000)
            .build(),
        f,
    );

    assert!(stats.failures.is_empty());
    // Both `>foo` and `>bar` must precede their own `<`; of the
    // interleavings respecting that, there are exactly 6.
    assert_eq!(seen.lock().unwrap().len(), 6, "expected all 6 legal orderings to appear");
}

/// 4. Yield correctness: a task that yields several times still runs to
/// completion, making forward progress against a busier peer once
/// fairness is enabled.
#[test]
fn a_yielding_task_still_completes_under_fairness() {
    let progress = Arc::new(AtomicI32::new(0));
    let progress2 = progress.clone();
    let f = move || {
        let progress = progress2.clone();
        coyote::future::block_on(async move {
            let slow = {
                let progress = progress.clone();
                coyote::future::spawn(async move {
                    for _ in 0..5 {
                        coyote::future::yield_now().await;
                        progress.fetch_add(1, Ordering::SeqCst);
                    }
                })
            };
            let busy = coyote::future::spawn(async move {
                for _ in 0..50 {
                    coyote::future::yield_now().await;
                }
            });
            slow.await.unwrap();
            busy.await.unwrap();
        });
    };

    let stats = coyote::verify(
        Config::builder()
            .with_iterations(20)
            .with_fairness(true)
            .with_max_steps(5_000, 10_000)
            .build(),
        f,
    );

    assert!(stats.failures.is_empty(), "{:?}", stats.failures);
    assert_eq!(progress.load(Ordering::SeqCst), 20 * 5);
}

/// 5. Deadlock detection: two tasks each join the other before either can
/// finish; the scheduler must report `Deadlock` within one iteration.
#[test]
fn mutual_join_is_reported_as_a_deadlock() {
    let f = || {
        let slot1: Arc<Mutex<Option<task::Task<()>>>> = Arc::new(Mutex::new(None));
        let slot2: Arc<Mutex<Option<task::Task<()>>>> = Arc::new(Mutex::new(None));

        let s1 = slot1.clone();
        let t2 = task::spawn("t2", None, move || {
            let t1 = s1.lock().unwrap().clone().expect("t1 registered before t2 runs");
            t1.join();
        });
        *slot2.lock().unwrap() = Some(t2);

        let s2 = slot2.clone();
        let t1 = task::spawn("t1", None, move || {
            let t2 = s2.lock().unwrap().clone().expect("t2 registered before t1 runs");
            t2.join();
        });
        *slot1.lock().unwrap() = Some(t1);
    };

    let stats = coyote::verify(Config::builder().with_iterations(1).build(), f);
    assert_eq!(stats.failures.len(), 1);
    assert_eq!(stats.failures[0].error.kind_name(), "deadlock");
}

/// 6. Determinism: running the same config twice produces identical
/// iteration outcomes and identical captured traces.
#[test]
fn identical_config_reproduces_identical_outcomes() {
    fn run() -> coyote::Stats {
        let cell = Arc::new(AtomicI32::new(0));
        let cell2 = cell.clone();
        let f = move || {
            let cell = cell2.clone();
            let c1 = cell.clone();
            let c2 = cell.clone();
            let a = task::spawn("writer-3", None, move || c1.store(3, Ordering::SeqCst));
            let b = task::spawn("writer-5", None, move || c2.store(5, Ordering::SeqCst));
            a.join();
            b.join();
            coyote::assert(cell.load(Ordering::SeqCst) == 5, "final cell value should be 5");
        };
        coyote::verify(
            Config::builder()
                .with_iterations(50)
                .with_strategy(StrategyKind::Random)
                .with_seed(123)
                .with_keep_going_after_error(true)
                .build(),
            f,
        )
    }

    let first = run();
    let second = run();

    assert_eq!(first.execs, second.execs);
    assert_eq!(first.block, second.block);
    assert_eq!(first.failures.len(), second.failures.len());
    for (a, b) in first.failures.iter().zip(second.failures.iter()) {
        assert_eq!(a.trace, b.trace);
        assert_eq!(a.step_count, b.step_count);
    }
}

/// A request that reports "start" but never "finish" keeps a
/// `StartFinishMonitor` hot for the whole iteration; `notify_monitor_event`
/// is the test body's only path to actually drive that monitor (spec.md §6
/// "Specification monitor contract"), so this also exercises that the event
/// reaches the `LivenessWrapper` composed in via `verify_with_strategy`.
#[test]
fn a_request_that_never_finishes_is_reported_as_a_liveness_violation() {
    let f = || {
        coyote::notify_monitor_event("start");
        coyote::future::block_on(async {
            for _ in 0..20 {
                coyote::future::yield_now().await;
            }
        });
        // Never emits "finish": the monitor stays hot for the whole iteration.
    };

    let stats = coyote::verify_with_strategy(
        Config::builder().with_iterations(1).with_max_steps(100, 1_000).build(),
        |config| {
            Box::new(LivenessWrapper::new(
                RandomStrategy::new(config.seed),
                vec![Box::new(StartFinishMonitor::new("request"))],
                3,
            ))
        },
        f,
    );

    assert_eq!(stats.failures.len(), 1);
    assert_eq!(stats.failures[0].error.kind_name(), "liveness-violation");
}

/// A request that starts and finishes well inside the temperature window
/// never goes hot long enough to violate liveness.
#[test]
fn a_request_that_finishes_promptly_does_not_violate_liveness() {
    let f = || {
        coyote::notify_monitor_event("start");
        coyote::future::block_on(async {
            coyote::future::yield_now().await;
        });
        coyote::notify_monitor_event("finish");
        coyote::future::block_on(async {
            for _ in 0..20 {
                coyote::future::yield_now().await;
            }
        });
    };

    let stats = coyote::verify_with_strategy(
        Config::builder().with_iterations(5).with_max_steps(100, 1_000).build(),
        |config| {
            Box::new(LivenessWrapper::new(
                RandomStrategy::new(config.seed),
                vec![Box::new(StartFinishMonitor::new("request"))],
                3,
            ))
        },
        f,
    );

    assert!(stats.failures.is_empty(), "{:?}", stats.failures);
}
