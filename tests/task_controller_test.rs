//! Task controller surface tests: spawn/join, `when_all`/`when_any`, and the
//! `future::spawn`/`future::block_on` async layer built on top of it.

use coyote::{task, Config, StrategyKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn joining_a_spawned_task_returns_its_result() {
    let f = || {
        let t = task::spawn("answer", None, || 41 + 1);
        assert_eq!(t.join(), 42);
    };
    let stats = coyote::verify(Config::builder().with_iterations(5).build(), f);
    assert!(stats.failures.is_empty());
    assert_eq!(stats.execs, 5);
}

#[test]
fn when_all_collects_every_result_in_order() {
    let f = || {
        let a = task::spawn("a", None, || 1);
        let b = task::spawn("b", None, || 2);
        let c = task::spawn("c", None, || 3);
        let results = task::when_all(vec![a, b, c]).join();
        coyote::assert(results == vec![1, 2, 3], "when_all must preserve order");
    };
    let stats = coyote::verify(
        Config::builder().with_iterations(20).with_strategy(StrategyKind::Random).build(),
        f,
    );
    assert!(stats.failures.is_empty(), "{:?}", stats.failures);
}

#[test]
fn when_any_reports_the_first_finished_index_and_value() {
    let f = || {
        let a = task::spawn("a", None, || "a");
        let b = task::spawn("b", None, || "b");
        let (index, value) = task::when_any(vec![a, b]).join();
        coyote::assert(index == 0 || index == 1, "index must name a real member");
        coyote::assert(value == "a" || value == "b", "value must come from a member");
    };
    let stats = coyote::verify(Config::builder().with_iterations(20).build(), f);
    assert!(stats.failures.is_empty(), "{:?}", stats.failures);
}

#[test]
fn when_all_rejects_an_empty_task_set() {
    let f = || {
        let empty: Vec<task::Task<()>> = Vec::new();
        let _ = task::when_all(empty);
    };
    // The assertion failure terminates the iteration and is reported as a
    // failure (spec.md §8 boundary behavior), not as a panic escaping
    // `verify` itself.
    let stats = coyote::verify(Config::builder().with_iterations(1).build(), f);
    assert_eq!(stats.failures.len(), 1);
    assert_eq!(stats.failures[0].error.kind_name(), "assertion-failure");
}

#[test]
fn future_spawn_and_block_on_round_trip() {
    let f = || {
        coyote::future::block_on(async {
            let handle = coyote::future::spawn(async { 7 });
            let value = handle.await.unwrap();
            coyote::assert(value == 7, "future::spawn result should round-trip");
        });
    };
    let stats = coyote::verify(Config::builder().with_iterations(10).build(), f);
    assert!(stats.failures.is_empty(), "{:?}", stats.failures);
}

#[test]
fn future_yield_now_lets_a_peer_interleave() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let order2 = order.clone();
    let f = move || {
        let order = order2.clone();
        coyote::future::block_on(async move {
            let o1 = order.clone();
            let o2 = order.clone();
            let h1 = coyote::future::spawn(async move {
                o1.lock().unwrap().push("a-start");
                coyote::future::yield_now().await;
                o1.lock().unwrap().push("a-end");
            });
            let h2 = coyote::future::spawn(async move {
                o2.lock().unwrap().push("b-start");
                coyote::future::yield_now().await;
                o2.lock().unwrap().push("b-end");
            });
            h1.await.unwrap();
            h2.await.unwrap();
        });
    };
    let stats = coyote::verify(Config::builder().with_iterations(10).build(), f);
    assert!(stats.failures.is_empty());
    let log = order.lock().unwrap();
    assert_eq!(log.len(), 4);
    assert!(log.contains(&"a-end"));
    assert!(log.contains(&"b-end"));
}

#[test]
fn delay_eventually_resolves() {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter2 = counter.clone();
    let f = move || {
        let counter = counter2.clone();
        coyote::future::block_on(async move {
            coyote::future::delay(3).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });
    };
    let stats = coyote::verify(Config::builder().with_iterations(3).build(), f);
    assert!(stats.failures.is_empty());
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn joining_a_task_handle_smuggled_out_of_its_iteration_is_uncontrolled_concurrency() {
    // Each `verify` iteration gets a fresh scheduler with its own operation-id
    // space starting at 0 (spec.md §4.2). A `Task<T>` stashed somewhere that
    // outlives the iteration it was spawned in and joined from a later one
    // therefore names an id the later iteration never registered.
    let escaped: Arc<std::sync::Mutex<Option<task::Task<i32>>>> = Arc::new(std::sync::Mutex::new(None));

    let stash = escaped.clone();
    let first = move || {
        let t = task::spawn("lives-in-iteration-one", None, || 9);
        coyote::assert(t.join() == 9, "the spawning iteration must still join cleanly");
        *stash.lock().unwrap() = Some(t);
    };
    let first_stats = coyote::verify(Config::builder().with_iterations(1).build(), first);
    assert!(first_stats.failures.is_empty(), "{:?}", first_stats.failures);

    let reuse = escaped.clone();
    let second = move || {
        let stale = reuse.lock().unwrap().expect("first iteration must have stashed a handle");
        let _ = stale.join();
    };
    let second_stats = coyote::verify(Config::builder().with_iterations(1).build(), second);
    assert_eq!(second_stats.failures.len(), 1, "{:?}", second_stats.failures);
    assert_eq!(second_stats.failures[0].error.kind_name(), "uncontrolled-concurrency");
}

#[test]
fn cancellation_token_is_accepted_but_does_not_stop_the_task() {
    let f = || {
        let token = task::CancellationToken::new();
        token.request_cancel();
        assert!(token.is_cancelled());
        let t = task::spawn("ignores-cancel", Some(token), || 5);
        coyote::assert(t.join() == 5, "a requested cancellation is best-effort only");
    };
    let stats = coyote::verify(Config::builder().with_iterations(1).build(), f);
    assert!(stats.failures.is_empty());
}
