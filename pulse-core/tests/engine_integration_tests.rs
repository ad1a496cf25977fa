//! End-to-end tests of the running engine
//!
//! These tests verify:
//! 1. Every consumer observes strictly increasing tick ordinals
//! 2. start/stop are idempotent and stop halts ticking
//! 3. Tick period changes are validated and applied while running
//! 4. A failing instrument is isolated and marked stale
//! 5. A slow callback consumer never holds up the scheduler, even on a
//!    single-threaded runtime
//! 6. Engines can be started with an explicit period

use parking_lot::Mutex;
use pulse_core::engine::{Engine, EngineBuilder};
use pulse_core::testing::{seeded_config, FailingPriceModel};
use pulse_core::EngineError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn fast_engine(seed: u64, period_ms: u64) -> Engine {
    let mut config = seeded_config(seed);
    config.engine.tick_period_ms = period_ms;
    Engine::new(config).unwrap()
}

fn strictly_increasing(ticks: &[u64]) -> bool {
    ticks.windows(2).all(|w| w[0] < w[1])
}

#[tokio::test(start_paused = true)]
async fn test_consumers_see_monotonic_ticks() {
    let engine = fast_engine(1, 100);

    let mut pull = engine.subscribe("pull");
    let pulled = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(snapshot) = pull.next().await {
            seen.push(snapshot.tick);
            if seen.len() == 8 {
                break;
            }
        }
        seen
    });

    let pushed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&pushed);
    let handle = engine
        .subscribe_fn("push", move |snapshot, _| sink.lock().push(snapshot.tick))
        .unwrap();

    assert_eq!(engine.start(), Ok(true));
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    engine.shutdown().await;

    let pulled = pulled.await.unwrap();
    assert_eq!(pulled.len(), 8);
    assert!(strictly_increasing(&pulled));

    let pushed = pushed.lock().clone();
    assert!(!pushed.is_empty());
    assert!(strictly_increasing(&pushed));

    handle.unsubscribe();
    assert_eq!(engine.hub().subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_stop_idempotent() {
    let engine = fast_engine(2, 100);

    assert_eq!(engine.start(), Ok(true));
    assert_eq!(engine.start(), Ok(false));
    assert!(engine.is_running());

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(engine.stop());
    assert!(!engine.stop());

    let frozen = engine.latest_snapshot().tick;
    assert!(frozen >= 3);
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(engine.latest_snapshot().tick, frozen);
    assert!(!engine.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_restart_continues_ordinals() {
    let engine = fast_engine(3, 100);

    engine.start().unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    engine.shutdown().await;
    let first_run = engine.latest_snapshot().tick;

    engine.start().unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    engine.shutdown().await;

    assert!(engine.latest_snapshot().tick > first_run);
}

#[tokio::test(start_paused = true)]
async fn test_set_tick_period_while_running() {
    let engine = fast_engine(4, 100);
    engine.start().unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let err = engine.set_tick_period(5).unwrap_err();
    assert!(matches!(err, EngineError::TickPeriodOutOfRange { period_ms: 5, .. }));
    assert_eq!(engine.tick_period(), Duration::from_millis(100));

    engine.set_tick_period(1_000).unwrap();
    // Pending firing at 100ms still happens, then one per second
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_change = engine.latest_snapshot().tick;
    assert_eq!(after_change, 1);

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert_eq!(engine.latest_snapshot().tick, after_change + 2);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failing_instrument_marked_stale() {
    let mut config = seeded_config(5);
    config.engine.tick_period_ms = 100;
    let bad = config.instruments[2].symbol.clone();

    let engine = EngineBuilder::new(config)
        .price_model(FailingPriceModel::for_symbol(bad.clone()))
        .build()
        .unwrap();

    engine.start().unwrap();
    tokio::time::sleep(Duration::from_millis(550)).await;
    engine.shutdown().await;

    let snapshot = engine.latest_snapshot();
    assert!(snapshot.tick >= 5);

    let failed = snapshot.instrument(&bad).unwrap();
    assert!(failed.stale);
    assert_eq!(failed.price.price, failed.instrument.baseline_price);

    for view in snapshot.instruments.iter().filter(|i| i.instrument.symbol != bad) {
        assert!(!view.stale);
        assert!(!view.chart.is_empty());
        assert_eq!(view.chart.last().unwrap().price, view.price.price);
    }

    let failures = engine
        .metrics()
        .step_failures
        .with_label_values(&[bad.as_str()])
        .get();
    assert_eq!(failures, snapshot.tick);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_callback_does_not_block_scheduler() {
    let engine = fast_engine(6, 20);
    let calls = Arc::new(AtomicU64::new(0));
    let last_seen = Arc::new(AtomicU64::new(0));

    let counter = Arc::clone(&calls);
    let seen = Arc::clone(&last_seen);
    let handle = engine
        .subscribe_fn("slow", move |snapshot, _| {
            let previous = seen.swap(snapshot.tick, Ordering::SeqCst);
            assert!(snapshot.tick > previous);
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
        })
        .unwrap();

    engine.start().unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    engine.stop();
    handle.unsubscribe();

    let published = engine.metrics().ticks_published.get();
    let delivered = calls.load(Ordering::SeqCst);
    assert!(published >= 10, "scheduler stalled: {} ticks", published);
    assert!(delivered <= 4, "slow consumer saw {} snapshots", delivered);
    assert!(delivered < published);
}

#[tokio::test(flavor = "current_thread")]
async fn test_slow_callback_on_single_thread_runtime() {
    let engine = fast_engine(8, 20);
    let calls = Arc::new(AtomicU64::new(0));

    let counter = Arc::clone(&calls);
    let handle = engine
        .subscribe_fn("blocking", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
        })
        .unwrap();

    engine.start().unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    engine.stop();
    handle.unsubscribe();

    let published = engine.metrics().ticks_published.get();
    let delivered = calls.load(Ordering::SeqCst);
    assert!(published >= 15, "scheduler stalled: {} ticks", published);
    assert!(delivered >= 1);
    assert!(delivered <= 4, "slow consumer saw {} snapshots", delivered);
}

#[tokio::test(start_paused = true)]
async fn test_selection_does_not_touch_engine() {
    let engine = fast_engine(7, 100);
    let mut a = engine.subscribe("a");
    let mut b = engine.subscribe("b");

    a.select_instrument("TSLA").unwrap();
    b.select_instrument("BTC-USD").unwrap();
    assert!(a.select_instrument("DOGE").is_err());

    let before = engine.latest_snapshot();
    engine.start().unwrap();
    let snapshot = a.next().await.unwrap();
    engine.shutdown().await;

    assert_eq!(a.selected(&snapshot).unwrap().instrument.symbol, "TSLA");
    assert_eq!(b.selected(&snapshot).unwrap().instrument.symbol, "BTC-USD");
    assert_eq!(snapshot.instruments.len(), before.instruments.len());
}

#[tokio::test(start_paused = true)]
async fn test_start_with_explicit_period() {
    let engine = fast_engine(9, 1_000);
    assert!(engine.start_with_period(1).is_err());
    assert!(!engine.is_running());

    assert_eq!(engine.start_with_period(250), Ok(true));
    assert_eq!(engine.tick_period(), Duration::from_millis(250));

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    engine.shutdown().await;
    assert_eq!(engine.latest_snapshot().tick, 4);
}
