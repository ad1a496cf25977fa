//! Snapshot fan-out
//!
//! The hub holds the latest [`Snapshot`] behind a `tokio::sync::watch`
//! channel. Publishing never waits on consumers: a slow consumer simply
//! observes fewer, newer snapshots. Every consumer sees tick ordinals in
//! strictly increasing order.
//!
//! Two consumption styles:
//! - [`Subscription`]: pull with `next().await`
//! - [`SubscriptionHandle`]: push into a callback running on its own task

use super::snapshot::{InstrumentSnapshot, Snapshot};
use crate::core::EngineError;
use crate::monitoring::EngineMetrics;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{watch, Notify};
use tracing::{debug, warn};

struct HubInner {
    tx: watch::Sender<Arc<Snapshot>>,
    consumers: Mutex<HashMap<u64, String>>,
    next_id: AtomicU64,
    metrics: EngineMetrics,
}

impl HubInner {
    fn unregister(&self, id: u64) {
        let mut consumers = self.consumers.lock();
        if let Some(consumer) = consumers.remove(&id) {
            self.metrics.subscribers.set(consumers.len() as i64);
            debug!(consumer = %consumer, "Consumer unsubscribed");
        }
    }
}

/// Latest-value snapshot hub
#[derive(Clone)]
pub struct SnapshotHub {
    inner: Arc<HubInner>,
}

impl SnapshotHub {
    /// Create a hub holding `seed` so there is never a no-data state
    pub fn new(seed: Snapshot, metrics: EngineMetrics) -> Self {
        let (tx, _) = watch::channel(Arc::new(seed));
        Self {
            inner: Arc::new(HubInner {
                tx,
                consumers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                metrics,
            }),
        }
    }

    /// Replace the current snapshot and wake consumers
    ///
    /// Returns false if `snapshot` is not newer than the current one.
    pub fn publish(&self, snapshot: Snapshot) -> bool {
        let tick = snapshot.tick;
        let accepted = self.inner.tx.send_if_modified(move |current| {
            if tick <= current.tick {
                return false;
            }
            *current = Arc::new(snapshot);
            true
        });

        if accepted {
            self.inner.metrics.ticks_published.inc();
        } else {
            warn!(
                tick,
                current = self.latest().tick,
                "Dropping snapshot that is not newer than the current one"
            );
        }
        accepted
    }

    /// Current snapshot; never blocks on the tick pipeline
    pub fn latest(&self) -> Arc<Snapshot> {
        self.inner.tx.borrow().clone()
    }

    /// Register a pull-style consumer
    ///
    /// The current snapshot counts as already seen; read it with
    /// [`Subscription::current`]. `next()` waits for the following tick.
    pub fn subscribe(&self, consumer_id: impl Into<String>) -> Subscription {
        let consumer_id = consumer_id.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let rx = self.inner.tx.subscribe();
        let last_tick = rx.borrow().tick;

        {
            let mut consumers = self.inner.consumers.lock();
            consumers.insert(id, consumer_id.clone());
            self.inner.metrics.subscribers.set(consumers.len() as i64);
        }
        debug!(consumer = %consumer_id, "Consumer subscribed");

        Subscription {
            id,
            consumer_id,
            rx,
            last_tick,
            selected: None,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Register a callback consumer
    ///
    /// Each call to `callback` receives a snapshot newer than the previous
    /// one. Callbacks run on the blocking pool, so a callback slower than
    /// the tick period only sees the latest snapshot when it returns and
    /// never occupies a runtime worker the scheduler needs.
    /// The handle is passed to the callback so it may unsubscribe itself.
    /// A panicking callback ends its subscription.
    pub fn subscribe_fn<F>(
        &self,
        consumer_id: impl Into<String>,
        mut callback: F,
    ) -> Result<SubscriptionHandle, EngineError>
    where
        F: FnMut(&Arc<Snapshot>, &SubscriptionHandle) + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let mut subscription = self.subscribe(consumer_id);
        let handle = SubscriptionHandle {
            id: subscription.id,
            consumer_id: subscription.consumer_id.clone(),
            active: Arc::new(AtomicBool::new(true)),
            cancel: Arc::new(Notify::new()),
            hub: Arc::downgrade(&self.inner),
        };

        let task_handle = handle.clone();
        runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = task_handle.cancel.notified() => break,
                    next = subscription.next() => {
                        let Some(snapshot) = next else { break };
                        if !task_handle.is_active() {
                            break;
                        }
                        let call_handle = task_handle.clone();
                        let delivered = tokio::task::spawn_blocking(move || {
                            callback(&snapshot, &call_handle);
                            callback
                        })
                        .await;
                        match delivered {
                            Ok(returned) => callback = returned,
                            Err(e) => {
                                warn!(
                                    consumer = %task_handle.consumer_id,
                                    error = %e,
                                    "Callback failed, unsubscribing"
                                );
                                task_handle.unsubscribe();
                                break;
                            }
                        }
                    }
                }
            }
            debug!(consumer = %task_handle.consumer_id, "Callback consumer stopped");
        });

        Ok(handle)
    }

    /// Number of live consumers
    pub fn subscriber_count(&self) -> usize {
        self.inner.consumers.lock().len()
    }

    /// Ids of live consumers
    pub fn consumers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.consumers.lock().values().cloned().collect();
        ids.sort();
        ids
    }
}

/// Pull-style consumer registration
///
/// Dropping the subscription unsubscribes.
pub struct Subscription {
    id: u64,
    consumer_id: String,
    rx: watch::Receiver<Arc<Snapshot>>,
    last_tick: u64,
    selected: Option<String>,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    /// Wait for a snapshot newer than the last one returned
    ///
    /// Returns `None` once every hub handle has been dropped.
    pub async fn next(&mut self) -> Option<Arc<Snapshot>> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let snapshot = self.rx.borrow_and_update().clone();
            if snapshot.tick > self.last_tick {
                self.last_tick = snapshot.tick;
                return Some(snapshot);
            }
        }
    }

    /// Current snapshot without waiting
    pub fn current(&mut self) -> Arc<Snapshot> {
        let snapshot = self.rx.borrow_and_update().clone();
        self.last_tick = self.last_tick.max(snapshot.tick);
        snapshot
    }

    /// Tick ordinal of the last snapshot handed out
    pub fn last_tick(&self) -> u64 {
        self.last_tick
    }

    /// Focus this consumer on one instrument
    ///
    /// Local to this subscription; other consumers are unaffected.
    pub fn select_instrument(&mut self, symbol: &str) -> Result<(), EngineError> {
        let known = self.rx.borrow().instrument(symbol).is_some();
        if !known {
            return Err(EngineError::UnknownSymbol(symbol.to_string()));
        }
        self.selected = Some(symbol.to_string());
        Ok(())
    }

    pub fn selected_symbol(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The selected instrument's view within `snapshot`
    pub fn selected<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a InstrumentSnapshot> {
        self.selected
            .as_deref()
            .and_then(|symbol| snapshot.instrument(symbol))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unregister(self.id);
        }
    }
}

/// Control handle for a callback consumer
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: u64,
    consumer_id: String,
    active: Arc<AtomicBool>,
    cancel: Arc<Notify>,
    hub: Weak<HubInner>,
}

impl SubscriptionHandle {
    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop deliveries
    ///
    /// Idempotent, and safe to call from inside the callback. No callback
    /// starts after this returns.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            self.cancel.notify_one();
            if let Some(hub) = self.hub.upgrade() {
                hub.unregister(self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::Pipeline;
    use std::time::Duration;

    fn hub_and_pipeline() -> (SnapshotHub, Pipeline) {
        let mut config = Config::default();
        config.engine.rng_seed = Some(11);
        let pipeline = Pipeline::new(&config).unwrap();
        let hub = SnapshotHub::new(pipeline.snapshot(), pipeline.metrics().clone());
        (hub, pipeline)
    }

    #[test]
    fn test_latest_starts_at_seed() {
        let (hub, _) = hub_and_pipeline();
        assert_eq!(hub.latest().tick, 0);
    }

    #[test]
    fn test_publish_rejects_older_ticks() {
        let (hub, mut pipeline) = hub_and_pipeline();
        let first = pipeline.tick(1_000).snapshot;
        let second = pipeline.tick(2_000).snapshot;

        assert!(hub.publish(second));
        assert!(!hub.publish(first));
        assert_eq!(hub.latest().tick, 2);
    }

    #[test]
    fn test_subscriber_count_tracks_drops() {
        let (hub, _) = hub_and_pipeline();
        let a = hub.subscribe("ticker");
        let b = hub.subscribe("chart");
        assert_eq!(hub.subscriber_count(), 2);
        assert_eq!(hub.consumers(), vec!["chart".to_string(), "ticker".to_string()]);

        drop(a);
        assert_eq!(hub.subscriber_count(), 1);
        drop(b);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_select_instrument_is_local() {
        let (hub, _) = hub_and_pipeline();
        let mut a = hub.subscribe("a");
        let b = hub.subscribe("b");

        a.select_instrument("NVDA").unwrap();
        assert_eq!(a.selected_symbol(), Some("NVDA"));
        assert_eq!(b.selected_symbol(), None);

        let err = a.select_instrument("NOPE").unwrap_err();
        assert_eq!(err, EngineError::UnknownSymbol("NOPE".into()));
        assert_eq!(a.selected_symbol(), Some("NVDA"));

        let latest = hub.latest();
        assert_eq!(a.selected(&latest).unwrap().instrument.symbol, "NVDA");
    }

    #[tokio::test]
    async fn test_slow_consumer_sees_latest_only() {
        let (hub, mut pipeline) = hub_and_pipeline();
        let mut sub = hub.subscribe("slow");

        for t in 1..=5 {
            hub.publish(pipeline.tick(t * 1_000).snapshot);
        }

        let snap = sub.next().await.unwrap();
        assert_eq!(snap.tick, 5);

        hub.publish(pipeline.tick(6_000).snapshot);
        assert_eq!(sub.next().await.unwrap().tick, 6);
    }

    #[test]
    fn test_subscribe_fn_requires_runtime() {
        let (hub, _) = hub_and_pipeline();
        let result = hub.subscribe_fn("cb", |_, _| {});
        assert!(matches!(result, Err(EngineError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_unsubscribe_inside_callback() {
        let (hub, mut pipeline) = hub_and_pipeline();
        let calls = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&calls);

        let handle = hub
            .subscribe_fn("once", move |_, handle| {
                seen.fetch_add(1, Ordering::SeqCst);
                handle.unsubscribe();
                handle.unsubscribe();
            })
            .unwrap();

        hub.publish(pipeline.tick(1_000).snapshot);
        tokio::time::sleep(Duration::from_millis(50)).await;
        hub.publish(pipeline.tick(2_000).snapshot);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!handle.is_active());
        assert_eq!(hub.subscriber_count(), 0);
        handle.unsubscribe();
    }

    #[tokio::test]
    async fn test_panicking_callback_is_unsubscribed() {
        let (hub, mut pipeline) = hub_and_pipeline();
        let handle = hub
            .subscribe_fn("faulty", |_, _| panic!("consumer bug"))
            .unwrap();
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(pipeline.tick(1_000).snapshot);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!handle.is_active());
        assert_eq!(hub.subscriber_count(), 0);
        // Publishing keeps working for everyone else
        assert!(hub.publish(pipeline.tick(2_000).snapshot));
    }
}
