//! Scheduled fetch-and-normalize coordinator.
//!
//! One coordinator owns one station: it drives the periodic fetch,
//! normalizes the payload, and publishes the resulting snapshot to every
//! subscribed presentation entity. On upstream failure it serves the last
//! successful snapshot while that snapshot is younger than the retention
//! window, after which failures surface and entities go unavailable.
//!
//! Refreshes are serialized through a one-slot gate: a caller arriving
//! while another refresh is in flight waits for it and reuses its outcome
//! instead of issuing a duplicate request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{watch, Mutex, Notify};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::{GaugeConfig, CACHE_RETENTION_SECS};
use crate::error::{GaugeError, Result};
use crate::fetcher::StationSource;
use crate::normalizer::normalize;
use crate::types::StationSnapshot;

/// Last successfully normalized snapshot plus when it was fetched.
/// Overwritten only on success, read (never cleared) on failure.
struct CachedState {
    snapshot: Arc<StationSnapshot>,
    fetched_at: Instant,
}

pub struct GaugeCoordinator {
    source: Arc<dyn StationSource>,
    config: GaugeConfig,
    /// One-slot in-flight guard: refreshes are serialized here.
    gate: Mutex<()>,
    /// Bumped after every completed refresh attempt. A caller that sees
    /// this advance while waiting on the gate reuses `last_outcome`.
    generation: AtomicU64,
    last_outcome: StdMutex<Option<Result<Arc<StationSnapshot>>>>,
    cached: StdMutex<Option<CachedState>>,
    /// Publication is atomic replacement of the snapshot reference;
    /// entities never observe partial state.
    publish_tx: watch::Sender<Option<Arc<StationSnapshot>>>,
    last_error: StdMutex<Option<String>>,
    shutdown: Notify,
}

impl GaugeCoordinator {
    pub fn new(source: Arc<dyn StationSource>, config: GaugeConfig) -> Arc<Self> {
        let (publish_tx, _) = watch::channel(None);
        Arc::new(Self {
            source,
            config,
            gate: Mutex::new(()),
            generation: AtomicU64::new(0),
            last_outcome: StdMutex::new(None),
            cached: StdMutex::new(None),
            publish_tx,
            last_error: StdMutex::new(None),
            shutdown: Notify::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Read surface for presentation entities
    // -----------------------------------------------------------------------

    /// Latest published snapshot, or `None` before the first success (and
    /// after a surfaced failure).
    pub fn current_snapshot(&self) -> Option<Arc<StationSnapshot>> {
        self.publish_tx.borrow().clone()
    }

    /// Re-render signal: receivers wake on every publication change.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<StationSnapshot>>> {
        self.publish_tx.subscribe()
    }

    pub fn station_id(&self) -> &str {
        &self.config.station_id
    }

    pub fn config(&self) -> &GaugeConfig {
        &self.config
    }

    /// Device name for the host's device registry: the station name from
    /// the latest snapshot when known, else the configured id.
    pub fn device_name(&self) -> String {
        self.current_snapshot()
            .and_then(|s| s.device.name.clone())
            .unwrap_or_else(|| self.config.station_id.clone())
    }

    /// True once a snapshot is published. A stale snapshot served from
    /// the fallback cache counts.
    pub fn is_ready(&self) -> bool {
        self.publish_tx.borrow().is_some()
    }

    /// Message of the last surfaced failure, retained for diagnostics.
    /// Cleared on the next successful refresh.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    /// Initial on-demand load after setup. The cache starts empty, so any
    /// failure here surfaces directly to the caller.
    pub async fn first_refresh(&self) -> Result<Arc<StationSnapshot>> {
        self.refresh().await
    }

    /// Fetch, normalize, publish. At most one fetch is in flight at a
    /// time: concurrent callers coalesce onto it and all observe the same
    /// snapshot or error.
    pub async fn refresh(&self) -> Result<Arc<StationSnapshot>> {
        let seen = self.generation.load(Ordering::Acquire);
        let _gate = self.gate.lock().await;

        if self.generation.load(Ordering::Acquire) != seen {
            // A refresh completed while we waited on the gate.
            let reused = self.last_outcome.lock().unwrap().clone();
            if let Some(result) = reused {
                debug!(
                    station = %self.config.station_id,
                    "coalesced onto the refresh that was already in flight"
                );
                return result;
            }
        }

        let result = self.execute_refresh().await;

        *self.last_outcome.lock().unwrap() = Some(result.clone());
        self.generation.fetch_add(1, Ordering::AcqRel);
        result
    }

    /// Runs with the gate held.
    async fn execute_refresh(&self) -> Result<Arc<StationSnapshot>> {
        match self.source.fetch_station(&self.config.station_id).await {
            Ok(raw) => {
                let snapshot = Arc::new(normalize(&raw));
                *self.cached.lock().unwrap() = Some(CachedState {
                    snapshot: Arc::clone(&snapshot),
                    fetched_at: Instant::now(),
                });
                *self.last_error.lock().unwrap() = None;
                self.publish_tx.send_replace(Some(Arc::clone(&snapshot)));
                debug!(station = %self.config.station_id, "refresh succeeded");
                Ok(snapshot)
            }
            Err(err) => self.fall_back(err),
        }
    }

    /// Staleness-bounded fallback: serve the cached snapshot while it is
    /// younger than the retention window, otherwise surface the failure
    /// and unpublish so entities go unavailable. The retention rule is
    /// uniform across all error kinds, `StationNotFound` included.
    fn fall_back(&self, err: GaugeError) -> Result<Arc<StationSnapshot>> {
        {
            let cached = self.cached.lock().unwrap();
            if let Some(state) = cached.as_ref() {
                let age = state.fetched_at.elapsed();
                if age < Duration::from_secs(CACHE_RETENTION_SECS) {
                    warn!(
                        station = %self.config.station_id,
                        age_secs = age.as_secs(),
                        "upstream unavailable, serving cached snapshot: {err}"
                    );
                    return Ok(Arc::clone(&state.snapshot));
                }
                error!(
                    station = %self.config.station_id,
                    age_secs = age.as_secs(),
                    "upstream unavailable past the retention window: {err}"
                );
            } else {
                error!(
                    station = %self.config.station_id,
                    "upstream unavailable with no cached snapshot: {err}"
                );
            }
        }

        *self.last_error.lock().unwrap() = Some(err.to_string());
        self.publish_tx.send_replace(None);
        Err(err)
    }

    // -----------------------------------------------------------------------
    // Scheduler
    // -----------------------------------------------------------------------

    /// Drives refresh at the configured cadence until shutdown is
    /// requested. The immediate first tick is skipped — setup already ran
    /// [`Self::first_refresh`]. A failed tick is logged by the refresh
    /// path and retried on the next one.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = interval(self.config.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!(
            station = %self.config.station_id,
            interval_secs = self.config.scan_interval.as_secs(),
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // An in-flight refresh completes inside this arm;
                    // shutdown takes effect only between cycles.
                    let _ = self.refresh().await;
                }
                _ = self.shutdown.notified() => {
                    info!(station = %self.config.station_id, "scheduler stopped");
                    break;
                }
            }
        }
    }

    /// Ask the scheduler loop to stop after the current cycle. No partial
    /// state is published on teardown.
    pub fn request_shutdown(&self) {
        self.shutdown.notify_one();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Scripted station source: pops one step per fetch, counting calls.
    /// An optional per-fetch delay widens the in-flight window for the
    /// coalescing tests.
    struct ScriptedSource {
        calls: AtomicUsize,
        script: StdMutex<VecDeque<Result<Value>>>,
        delay: Duration,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Result<Value>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: StdMutex::new(steps.into()),
                delay: Duration::ZERO,
            })
        }

        fn with_delay(steps: Vec<Result<Value>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: StdMutex::new(steps.into()),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StationSource for ScriptedSource {
        async fn fetch_station(&self, _station_id: &str) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GaugeError::Upstream("script exhausted".to_string())))
        }
    }

    fn payload(stage: f64) -> Value {
        json!({
            "lid": "PTTP1",
            "name": "Point Marion",
            "status": { "observed": { "primary": stage, "primaryUnit": "ft" } }
        })
    }

    fn coordinator(source: Arc<ScriptedSource>) -> Arc<GaugeCoordinator> {
        let cfg = GaugeConfig::with_defaults("PTTP1").unwrap();
        GaugeCoordinator::new(source, cfg)
    }

    fn timeout_err() -> GaugeError {
        GaugeError::UpstreamTimeout("PTTP1".to_string())
    }

    #[tokio::test]
    async fn refresh_success_publishes_and_caches() {
        let source = ScriptedSource::new(vec![Ok(payload(12.3))]);
        let coord = coordinator(Arc::clone(&source));

        assert!(!coord.is_ready());
        let snap = coord.first_refresh().await.unwrap();
        assert_eq!(snap.stage, Some(12.3));
        assert!(coord.is_ready());
        assert_eq!(coord.device_name(), "Point Marion");
        assert!(coord.last_error().is_none());
        assert!(Arc::ptr_eq(&snap, &coord.current_snapshot().unwrap()));
    }

    #[tokio::test]
    async fn first_refresh_failure_surfaces() {
        let source = ScriptedSource::new(vec![Err(timeout_err())]);
        let coord = coordinator(source);

        let err = coord.first_refresh().await.unwrap_err();
        assert_eq!(err, timeout_err());
        assert!(!coord.is_ready());
        assert!(coord.last_error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_within_retention_serves_cached_snapshot() {
        let source = ScriptedSource::new(vec![Ok(payload(12.3)), Err(timeout_err())]);
        let coord = coordinator(Arc::clone(&source));

        let first = coord.refresh().await.unwrap();
        tokio::time::advance(Duration::from_secs(30 * 60)).await;

        let stale = coord.refresh().await.unwrap();
        assert!(Arc::ptr_eq(&first, &stale));
        // Entities keep showing last-known values.
        assert!(coord.is_ready());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_past_retention_surfaces_and_unpublishes() {
        let source = ScriptedSource::new(vec![Ok(payload(12.3)), Err(timeout_err())]);
        let coord = coordinator(source);

        coord.refresh().await.unwrap();
        tokio::time::advance(Duration::from_secs(61 * 60)).await;

        let err = coord.refresh().await.unwrap_err();
        assert_eq!(err, timeout_err());
        assert!(!coord.is_ready());
        assert_eq!(coord.last_error(), Some(timeout_err().to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn station_not_found_obeys_the_same_retention_rule() {
        let not_found = GaugeError::StationNotFound("PTTP1".to_string());
        let source = ScriptedSource::new(vec![
            Ok(payload(12.3)),
            Err(not_found.clone()),
            Err(not_found.clone()),
        ]);
        let coord = coordinator(source);

        coord.refresh().await.unwrap();

        // Inside the window: masked like any transient failure.
        tokio::time::advance(Duration::from_secs(30 * 60)).await;
        assert!(coord.refresh().await.is_ok());

        // Past the window: surfaced with its own identity.
        tokio::time::advance(Duration::from_secs(31 * 60)).await;
        assert_eq!(coord.refresh().await.unwrap_err(), not_found);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_refresh_resets_the_retention_clock() {
        let source = ScriptedSource::new(vec![
            Ok(payload(12.3)),
            Ok(payload(13.0)),
            Err(timeout_err()),
        ]);
        let coord = coordinator(source);

        coord.refresh().await.unwrap();
        tokio::time::advance(Duration::from_secs(50 * 60)).await;
        let second = coord.refresh().await.unwrap();

        // 50 minutes later again — only 50 from the *second* success.
        tokio::time::advance(Duration::from_secs(50 * 60)).await;
        let stale = coord.refresh().await.unwrap();
        assert!(Arc::ptr_eq(&second, &stale));
        assert_eq!(stale.stage, Some(13.0));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_issue_exactly_one_fetch() {
        let source = ScriptedSource::with_delay(
            vec![Ok(payload(12.3))],
            Duration::from_millis(200),
        );
        let coord = coordinator(Arc::clone(&source));

        let a = tokio::spawn({
            let coord = Arc::clone(&coord);
            async move { coord.refresh().await }
        });
        let b = tokio::spawn({
            let coord = Arc::clone(&coord);
            async move { coord.refresh().await }
        });
        let c = tokio::spawn({
            let coord = Arc::clone(&coord);
            async move { coord.refresh().await }
        });

        let snap_a = a.await.unwrap().unwrap();
        let snap_b = b.await.unwrap().unwrap();
        let snap_c = c.await.unwrap().unwrap();

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&snap_a, &snap_b));
        assert!(Arc::ptr_eq(&snap_a, &snap_c));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_share_the_same_error() {
        let source = ScriptedSource::with_delay(
            vec![Err(timeout_err())],
            Duration::from_millis(200),
        );
        let coord = coordinator(Arc::clone(&source));

        let a = tokio::spawn({
            let coord = Arc::clone(&coord);
            async move { coord.refresh().await }
        });
        let b = tokio::spawn({
            let coord = Arc::clone(&coord);
            async move { coord.refresh().await }
        });

        assert_eq!(a.await.unwrap().unwrap_err(), timeout_err());
        assert_eq!(b.await.unwrap().unwrap_err(), timeout_err());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn sequential_refreshes_fetch_again() {
        let source = ScriptedSource::new(vec![Ok(payload(12.3)), Ok(payload(12.3))]);
        let coord = coordinator(Arc::clone(&source));

        let first = coord.refresh().await.unwrap();
        let second = coord.refresh().await.unwrap();
        assert_eq!(source.calls(), 2);
        // Identical upstream payloads produce identical snapshots.
        assert_eq!(*first, *second);
    }

    #[tokio::test]
    async fn subscribers_wake_on_publication() {
        let source = ScriptedSource::new(vec![Ok(payload(12.3))]);
        let coord = coordinator(source);

        let mut rx = coord.subscribe();
        assert!(rx.borrow().is_none());

        coord.refresh().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().stage, Some(12.3));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_ticks_and_stops_on_shutdown() {
        let source = ScriptedSource::new(vec![
            Ok(payload(12.3)),
            Ok(payload(12.4)),
            Ok(payload(12.5)),
        ]);
        let coord = coordinator(Arc::clone(&source));

        coord.first_refresh().await.unwrap();
        assert_eq!(source.calls(), 1);

        let handle = tokio::spawn(Arc::clone(&coord).run());

        // Default cadence is 300s; cross two ticks.
        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(source.calls(), 2);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.calls(), 3);

        coord.request_shutdown();
        handle.await.unwrap();

        // No further ticks after shutdown.
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_keeps_running_after_a_failed_tick() {
        let source = ScriptedSource::new(vec![
            Ok(payload(12.3)),
            Err(timeout_err()),
            Ok(payload(12.5)),
        ]);
        let coord = coordinator(Arc::clone(&source));

        coord.first_refresh().await.unwrap();
        let handle = tokio::spawn(Arc::clone(&coord).run());

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(source.calls(), 2);
        // Masked by the cache — still ready.
        assert!(coord.is_ready());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.calls(), 3);
        assert_eq!(coord.current_snapshot().unwrap().stage, Some(12.5));

        coord.request_shutdown();
        handle.await.unwrap();
    }
}
