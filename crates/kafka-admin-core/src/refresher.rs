//! Background refresh loop.
//!
//! Each cycle scans both registries concurrently, merges the results and
//! publishes them to the [`OffsetStore`]. A cycle in which either scanner
//! fails publishes nothing, so readers keep the last good snapshot.

use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::broker::GroupAdmin;
use crate::coordination::CoordinationClient;
use crate::health::{HealthCheck, KAFKA_COMPONENT, ZOOKEEPER_COMPONENT};
use crate::metrics::{AdminMetrics, CycleOutcome};
use crate::model::OffsetSnapshot;
use crate::offset_store::OffsetStore;
use crate::scan::{self, scan_legacy_groups, scan_native_groups};
use crate::Result;

/// Where the refresher is within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// Between cycles, or after a failed cycle.
    Idle,
    Scanning,
    Merging,
    /// Installing the merged snapshot. Momentary: the swap does not await, so
    /// only a reader on another thread can catch it before `Idle`.
    Published,
}

pub struct Refresher {
    coordination: Arc<dyn CoordinationClient>,
    admin: Arc<dyn GroupAdmin>,
    store: Arc<OffsetStore>,
    health: Arc<HealthCheck>,
    metrics: Arc<AdminMetrics>,
    interval: Duration,
    max_concurrent_groups: usize,
    state: Mutex<RefreshState>,
}

impl Refresher {
    pub fn new(
        coordination: Arc<dyn CoordinationClient>,
        admin: Arc<dyn GroupAdmin>,
        store: Arc<OffsetStore>,
        health: Arc<HealthCheck>,
        metrics: Arc<AdminMetrics>,
        interval: Duration,
        max_concurrent_groups: usize,
    ) -> Self {
        health.register_component(ZOOKEEPER_COMPONENT);
        health.register_component(KAFKA_COMPONENT);
        Self {
            coordination,
            admin,
            store,
            health,
            metrics,
            interval,
            max_concurrent_groups,
            state: Mutex::new(RefreshState::Idle),
        }
    }

    pub fn state(&self) -> RefreshState {
        *self.state.lock()
    }

    fn set_state(&self, state: RefreshState) {
        *self.state.lock() = state;
    }

    /// Run one cycle. Returns the number of groups published.
    pub async fn refresh_once(&self) -> Result<usize> {
        let start = Instant::now();
        self.set_state(RefreshState::Scanning);

        let (legacy, native) = tokio::join!(
            scan_legacy_groups(self.coordination.as_ref()),
            scan_native_groups(self.admin.clone(), self.max_concurrent_groups),
        );

        let legacy = self.check_scan(ZOOKEEPER_COMPONENT, legacy);
        let native = self.check_scan(KAFKA_COMPONENT, native);

        let (legacy, native) = match (legacy, native) {
            (Ok(legacy), Ok(native)) => (legacy, native),
            (Err(e), _) | (_, Err(e)) => {
                self.set_state(RefreshState::Idle);
                self.metrics.record_cycle(CycleOutcome::Failed);
                return Err(e);
            }
        };

        self.set_state(RefreshState::Merging);
        debug!(
            "Merging {} legacy and {} native groups",
            legacy.len(),
            native.len()
        );
        let snapshot = OffsetSnapshot::new(scan::merge(legacy, native));
        let count = snapshot.len();

        self.metrics.record_publish(&snapshot, start.elapsed());
        self.health.record_publish(count);
        self.set_state(RefreshState::Published);
        self.store.replace(snapshot);

        debug!(
            "Published snapshot with {} groups in {:?}",
            count,
            start.elapsed()
        );
        self.set_state(RefreshState::Idle);
        Ok(count)
    }

    fn check_scan<T>(&self, component: &str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.health.mark_healthy(component),
            Err(e) => {
                warn!("{} scan failed: {}", component, e);
                self.health.mark_unhealthy(component, &e.to_string());
                self.metrics.record_scan_failure(component);
            }
        }
        result
    }

    /// Start the loop as a detached task. The first cycle runs immediately.
    ///
    /// Errors and panics inside a cycle are logged and the loop continues
    /// with the next one. The task never holds up runtime shutdown.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        info!("Starting refresher with interval {:?}", self.interval);
        tokio::spawn(async move {
            loop {
                match AssertUnwindSafe(self.refresh_once()).catch_unwind().await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => warn!("Refresh cycle failed, keeping previous snapshot: {}", e),
                    Err(_) => {
                        error!("Refresh cycle panicked, keeping previous snapshot");
                        self.set_state(RefreshState::Idle);
                        self.metrics.record_cycle(CycleOutcome::Panicked);
                    }
                }

                tokio::time::sleep(self.interval).await;
            }
        })
    }
}
