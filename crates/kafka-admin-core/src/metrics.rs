//! Prometheus metrics for refresh cycles and offset resets.
//!
//! Exposition is left to the embedding process; [`AdminMetrics::encode`]
//! renders the text format.

use parking_lot::RwLock;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;
use std::time::Duration;

use crate::model::{GroupKind, OffsetSnapshot};

/// Refresh duration buckets (seconds): 10ms to 2 minutes.
const REFRESH_DURATION_BUCKETS: [f64; 10] =
    [0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 10.0, 30.0, 120.0];

/// Result of one refresh cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Published,
    Failed,
    Panicked,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Published => "published",
            CycleOutcome::Failed => "failed",
            CycleOutcome::Panicked => "panicked",
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SourceLabels {
    pub source: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct KindLabels {
    pub kind: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StatusLabels {
    pub status: String,
}

pub struct AdminMetrics {
    registry: RwLock<Registry>,

    /// Refresh cycles by outcome.
    pub refresh_cycles_total: Family<OutcomeLabels, Counter>,

    /// Scanner failures by source (`zookeeper` or `kafka`).
    pub scan_failures_total: Family<SourceLabels, Counter>,

    /// Groups in the published snapshot by kind.
    pub groups: Family<KindLabels, Gauge>,

    /// Wall time of successful refresh cycles.
    pub refresh_duration_seconds: Histogram,

    /// Offset reset requests by status.
    pub offset_resets_total: Family<StatusLabels, Counter>,
}

impl Default for AdminMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let refresh_cycles_total = Family::<OutcomeLabels, Counter>::default();
        let scan_failures_total = Family::<SourceLabels, Counter>::default();
        let groups = Family::<KindLabels, Gauge>::default();
        let refresh_duration_seconds = Histogram::new(REFRESH_DURATION_BUCKETS.iter().cloned());
        let offset_resets_total = Family::<StatusLabels, Counter>::default();

        registry.register(
            "kafka_admin_refresh_cycles",
            "Refresh cycles by outcome",
            refresh_cycles_total.clone(),
        );
        registry.register(
            "kafka_admin_scan_failures",
            "Failed group scans by metadata source",
            scan_failures_total.clone(),
        );
        registry.register(
            "kafka_admin_groups",
            "Groups in the published snapshot",
            groups.clone(),
        );
        registry.register(
            "kafka_admin_refresh_duration_seconds",
            "Duration of successful refresh cycles",
            refresh_duration_seconds.clone(),
        );
        registry.register(
            "kafka_admin_offset_resets",
            "Offset reset requests by status",
            offset_resets_total.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            refresh_cycles_total,
            scan_failures_total,
            groups,
            refresh_duration_seconds,
            offset_resets_total,
        }
    }

    pub fn record_cycle(&self, outcome: CycleOutcome) {
        self.refresh_cycles_total
            .get_or_create(&OutcomeLabels {
                outcome: outcome.as_str().to_string(),
            })
            .inc();
    }

    pub fn record_scan_failure(&self, source: &str) {
        self.scan_failures_total
            .get_or_create(&SourceLabels {
                source: source.to_string(),
            })
            .inc();
    }

    /// Record a successful publish and its duration.
    pub fn record_publish(&self, snapshot: &OffsetSnapshot, elapsed: Duration) {
        for kind in [GroupKind::Legacy, GroupKind::Native] {
            self.groups
                .get_or_create(&KindLabels {
                    kind: kind.as_str().to_string(),
                })
                .set(snapshot.count_by_kind(kind) as i64);
        }
        self.refresh_duration_seconds
            .observe(elapsed.as_secs_f64());
        self.record_cycle(CycleOutcome::Published);
    }

    pub fn record_reset(&self, success: bool) {
        let status = if success { "success" } else { "failure" };
        self.offset_resets_total
            .get_or_create(&StatusLabels {
                status: status.to_string(),
            })
            .inc();
    }

    /// Encode all metrics to Prometheus text format.
    pub fn encode(&self) -> String {
        let registry = self.registry.read();
        let mut buffer = String::new();
        if encode(&mut buffer, &registry).is_err() {
            return String::new();
        }
        buffer
    }
}
