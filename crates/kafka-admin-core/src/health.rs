//! Health of the two metadata sources and of the published snapshot.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Component backed by the coordination service
pub const ZOOKEEPER_COMPONENT: &str = "zookeeper";
/// Component backed by the broker group registry
pub const KAFKA_COMPONENT: &str = "kafka";

/// Health status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Serving a snapshot, but it is no longer being refreshed
    Degraded,
    /// Nothing usable to serve
    Unhealthy,
}

impl Default for HealthStatus {
    fn default() -> Self {
        HealthStatus::Healthy
    }
}

/// Individual component health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    /// Last check timestamp (epoch ms)
    pub last_checked: i64,
    /// Time since last successful operation (ms)
    pub last_success_ms: Option<u64>,
}

/// Overall health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall status (worst of all components)
    pub status: HealthStatus,
    pub uptime_secs: f64,
    pub components: Vec<ComponentHealth>,
    /// Groups in the published snapshot
    pub groups: usize,
    /// Age of the published snapshot; `None` before the first publish
    pub snapshot_age_secs: Option<f64>,
}

struct ComponentState {
    status: HealthStatus,
    message: Option<String>,
    last_checked: Instant,
    last_success: Option<Instant>,
}

struct PublishState {
    at: Instant,
    groups: usize,
}

/// Health check manager
pub struct HealthCheck {
    start_time: Instant,
    components: RwLock<BTreeMap<String, ComponentState>>,
    last_publish: RwLock<Option<PublishState>>,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthCheck {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            components: RwLock::new(BTreeMap::new()),
            last_publish: RwLock::new(None),
        }
    }

    /// Register a component as healthy.
    pub fn register_component(&self, name: &str) {
        let now = Instant::now();
        self.components.write().insert(
            name.to_string(),
            ComponentState {
                status: HealthStatus::Healthy,
                message: None,
                last_checked: now,
                last_success: Some(now),
            },
        );
        debug!("Registered health component: {}", name);
    }

    pub fn update_component(&self, name: &str, status: HealthStatus, message: Option<&str>) {
        let mut components = self.components.write();
        let now = Instant::now();

        let state = components
            .entry(name.to_string())
            .or_insert_with(|| ComponentState {
                status,
                message: None,
                last_checked: now,
                last_success: None,
            });

        let was_healthy = state.status == HealthStatus::Healthy;
        state.status = status;
        state.message = message.map(|s| s.to_string());
        state.last_checked = now;

        if status == HealthStatus::Healthy {
            state.last_success = Some(now);
        }

        if was_healthy && status != HealthStatus::Healthy {
            warn!("Component {} became {:?}: {:?}", name, status, message);
        } else if !was_healthy && status == HealthStatus::Healthy {
            info!("Component {} recovered", name);
        }
    }

    pub fn mark_healthy(&self, name: &str) {
        self.update_component(name, HealthStatus::Healthy, None);
    }

    pub fn mark_degraded(&self, name: &str, message: &str) {
        self.update_component(name, HealthStatus::Degraded, Some(message));
    }

    pub fn mark_unhealthy(&self, name: &str, message: &str) {
        self.update_component(name, HealthStatus::Unhealthy, Some(message));
    }

    /// Record that a snapshot with `groups` groups was published.
    pub fn record_publish(&self, groups: usize) {
        *self.last_publish.write() = Some(PublishState {
            at: Instant::now(),
            groups,
        });
    }

    /// Worst status across components.
    pub fn status(&self) -> HealthStatus {
        let components = self.components.read();

        let mut worst = HealthStatus::Healthy;
        for state in components.values() {
            match state.status {
                HealthStatus::Unhealthy => return HealthStatus::Unhealthy,
                HealthStatus::Degraded => worst = HealthStatus::Degraded,
                HealthStatus::Healthy => {}
            }
        }
        worst
    }

    pub fn report(&self) -> HealthReport {
        let components = self.components.read();
        let now = Instant::now();

        let component_health: Vec<ComponentHealth> = components
            .iter()
            .map(|(name, state)| ComponentHealth {
                name: name.clone(),
                status: state.status,
                message: state.message.clone(),
                last_checked: chrono::Utc::now().timestamp_millis()
                    - (now - state.last_checked).as_millis() as i64,
                last_success_ms: state.last_success.map(|t| (now - t).as_millis() as u64),
            })
            .collect();
        drop(components);

        let last_publish = self.last_publish.read();
        HealthReport {
            status: self.status(),
            uptime_secs: self.start_time.elapsed().as_secs_f64(),
            components: component_health,
            groups: last_publish.as_ref().map_or(0, |p| p.groups),
            snapshot_age_secs: last_publish
                .as_ref()
                .map(|p| (now - p.at).as_secs_f64()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status() == HealthStatus::Healthy
    }

    /// Healthy or degraded
    pub fn is_operational(&self) -> bool {
        self.status() != HealthStatus::Unhealthy
    }
}

impl std::fmt::Display for HealthReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Health Report ===")?;
        writeln!(f, "Status: {:?}", self.status)?;
        writeln!(f, "Uptime: {:.0}s", self.uptime_secs)?;
        writeln!(f, "Groups: {}", self.groups)?;
        match self.snapshot_age_secs {
            Some(age) => writeln!(f, "Snapshot Age: {:.1}s", age)?,
            None => writeln!(f, "Snapshot Age: never published")?,
        }
        writeln!(f)?;
        writeln!(f, "Components:")?;
        for comp in &self.components {
            write!(f, "  {}: {:?}", comp.name, comp.status)?;
            if let Some(ref msg) = comp.message {
                write!(f, " - {}", msg)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
