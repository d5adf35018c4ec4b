//! Test helper utilities.
//!
//! Builds a facade over in-memory collaborators and seeds both registries.

use std::sync::Arc;

use kafka_admin_core::{AdminFacade, MemoryCoordination, MemoryGroupAdmin, RefreshConfig};

/// Facade plus handles on both in-memory sources
pub struct TestCluster {
    pub zookeeper: Arc<MemoryCoordination>,
    pub kafka: MemoryGroupAdmin,
    pub facade: AdminFacade,
}

/// Create a facade with empty registries.
pub fn test_cluster() -> TestCluster {
    let zookeeper = Arc::new(MemoryCoordination::new());
    let kafka = MemoryGroupAdmin::new();
    let facade = AdminFacade::new(
        zookeeper.clone(),
        Arc::new(kafka.clone()),
        &RefreshConfig::default(),
    );
    TestCluster {
        zookeeper,
        kafka,
        facade,
    }
}

impl TestCluster {
    /// Store a legacy offset under `/consumers`.
    pub fn legacy_offset(&self, group: &str, topic: &str, partition: i32, offset: &str) {
        self.zookeeper.set(
            &format!("/consumers/{}/offsets/{}/{}", group, topic, partition),
            offset,
        );
    }

    /// Assign a partition to a native group member and commit an offset for it.
    pub fn native_offset(&self, group: &str, topic: &str, partition: i32, offset: i64) {
        self.kafka.assign(group, "consumer-1", topic, &[partition]);
        self.kafka.commit(group, topic, partition, offset);
    }

    /// Offset of a group on a partition in the current snapshot.
    pub fn snapshot_offset(&self, group: &str, topic: &str, partition: i32) -> Option<i64> {
        self.facade
            .get_group(group)
            .and_then(|g| g.offset(topic, partition).cloned())
            .and_then(|entry| entry.offset)
    }
}
