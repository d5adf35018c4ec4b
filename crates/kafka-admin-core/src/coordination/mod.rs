//! Coordination service access (ZooKeeper).
//!
//! The legacy consumer registry and the broker registrations live in the
//! ZooKeeper tree. Access goes through [`CoordinationClient`] so the scanners
//! can run against a live ensemble or the in-memory tree used in tests.

mod memory;
mod zookeeper;

pub use memory::MemoryCoordination;
pub use zookeeper::ZooKeeperClient;

use async_trait::async_trait;

use crate::Result;

/// Root of the legacy consumer registry
pub const CONSUMERS_PATH: &str = "/consumers";
/// Broker registrations
pub const BROKER_IDS_PATH: &str = "/brokers/ids";
/// Topic registrations
pub const BROKER_TOPICS_PATH: &str = "/brokers/topics";

/// Hierarchical key listing and reads.
///
/// A node that does not exist is reported as `Ok(None)`, never as an error,
/// so callers can tell a vanished node from an unreachable service.
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    /// Child names of `path`, or `None` if `path` does not exist.
    async fn children(&self, path: &str) -> Result<Option<Vec<String>>>;

    /// Data stored at `path`, or `None` if `path` does not exist.
    async fn data(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Short backend name used in logs
    fn name(&self) -> &str;
}

/// `/consumers/<group>/offsets`
pub fn group_offsets_path(group: &str) -> String {
    format!("{}/{}/offsets", CONSUMERS_PATH, group)
}

/// `/consumers/<group>/offsets/<topic>`
pub fn topic_offsets_path(group: &str, topic: &str) -> String {
    format!("{}/{}", group_offsets_path(group), topic)
}

/// `/consumers/<group>/offsets/<topic>/<partition>`
pub fn partition_offset_path(group: &str, topic: &str, partition: &str) -> String {
    format!("{}/{}", topic_offsets_path(group, topic), partition)
}
