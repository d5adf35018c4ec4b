//! Kafka Admin Core Library
//!
//! Aggregates consumer group metadata from the two places Kafka keeps it:
//! the legacy ZooKeeper registry under `/consumers` and the broker group
//! coordinators. A background refresher scans both, merges them and
//! publishes an immutable snapshot that readers query without blocking.
//! Offsets can be reset through a short-lived consumer bound to the group.

pub mod broker;
pub mod cluster;
pub mod config;
pub mod coordination;
pub mod error;
pub mod facade;
pub mod health;
pub mod kafka;
pub mod metrics;
pub mod model;
pub mod offset_store;
pub mod refresher;
pub mod reset;
pub mod scan;

pub use broker::{GroupAdmin, GroupConsumer, KafkaGroupAdmin, MemberAssignment, MemoryGroupAdmin};
pub use config::{Config, KafkaConfig, RefreshConfig, ZooKeeperConfig};
pub use coordination::{CoordinationClient, MemoryCoordination, ZooKeeperClient};
pub use error::{CoordinationError, Error, KafkaError, Result};
pub use facade::AdminFacade;
pub use health::{HealthCheck, HealthReport, HealthStatus};
pub use metrics::AdminMetrics;
pub use model::{BrokerDescriptor, Group, GroupKind, GroupMap, OffsetSnapshot, TopicPartitionOffset};
pub use offset_store::OffsetStore;
pub use refresher::{RefreshState, Refresher};
