//! Consumer group read model shared by the scanners, the offset store and callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Registry a group was discovered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Offsets stored under `/consumers` in ZooKeeper
    Legacy,
    /// Offsets stored by the broker group coordinator
    Native,
}

impl GroupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::Legacy => "legacy",
            GroupKind::Native => "native",
        }
    }
}

/// Committed offset of one group on one topic-partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPartitionOffset {
    pub topic: String,
    pub partition: i32,
    /// `None` when the stored value could not be read as an offset
    pub offset: Option<i64>,
}

impl TopicPartitionOffset {
    pub fn new(topic: impl Into<String>, partition: i32, offset: Option<i64>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

/// A consumer group as observed during one scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub kind: GroupKind,
    /// Sorted by (topic, partition), at most one entry per pair
    pub offsets: Vec<TopicPartitionOffset>,
}

impl Group {
    pub fn new(id: impl Into<String>, kind: GroupKind) -> Self {
        Self {
            id: id.into(),
            kind,
            offsets: Vec::new(),
        }
    }

    /// Insert or overwrite the entry for the entry's topic-partition.
    pub fn insert(&mut self, entry: TopicPartitionOffset) {
        let key = (entry.topic.as_str(), entry.partition);
        match self
            .offsets
            .binary_search_by(|e| (e.topic.as_str(), e.partition).cmp(&key))
        {
            Ok(pos) => self.offsets[pos] = entry,
            Err(pos) => self.offsets.insert(pos, entry),
        }
    }

    pub fn offset(&self, topic: &str, partition: i32) -> Option<&TopicPartitionOffset> {
        self.offsets
            .binary_search_by(|e| (e.topic.as_str(), e.partition).cmp(&(topic, partition)))
            .ok()
            .map(|pos| &self.offsets[pos])
    }

    /// Distinct topics this group holds offsets for, in sorted order.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.offsets.iter().map(|e| e.topic.clone()).collect();
        topics.dedup();
        topics
    }
}

/// Intermediate shape produced by both scanners
pub type GroupMap = BTreeMap<String, Group>;

/// One complete, internally consistent view of all groups
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OffsetSnapshot {
    pub groups: GroupMap,
    /// Publication time (epoch ms); `None` until the first refresh succeeds
    pub refreshed_at: Option<i64>,
}

impl OffsetSnapshot {
    pub fn new(groups: GroupMap) -> Self {
        Self {
            groups,
            refreshed_at: Some(chrono::Utc::now().timestamp_millis()),
        }
    }

    pub fn get(&self, group_id: &str) -> Option<&Group> {
        self.groups.get(group_id)
    }

    pub fn group_ids(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn count_by_kind(&self, kind: GroupKind) -> usize {
        self.groups.values().filter(|g| g.kind == kind).count()
    }
}

/// Broker registration as stored under `/brokers/ids/<id>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerDescriptor {
    pub id: i32,
    pub host: String,
    pub port: i32,
    /// -1 when JMX is disabled on the broker
    pub jmx_port: i32,
}

impl BrokerDescriptor {
    pub fn jmx_enabled(&self) -> bool {
        self.jmx_port > 0
    }
}
