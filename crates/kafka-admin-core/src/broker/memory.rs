//! In-memory group registry for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::{GroupAdmin, GroupConsumer, MemberAssignment};
use crate::error::KafkaError;
use crate::Result;

#[derive(Default)]
struct RegistryState {
    members: BTreeMap<String, Vec<MemberAssignment>>,
    /// (group, topic, partition) -> committed offset
    committed: BTreeMap<(String, String, i32), i64>,
    /// Groups whose describe call fails
    broken: BTreeSet<String>,
    /// Commits for these groups are rejected
    read_only: BTreeSet<String>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<RegistryState>,
    unavailable: AtomicBool,
    unavailable_after_listing: AtomicBool,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// In-memory broker group registry.
///
/// Mirrors how a coordinator behaves for the operations the facade uses and
/// counts consumer opens and closes so tests can assert nothing leaks.
#[derive(Clone, Default)]
pub struct MemoryGroupAdmin {
    shared: Arc<Shared>,
}

impl MemoryGroupAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member holding `partitions` of `topic`.
    pub fn assign(&self, group_id: &str, member_id: &str, topic: &str, partitions: &[i32]) {
        let mut state = self.shared.state.lock();
        let members = state.members.entry(group_id.to_string()).or_default();
        let index = match members.iter().position(|m| m.member_id == member_id) {
            Some(index) => index,
            None => {
                members.push(MemberAssignment {
                    member_id: member_id.to_string(),
                    client_id: member_id.to_string(),
                    client_host: "/127.0.0.1".to_string(),
                    partitions: BTreeMap::new(),
                });
                members.len() - 1
            }
        };
        let assigned = members[index]
            .partitions
            .entry(topic.to_string())
            .or_default();
        assigned.extend_from_slice(partitions);
        assigned.sort_unstable();
        assigned.dedup();
    }

    /// Register a group with no members (e.g. an offsets-only group).
    pub fn add_empty_group(&self, group_id: &str) {
        self.shared
            .state
            .lock()
            .members
            .entry(group_id.to_string())
            .or_default();
    }

    pub fn remove_group(&self, group_id: &str) {
        let mut state = self.shared.state.lock();
        state.members.remove(group_id);
        state.committed.retain(|(g, _, _), _| g != group_id);
    }

    /// Store a committed offset directly, as a live consumer would.
    pub fn commit(&self, group_id: &str, topic: &str, partition: i32, offset: i64) {
        self.shared.state.lock().committed.insert(
            (group_id.to_string(), topic.to_string(), partition),
            offset,
        );
    }

    pub fn committed_offset(&self, group_id: &str, topic: &str, partition: i32) -> Option<i64> {
        self.shared
            .state
            .lock()
            .committed
            .get(&(group_id.to_string(), topic.to_string(), partition))
            .copied()
    }

    /// Make every call fail as if the cluster were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Let the next group listing succeed, then fail every later call.
    pub fn unavailable_after_listing(&self) {
        self.shared
            .unavailable_after_listing
            .store(true, Ordering::SeqCst);
    }

    /// Make describing `group_id` fail.
    pub fn break_group(&self, group_id: &str) {
        self.shared
            .state
            .lock()
            .broken
            .insert(group_id.to_string());
    }

    /// Reject commits for `group_id`, as a coordinator does for an active group.
    pub fn reject_commits(&self, group_id: &str) {
        self.shared
            .state
            .lock()
            .read_only
            .insert(group_id.to_string());
    }

    /// Consumers opened and not yet closed
    pub fn open_consumers(&self) -> usize {
        self.consumers_opened() - self.shared.closed.load(Ordering::SeqCst)
    }

    /// Consumers opened so far
    pub fn consumers_opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(KafkaError::NoBrokersAvailable.into());
        }
        Ok(())
    }
}

#[async_trait]
impl GroupAdmin for MemoryGroupAdmin {
    async fn list_groups(&self) -> Result<Vec<String>> {
        self.check_available()?;
        let groups: Vec<String> = self.shared.state.lock().members.keys().cloned().collect();
        if self
            .shared
            .unavailable_after_listing
            .swap(false, Ordering::SeqCst)
        {
            self.set_unavailable(true);
        }
        Ok(groups)
    }

    async fn describe_group(&self, group_id: &str) -> Result<Vec<MemberAssignment>> {
        self.check_available()?;
        let state = self.shared.state.lock();
        if state.broken.contains(group_id) {
            return Err(KafkaError::BrokerError {
                code: 15,
                message: format!("coordinator not available for {}", group_id),
            }
            .into());
        }
        Ok(state.members.get(group_id).cloned().unwrap_or_default())
    }

    async fn open_consumer(&self, group_id: &str) -> Result<Box<dyn GroupConsumer>> {
        self.check_available()?;
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryGroupConsumer {
            group_id: group_id.to_string(),
            admin: self.clone(),
            pending: BTreeMap::new(),
        }))
    }
}

struct MemoryGroupConsumer {
    group_id: String,
    admin: MemoryGroupAdmin,
    pending: BTreeMap<(String, i32), i64>,
}

#[async_trait]
impl GroupConsumer for MemoryGroupConsumer {
    fn group_id(&self) -> &str {
        &self.group_id
    }

    async fn committed(&mut self, topic: &str, partition: i32) -> Result<Option<i64>> {
        self.admin.check_available()?;
        Ok(self.admin.committed_offset(&self.group_id, topic, partition))
    }

    fn seek(&mut self, topic: &str, partition: i32, offset: i64) {
        self.pending.insert((topic.to_string(), partition), offset);
    }

    async fn commit_sync(&mut self) -> Result<()> {
        self.admin.check_available()?;
        if self
            .admin
            .shared
            .state
            .lock()
            .read_only
            .contains(&self.group_id)
        {
            return Err(KafkaError::BrokerError {
                code: 25,
                message: format!("group {} is not empty", self.group_id),
            }
            .into());
        }
        for ((topic, partition), offset) in std::mem::take(&mut self.pending) {
            self.admin.commit(&self.group_id, &topic, partition, offset);
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.admin.shared.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_and_describes_groups() {
        let admin = MemoryGroupAdmin::new();
        admin.assign("g1", "m1", "orders", &[1, 0]);
        admin.assign("g1", "m1", "orders", &[0]);
        admin.assign("g1", "m2", "payments", &[2]);
        admin.add_empty_group("g2");

        assert_eq!(admin.list_groups().await.unwrap(), vec!["g1", "g2"]);

        let members = admin.describe_group("g1").await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].partitions["orders"], vec![0, 1]);
        assert!(admin.describe_group("g2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seek_then_commit() {
        let admin = MemoryGroupAdmin::new();
        let mut consumer = admin.open_consumer("g1").await.unwrap();
        consumer.seek("orders", 0, 55);
        assert_eq!(consumer.committed("orders", 0).await.unwrap(), None);

        consumer.commit_sync().await.unwrap();
        assert_eq!(consumer.committed("orders", 0).await.unwrap(), Some(55));

        consumer.close().await.unwrap();
        assert_eq!(admin.open_consumers(), 0);
    }

    #[tokio::test]
    async fn test_rejected_commit_leaves_offset() {
        let admin = MemoryGroupAdmin::new();
        admin.commit("g1", "orders", 0, 7);
        admin.reject_commits("g1");

        let mut consumer = admin.open_consumer("g1").await.unwrap();
        consumer.seek("orders", 0, 1);
        assert!(consumer.commit_sync().await.is_err());
        consumer.close().await.unwrap();

        assert_eq!(admin.committed_offset("g1", "orders", 0), Some(7));
    }

    #[tokio::test]
    async fn test_unavailable_cluster() {
        let admin = MemoryGroupAdmin::new();
        admin.set_unavailable(true);
        assert!(admin.list_groups().await.is_err());
        assert!(admin.open_consumer("g1").await.is_err());
        assert_eq!(admin.consumers_opened(), 0);
    }
}
