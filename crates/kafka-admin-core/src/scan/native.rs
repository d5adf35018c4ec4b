//! Native group scanner: enumerates groups through the broker admin interface
//! and reads each group's committed offsets with a consumer bound to it.

use futures::FutureExt;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::broker::{with_consumer, GroupAdmin};
use crate::model::{Group, GroupKind, GroupMap, TopicPartitionOffset};
use crate::{Error, Result};

/// Enumerate every native group with its committed offsets.
///
/// Up to `max_concurrent` groups are read in parallel. A group the broker
/// refuses to describe or read is left out and logged. Losing the cluster at
/// any point fails the whole scan, since dropping every group that happened to
/// be read after the loss would let stale legacy entries win the merge.
pub async fn scan_native_groups(
    admin: Arc<dyn GroupAdmin>,
    max_concurrent: usize,
) -> Result<GroupMap> {
    let group_ids = admin.list_groups().await?;
    debug!("Broker registry reports {} groups", group_ids.len());

    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(group_ids.len());

    for group_id in group_ids {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Config(format!("Semaphore error: {}", e)))?;

        let admin = admin.clone();
        let handle = tokio::spawn(async move {
            let result = scan_group(admin.as_ref(), &group_id).await;
            drop(permit);
            (group_id, result)
        });
        handles.push(handle);
    }

    let mut groups = GroupMap::new();
    for handle in handles {
        let (group_id, result) = handle
            .await
            .map_err(|e| Error::Io(std::io::Error::other(format!("Task join error: {}", e))))?;
        match result {
            Ok(group) => {
                groups.insert(group_id, group);
            }
            Err(e) if e.is_unavailable() => {
                warn!("Cluster lost while reading native group {}: {}", group_id, e);
                return Err(e);
            }
            Err(e) => warn!("Skipping native group {}: {}", group_id, e),
        }
    }

    debug!("Scanned {} native groups", groups.len());
    Ok(groups)
}

/// Read the committed offsets of every partition assigned in `group_id`.
pub async fn scan_group(admin: &dyn GroupAdmin, group_id: &str) -> Result<Group> {
    let members = admin.describe_group(group_id).await?;

    // Members may overlap during a rebalance.
    let assigned: BTreeSet<(String, i32)> = members
        .iter()
        .flat_map(|member| member.topic_partitions())
        .collect();

    let mut group = Group::new(group_id, GroupKind::Native);
    if assigned.is_empty() {
        return Ok(group);
    }

    let owned_id = group_id.to_string();
    let offsets = with_consumer(admin, group_id, move |consumer| {
        async move {
            let mut offsets = Vec::with_capacity(assigned.len());
            for (topic, partition) in assigned {
                match consumer.committed(&topic, partition).await? {
                    Some(offset) => offsets.push(TopicPartitionOffset::new(
                        topic,
                        partition,
                        Some(offset),
                    )),
                    None => debug!(
                        "Group {} never committed {}:{}",
                        owned_id, topic, partition
                    ),
                }
            }
            Ok(offsets)
        }
        .boxed()
    })
    .await?;

    for entry in offsets {
        group.insert(entry);
    }
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryGroupAdmin;

    fn registry() -> MemoryGroupAdmin {
        let admin = MemoryGroupAdmin::new();
        admin.assign("svc-a", "m1", "orders", &[0, 1]);
        admin.assign("svc-a", "m2", "orders", &[2]);
        admin.commit("svc-a", "orders", 0, 130);
        admin.commit("svc-a", "orders", 2, 44);
        admin.assign("svc-b", "m1", "payments", &[0]);
        admin.commit("svc-b", "payments", 0, 9);
        admin
    }

    #[tokio::test]
    async fn test_scan_reads_committed_offsets() {
        let admin = registry();
        let groups = scan_native_groups(Arc::new(admin.clone()), 4).await.unwrap();

        assert_eq!(groups.len(), 2);
        let a = &groups["svc-a"];
        assert_eq!(a.kind, GroupKind::Native);
        assert_eq!(a.offset("orders", 0).unwrap().offset, Some(130));
        assert_eq!(a.offset("orders", 2).unwrap().offset, Some(44));
        assert_eq!(groups["svc-b"].offset("payments", 0).unwrap().offset, Some(9));
    }

    #[tokio::test]
    async fn test_never_committed_partition_is_omitted() {
        let admin = registry();
        let groups = scan_native_groups(Arc::new(admin), 1).await.unwrap();

        let a = &groups["svc-a"];
        assert_eq!(a.offsets.len(), 2);
        assert!(a.offset("orders", 1).is_none());
    }

    #[tokio::test]
    async fn test_every_consumer_is_closed() {
        let admin = registry();
        admin.break_group("svc-b");
        scan_native_groups(Arc::new(admin.clone()), 2).await.unwrap();

        assert_eq!(admin.consumers_opened(), 1);
        assert_eq!(admin.open_consumers(), 0);
    }

    #[tokio::test]
    async fn test_failing_group_is_skipped() {
        let admin = registry();
        admin.break_group("svc-a");

        let groups = scan_native_groups(Arc::new(admin), 2).await.unwrap();
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["svc-b"]);
    }

    #[tokio::test]
    async fn test_group_without_members_is_empty() {
        let admin = MemoryGroupAdmin::new();
        admin.add_empty_group("idle");

        let groups = scan_native_groups(Arc::new(admin.clone()), 2).await.unwrap();
        assert!(groups["idle"].offsets.is_empty());
        assert_eq!(admin.consumers_opened(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_cluster_fails_scan() {
        let admin = registry();
        admin.set_unavailable(true);
        assert!(scan_native_groups(Arc::new(admin), 2).await.is_err());
    }

    #[tokio::test]
    async fn test_cluster_lost_after_listing_fails_scan() {
        let admin = registry();
        admin.unavailable_after_listing();

        let err = scan_native_groups(Arc::new(admin.clone()), 2)
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(admin.open_consumers(), 0);
    }
}
