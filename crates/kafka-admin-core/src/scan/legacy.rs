//! Legacy group scanner: walks `/consumers` in the coordination service.
//!
//! The tree changes while it is walked (consumers deregister, groups are
//! deleted), so a node that disappears between listing and reading is treated
//! as having no data. Any request that fails, at any depth of the walk, fails
//! the whole scan: a partial walk must never be published as the legacy view.

use tracing::{debug, warn};

use crate::coordination::{
    group_offsets_path, partition_offset_path, topic_offsets_path, CoordinationClient,
    CONSUMERS_PATH,
};
use crate::model::{Group, GroupKind, GroupMap, TopicPartitionOffset};
use crate::Result;

/// Enumerate every legacy group with its committed offsets.
pub async fn scan_legacy_groups(client: &dyn CoordinationClient) -> Result<GroupMap> {
    let mut groups = GroupMap::new();

    let Some(group_ids) = client.children(CONSUMERS_PATH).await? else {
        debug!(
            "{} does not exist in {}, no legacy groups",
            CONSUMERS_PATH,
            client.name()
        );
        return Ok(groups);
    };

    for group_id in group_ids {
        match scan_group(client, &group_id).await? {
            Some(group) => {
                groups.insert(group_id, group);
            }
            None => debug!("Legacy group {} vanished during scan", group_id),
        }
    }

    debug!("Scanned {} legacy groups from {}", groups.len(), client.name());
    Ok(groups)
}

/// Scan one group; `None` if it was deleted before its offsets could be listed.
pub async fn scan_group(client: &dyn CoordinationClient, group_id: &str) -> Result<Option<Group>> {
    let Some(topics) = client.children(&group_offsets_path(group_id)).await? else {
        // Registered consumer without any committed offsets yet, or deleted.
        return Ok(client
            .children(&format!("{}/{}", CONSUMERS_PATH, group_id))
            .await?
            .map(|_| Group::new(group_id, GroupKind::Legacy)));
    };

    let mut group = Group::new(group_id, GroupKind::Legacy);
    for topic in topics {
        let Some(partitions) = client.children(&topic_offsets_path(group_id, &topic)).await? else {
            continue;
        };

        for partition_name in partitions {
            let Ok(partition) = partition_name.parse::<i32>() else {
                warn!(
                    "Ignoring non-numeric partition node {} under {}/{}",
                    partition_name, group_id, topic
                );
                continue;
            };

            let path = partition_offset_path(group_id, &topic, &partition_name);
            let Some(raw) = client.data(&path).await? else {
                debug!("Offset node {} vanished during scan", path);
                continue;
            };

            group.insert(TopicPartitionOffset::new(
                topic.clone(),
                partition,
                parse_offset(&path, &raw),
            ));
        }
    }

    Ok(Some(group))
}

/// Parse a stored offset; malformed values yield `None` for that partition only.
fn parse_offset(path: &str, raw: &[u8]) -> Option<i64> {
    let parsed = std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|offset| *offset >= 0);

    if parsed.is_none() {
        warn!(
            "Malformed offset at {}: {:?}",
            path,
            String::from_utf8_lossy(raw)
        );
    }
    parsed
}
