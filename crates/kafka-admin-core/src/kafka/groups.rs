//! Consumer group protocol operations.
//!
//! - FindCoordinator: locate the broker that owns a group
//! - ListGroups: list the groups hosted by one broker
//! - DescribeGroups: members and their partition assignments
//! - OffsetFetch: committed offsets for a group
//! - OffsetCommit: commit offsets for a group

use bytes::{Buf, Bytes};
use kafka_protocol::messages::{
    ApiKey, ConsumerProtocolAssignment, DescribeGroupsRequest, DescribeGroupsResponse,
    FindCoordinatorRequest, FindCoordinatorResponse, GroupId, ListGroupsRequest,
    ListGroupsResponse, OffsetCommitRequest, OffsetCommitResponse, OffsetFetchRequest,
    OffsetFetchResponse, TopicName,
};
use kafka_protocol::protocol::{Decodable, StrBytes};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::KafkaClient;
use crate::error::KafkaError;
use crate::Result;

/// Highest ConsumerProtocolAssignment version this decoder understands
const MAX_ASSIGNMENT_VERSION: i16 = 3;

/// Consumer group listing entry
#[derive(Debug, Clone)]
pub struct ConsumerGroup {
    /// Consumer group ID
    pub group_id: String,
    /// Protocol type ("consumer" for regular consumers, empty for offset-only groups)
    pub protocol_type: String,
}

/// Detailed consumer group description
#[derive(Debug, Clone)]
pub struct ConsumerGroupDescription {
    pub group_id: String,
    /// Group state (e.g., "Stable", "Empty", "Dead")
    pub state: String,
    pub protocol_type: String,
    /// Assignor name (e.g., "range", "roundrobin")
    pub protocol: String,
    pub members: Vec<ConsumerGroupMember>,
    /// Error code (0 = success)
    pub error_code: i16,
}

/// Consumer group member
#[derive(Debug, Clone)]
pub struct ConsumerGroupMember {
    pub member_id: String,
    pub client_id: String,
    pub client_host: String,
    /// Assigned partitions (topic -> partitions)
    pub assignment: BTreeMap<String, Vec<i32>>,
}

/// Committed offset for a partition
#[derive(Debug, Clone)]
pub struct CommittedOffset {
    pub topic: String,
    pub partition: i32,
    /// -1 when the group never committed for this partition
    pub offset: i64,
    pub metadata: Option<String>,
    /// Error code (0 = success)
    pub error_code: i16,
}

/// Broker acting as coordinator for a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinator {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

impl Coordinator {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Locate the coordinator broker for a group
pub async fn find_coordinator(client: &KafkaClient, group_id: &str) -> Result<Coordinator> {
    let request = FindCoordinatorRequest::default()
        .with_key(StrBytes::from_string(group_id.to_string()))
        .with_key_type(0);

    let response: FindCoordinatorResponse =
        client.send_request(ApiKey::FindCoordinator, request).await?;

    if response.error_code != 0 {
        return Err(KafkaError::CoordinatorNotAvailable {
            group: group_id.to_string(),
            code: response.error_code,
        }
        .into());
    }

    let coordinator = Coordinator {
        node_id: response.node_id.0,
        host: response.host.to_string(),
        port: response.port,
    };
    debug!(
        "Coordinator for group {} is broker {} at {}",
        group_id,
        coordinator.node_id,
        coordinator.address()
    );
    Ok(coordinator)
}

/// List the consumer groups hosted by the broker the client is connected to
pub async fn list_groups(client: &KafkaClient) -> Result<Vec<ConsumerGroup>> {
    let request = ListGroupsRequest::default();

    let response: ListGroupsResponse = client.send_request(ApiKey::ListGroups, request).await?;

    if response.error_code != 0 {
        return Err(KafkaError::BrokerError {
            code: response.error_code,
            message: format!("ListGroups failed with error code {}", response.error_code),
        }
        .into());
    }

    let groups: Vec<ConsumerGroup> = response
        .groups
        .into_iter()
        .map(|g| ConsumerGroup {
            group_id: g.group_id.to_string(),
            protocol_type: g.protocol_type.to_string(),
        })
        .collect();

    debug!("Listed {} consumer groups", groups.len());
    Ok(groups)
}

/// Describe consumer groups. Must be sent to the groups' coordinator.
pub async fn describe_groups(
    client: &KafkaClient,
    group_ids: &[String],
) -> Result<Vec<ConsumerGroupDescription>> {
    let groups: Vec<GroupId> = group_ids
        .iter()
        .map(|id| GroupId(StrBytes::from_string(id.clone())))
        .collect();

    let request = DescribeGroupsRequest::default().with_groups(groups);

    let response: DescribeGroupsResponse =
        client.send_request(ApiKey::DescribeGroups, request).await?;

    let descriptions = response
        .groups
        .into_iter()
        .map(|g| {
            let members = g
                .members
                .into_iter()
                .map(|m| ConsumerGroupMember {
                    member_id: m.member_id.to_string(),
                    client_id: m.client_id.to_string(),
                    client_host: m.client_host.to_string(),
                    assignment: parse_member_assignment(&m.member_assignment),
                })
                .collect();

            ConsumerGroupDescription {
                group_id: g.group_id.to_string(),
                state: g.group_state.to_string(),
                protocol_type: g.protocol_type.to_string(),
                protocol: g.protocol_data.to_string(),
                members,
                error_code: g.error_code,
            }
        })
        .collect();

    Ok(descriptions)
}

/// Fetch committed offsets for specific partitions of a group.
/// Must be sent to the group's coordinator.
pub async fn fetch_offsets(
    client: &KafkaClient,
    group_id: &str,
    partitions: &[(String, i32)],
) -> Result<Vec<CommittedOffset>> {
    let topics: Vec<_> = group_by_topic(partitions.iter().map(|(t, p)| (t.clone(), *p)))
        .into_iter()
        .map(|(topic, indexes)| {
            kafka_protocol::messages::offset_fetch_request::OffsetFetchRequestTopic::default()
                .with_name(TopicName(StrBytes::from_string(topic)))
                .with_partition_indexes(indexes)
        })
        .collect();

    let request = OffsetFetchRequest::default()
        .with_group_id(GroupId(StrBytes::from_string(group_id.to_string())))
        .with_topics(Some(topics));

    let response: OffsetFetchResponse = client.send_request(ApiKey::OffsetFetch, request).await?;

    if response.error_code != 0 {
        return Err(KafkaError::BrokerError {
            code: response.error_code,
            message: format!("OffsetFetch for group {} failed", group_id),
        }
        .into());
    }

    let mut offsets = Vec::new();
    for topic in response.topics {
        for partition in topic.partitions {
            offsets.push(CommittedOffset {
                topic: topic.name.to_string(),
                partition: partition.partition_index,
                offset: partition.committed_offset,
                metadata: partition
                    .metadata
                    .as_ref()
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string()),
                error_code: partition.error_code,
            });
        }
    }

    debug!(
        "Fetched {} committed offsets for group {}",
        offsets.len(),
        group_id
    );
    Ok(offsets)
}

/// Commit offsets for a group as a standalone (non-member) client.
/// Returns (topic, partition, error_code) for every partition in the response.
pub async fn commit_offsets(
    client: &KafkaClient,
    group_id: &str,
    offsets: &[(String, i32, i64)],
) -> Result<Vec<(String, i32, i16)>> {
    let mut by_topic: BTreeMap<String, Vec<(i32, i64)>> = BTreeMap::new();
    for (topic, partition, offset) in offsets {
        by_topic
            .entry(topic.clone())
            .or_default()
            .push((*partition, *offset));
    }

    let topics: Vec<_> = by_topic
        .into_iter()
        .map(|(topic, partitions)| {
            let partition_data: Vec<_> = partitions
                .into_iter()
                .map(|(partition, offset)| {
                    kafka_protocol::messages::offset_commit_request::OffsetCommitRequestPartition::default()
                        .with_partition_index(partition)
                        .with_committed_offset(offset)
                })
                .collect();

            kafka_protocol::messages::offset_commit_request::OffsetCommitRequestTopic::default()
                .with_name(TopicName(StrBytes::from_string(topic)))
                .with_partitions(partition_data)
        })
        .collect();

    let request = OffsetCommitRequest::default()
        .with_group_id(GroupId(StrBytes::from_string(group_id.to_string())))
        .with_topics(topics);

    let response: OffsetCommitResponse = client.send_request(ApiKey::OffsetCommit, request).await?;

    let mut results = Vec::new();
    for topic in response.topics {
        for partition in topic.partitions {
            if partition.error_code != 0 {
                warn!(
                    "Failed to commit offset for {}:{} in group {} - error code {}",
                    topic.name.as_str(),
                    partition.partition_index,
                    group_id,
                    partition.error_code
                );
            }
            results.push((
                topic.name.to_string(),
                partition.partition_index,
                partition.error_code,
            ));
        }
    }

    debug!("Committed {} offsets for group {}", results.len(), group_id);
    Ok(results)
}

fn group_by_topic(partitions: impl Iterator<Item = (String, i32)>) -> BTreeMap<String, Vec<i32>> {
    let mut by_topic: BTreeMap<String, Vec<i32>> = BTreeMap::new();
    for (topic, partition) in partitions {
        by_topic.entry(topic).or_default().push(partition);
    }
    for indexes in by_topic.values_mut() {
        indexes.sort_unstable();
        indexes.dedup();
    }
    by_topic
}

/// Decode the consumer protocol assignment a member received from its leader.
///
/// The payload is a big-endian i16 version followed by the versioned body.
/// Groups using a non-consumer protocol carry opaque bytes; those decode to an
/// empty assignment.
pub(crate) fn parse_member_assignment(bytes: &[u8]) -> BTreeMap<String, Vec<i32>> {
    if bytes.len() < 2 {
        return BTreeMap::new();
    }

    let mut buf = Bytes::copy_from_slice(bytes);
    let version = buf.get_i16().clamp(0, MAX_ASSIGNMENT_VERSION);

    match ConsumerProtocolAssignment::decode(&mut buf, version) {
        Ok(assignment) => group_by_topic(assignment.assigned_partitions.into_iter().flat_map(
            |tp| {
                let topic = tp.topic.to_string();
                tp.partitions.into_iter().map(move |p| (topic.clone(), p))
            },
        )),
        Err(e) => {
            warn!("Could not decode member assignment: {:?}", e);
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};
    use kafka_protocol::messages::consumer_protocol_assignment::TopicPartition;
    use kafka_protocol::protocol::Encodable;

    fn encoded_assignment(version: i16, topics: &[(&'static str, Vec<i32>)]) -> Vec<u8> {
        let assignment = ConsumerProtocolAssignment::default().with_assigned_partitions(
            topics
                .iter()
                .map(|(topic, partitions)| {
                    TopicPartition::default()
                        .with_topic(TopicName(StrBytes::from_static_str(*topic)))
                        .with_partitions(partitions.clone())
                })
                .collect(),
        );
        let mut buf = BytesMut::new();
        buf.put_i16(version);
        assignment.encode(&mut buf, version).unwrap();
        buf.to_vec()
    }

    #[test]
    fn test_parse_empty_member_assignment() {
        assert!(parse_member_assignment(&[]).is_empty());
    }

    #[test]
    fn test_parse_member_assignment() {
        let bytes = encoded_assignment(1, &[("orders", vec![2, 0]), ("payments", vec![1])]);
        let assignment = parse_member_assignment(&bytes);

        assert_eq!(assignment.len(), 2);
        assert_eq!(assignment["orders"], vec![0, 2]);
        assert_eq!(assignment["payments"], vec![1]);
    }

    #[test]
    fn test_group_by_topic_dedups() {
        let grouped = group_by_topic(
            vec![("a".to_string(), 3), ("a".to_string(), 1), ("a".to_string(), 3)].into_iter(),
        );
        assert_eq!(grouped["a"], vec![1, 3]);
    }
}
