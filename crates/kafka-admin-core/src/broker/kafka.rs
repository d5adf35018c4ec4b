//! Group registry access over the Kafka wire protocol.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::{GroupAdmin, GroupConsumer, MemberAssignment};
use crate::config::KafkaConfig;
use crate::error::KafkaError;
use crate::kafka::{self, KafkaClient};
use crate::Result;

/// Group administration against a live cluster.
///
/// Holds one long-lived bootstrap connection for metadata and coordinator
/// lookups. Everything bound to a specific broker or group uses its own
/// connection, opened and closed within the call.
pub struct KafkaGroupAdmin {
    config: KafkaConfig,
    bootstrap: KafkaClient,
}

impl KafkaGroupAdmin {
    /// Connect to the bootstrap servers. Fails if none is reachable.
    pub async fn connect(config: KafkaConfig) -> Result<Self> {
        let bootstrap = KafkaClient::new(config.clone());
        bootstrap.connect().await?;
        info!(
            "Connected to Kafka bootstrap servers: {}",
            config.bootstrap_servers.join(",")
        );
        Ok(Self { config, bootstrap })
    }

    /// Open a connection to the coordinator of `group_id`.
    async fn coordinator_client(&self, group_id: &str) -> Result<KafkaClient> {
        let coordinator = kafka::find_coordinator(&self.bootstrap, group_id).await?;
        let client = KafkaClient::new(self.config.for_broker(coordinator.address()));
        client.connect().await?;
        Ok(client)
    }
}

#[async_trait]
impl GroupAdmin for KafkaGroupAdmin {
    async fn list_groups(&self) -> Result<Vec<String>> {
        // ListGroups only reports the groups a broker coordinates, so every
        // broker has to be asked.
        let brokers = kafka::fetch_brokers(&self.bootstrap).await?;
        if brokers.is_empty() {
            return Err(KafkaError::NoBrokersAvailable.into());
        }

        let mut group_ids = Vec::new();
        for broker in brokers {
            let client = KafkaClient::new(self.config.for_broker(broker.address()));
            let listed = kafka::list_groups(&client).await;
            client.close().await;

            let groups = listed?;
            debug!(
                "Broker {} coordinates {} groups",
                broker.node_id,
                groups.len()
            );
            group_ids.extend(groups.into_iter().map(|g| g.group_id));
        }

        group_ids.sort();
        group_ids.dedup();
        Ok(group_ids)
    }

    async fn describe_group(&self, group_id: &str) -> Result<Vec<MemberAssignment>> {
        let client = self.coordinator_client(group_id).await?;
        let described = kafka::describe_groups(&client, &[group_id.to_string()]).await;
        client.close().await;

        let description = described?
            .into_iter()
            .find(|d| d.group_id == group_id)
            .ok_or_else(|| KafkaError::Protocol(format!("No description for group {}", group_id)))?;

        if description.error_code != 0 {
            return Err(KafkaError::BrokerError {
                code: description.error_code,
                message: format!("DescribeGroups failed for group {}", group_id),
            }
            .into());
        }

        Ok(description
            .members
            .into_iter()
            .map(|m| MemberAssignment {
                member_id: m.member_id,
                client_id: m.client_id,
                client_host: m.client_host,
                partitions: m.assignment,
            })
            .collect())
    }

    async fn open_consumer(&self, group_id: &str) -> Result<Box<dyn GroupConsumer>> {
        let client = self.coordinator_client(group_id).await?;
        debug!("Opened consumer for group {}", group_id);
        Ok(Box::new(KafkaGroupConsumer {
            group_id: group_id.to_string(),
            client,
            pending: BTreeMap::new(),
        }))
    }
}

/// Standalone offset client for one group, connected to its coordinator
pub struct KafkaGroupConsumer {
    group_id: String,
    client: KafkaClient,
    /// (topic, partition) -> offset awaiting commit
    pending: BTreeMap<(String, i32), i64>,
}

#[async_trait]
impl GroupConsumer for KafkaGroupConsumer {
    fn group_id(&self) -> &str {
        &self.group_id
    }

    async fn committed(&mut self, topic: &str, partition: i32) -> Result<Option<i64>> {
        let offsets =
            kafka::fetch_offsets(&self.client, &self.group_id, &[(topic.to_string(), partition)])
                .await?;

        let Some(entry) = offsets
            .into_iter()
            .find(|o| o.topic == topic && o.partition == partition)
        else {
            return Ok(None);
        };

        if entry.error_code != 0 {
            return Err(KafkaError::BrokerError {
                code: entry.error_code,
                message: format!(
                    "OffsetFetch for {}:{} in group {} failed",
                    topic, partition, self.group_id
                ),
            }
            .into());
        }

        Ok((entry.offset >= 0).then_some(entry.offset))
    }

    fn seek(&mut self, topic: &str, partition: i32, offset: i64) {
        self.pending.insert((topic.to_string(), partition), offset);
    }

    async fn commit_sync(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let offsets: Vec<(String, i32, i64)> = self
            .pending
            .iter()
            .map(|((topic, partition), offset)| (topic.clone(), *partition, *offset))
            .collect();

        let results = kafka::commit_offsets(&self.client, &self.group_id, &offsets).await?;

        if let Some((topic, partition, code)) = results.iter().find(|(_, _, code)| *code != 0) {
            return Err(KafkaError::BrokerError {
                code: *code,
                message: format!(
                    "OffsetCommit for {}:{} in group {} rejected",
                    topic, partition, self.group_id
                ),
            }
            .into());
        }

        self.pending.clear();
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        if !self.pending.is_empty() {
            warn!(
                "Closing consumer for group {} with {} uncommitted seeks",
                self.group_id,
                self.pending.len()
            );
        }
        self.client.close().await;
        debug!("Closed consumer for group {}", self.group_id);
        Ok(())
    }
}
