//! Kafka Metadata API, used to discover every broker of the cluster.

use kafka_protocol::messages::{ApiKey, MetadataRequest, MetadataResponse};
use tracing::debug;

use super::KafkaClient;
use crate::Result;

/// Broker address as advertised in cluster metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

impl BrokerAddress {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Fetch the live broker list without requesting any topic metadata
pub async fn fetch_brokers(client: &KafkaClient) -> Result<Vec<BrokerAddress>> {
    let request = MetadataRequest::default()
        .with_topics(Some(Vec::new()))
        .with_allow_auto_topic_creation(false);

    let response: MetadataResponse = client.send_request(ApiKey::Metadata, request).await?;

    let brokers: Vec<BrokerAddress> = response
        .brokers
        .iter()
        .map(|broker| BrokerAddress {
            node_id: broker.node_id.0,
            host: broker.host.to_string(),
            port: broker.port,
        })
        .collect();

    debug!("Discovered {} brokers", brokers.len());
    Ok(brokers)
}
