//! Broker and topic registrations read from the coordination service.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::coordination::{
    group_offsets_path, CoordinationClient, BROKER_IDS_PATH, BROKER_TOPICS_PATH, CONSUMERS_PATH,
};
use crate::model::BrokerDescriptor;
use crate::{Error, Result};

/// Registration JSON under `/brokers/ids/<id>`
#[derive(Debug, Deserialize)]
struct BrokerRegistration {
    #[serde(default)]
    host: Option<String>,
    #[serde(default = "default_port")]
    port: i32,
    #[serde(default = "default_port")]
    jmx_port: i32,
    /// e.g. `PLAINTEXT://broker-1:9092`; the only address on listener-based brokers
    #[serde(default)]
    endpoints: Vec<String>,
}

fn default_port() -> i32 {
    -1
}

/// Registered broker ids, sorted.
pub async fn brokers(client: &dyn CoordinationClient) -> Result<Vec<i32>> {
    let mut ids: Vec<i32> = client
        .children(BROKER_IDS_PATH)
        .await?
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| match id.parse::<i32>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Ignoring non-numeric broker registration {}", id);
                None
            }
        })
        .collect();
    ids.sort_unstable();
    Ok(ids)
}

/// Registration of broker `id`, `None` if it is not registered.
pub async fn broker(client: &dyn CoordinationClient, id: i32) -> Result<Option<BrokerDescriptor>> {
    let path = format!("{}/{}", BROKER_IDS_PATH, id);
    let Some(raw) = client.data(&path).await? else {
        return Ok(None);
    };

    let registration: BrokerRegistration = serde_json::from_slice(&raw)?;
    let (host, port) = match registration.host {
        Some(host) if !host.is_empty() => (host, registration.port),
        _ => registration
            .endpoints
            .iter()
            .find_map(|endpoint| parse_endpoint(endpoint))
            .ok_or_else(|| {
                Error::Serialization(format!("Broker {} registration has no address", id))
            })?,
    };

    debug!("Broker {} registered at {}:{}", id, host, port);
    Ok(Some(BrokerDescriptor {
        id,
        host,
        port,
        jmx_port: registration.jmx_port,
    }))
}

/// `PROTOCOL://host:port` -> (host, port)
fn parse_endpoint(endpoint: &str) -> Option<(String, i32)> {
    let address = endpoint.split_once("://").map_or(endpoint, |(_, rest)| rest);
    let (host, port) = address.rsplit_once(':')?;
    Some((host.to_string(), port.parse().ok()?))
}

/// Registered topic names, sorted.
pub async fn topics(client: &dyn CoordinationClient) -> Result<Vec<String>> {
    let mut topics = client
        .children(BROKER_TOPICS_PATH)
        .await?
        .unwrap_or_default();
    topics.sort();
    Ok(topics)
}

/// Legacy groups holding offsets for `topic`, sorted.
pub async fn legacy_groups_for_topic(
    client: &dyn CoordinationClient,
    topic: &str,
) -> Result<Vec<String>> {
    let Some(mut group_ids) = client.children(CONSUMERS_PATH).await? else {
        return Ok(Vec::new());
    };
    group_ids.sort();

    let mut groups = Vec::new();
    for group_id in group_ids {
        let topics = client
            .children(&group_offsets_path(&group_id))
            .await?
            .unwrap_or_default();
        if topics.iter().any(|t| t == topic) {
            groups.push(group_id);
        }
    }
    Ok(groups)
}
