//! ZooKeeper-backed coordination client.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};
use zookeeper_client as zk;

use super::CoordinationClient;
use crate::config::ZooKeeperConfig;
use crate::error::CoordinationError;
use crate::Result;

/// Coordination client talking to a ZooKeeper ensemble
pub struct ZooKeeperClient {
    client: zk::Client,
    connect: String,
    request_timeout: Duration,
}

impl ZooKeeperClient {
    /// Establish a session. Fails if the ensemble cannot be reached within the
    /// configured session timeout.
    pub async fn connect(config: &ZooKeeperConfig) -> Result<Self> {
        let connect = config.connect.clone();
        let mut connector = zk::Client::connector();
        connector.session_timeout(config.session_timeout());

        let client = tokio::time::timeout(config.session_timeout(), connector.connect(&connect))
            .await
            .map_err(|_| {
                CoordinationError::Timeout(format!(
                    "session with {} not established within {}ms",
                    connect, config.session_timeout_ms
                ))
            })?
            .map_err(|e| CoordinationError::Connection {
                connect: connect.clone(),
                message: e.to_string(),
            })?;

        info!(
            "Connected to ZooKeeper: {} (session timeout {:?})",
            connect,
            client.session_timeout()
        );
        Ok(Self {
            client,
            connect,
            request_timeout: config.request_timeout(),
        })
    }

    async fn call<T, F>(&self, path: &str, request: F) -> Result<Option<T>>
    where
        F: Future<Output = std::result::Result<T, zk::Error>>,
    {
        match tokio::time::timeout(self.request_timeout, request).await {
            Err(_) => Err(CoordinationError::Timeout(format!(
                "{} on {} after {:?}",
                path, self.connect, self.request_timeout
            ))
            .into()),
            Ok(Err(zk::Error::NoNode)) => {
                debug!("No node at {}", path);
                Ok(None)
            }
            Ok(Err(e)) => Err(CoordinationError::Request {
                path: path.to_string(),
                message: e.to_string(),
            }
            .into()),
            Ok(Ok(value)) => Ok(Some(value)),
        }
    }
}

#[async_trait]
impl CoordinationClient for ZooKeeperClient {
    async fn children(&self, path: &str) -> Result<Option<Vec<String>>> {
        self.call(path, self.client.list_children(path)).await
    }

    async fn data(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let data = self.call(path, self.client.get_data(path)).await?;
        Ok(data.map(|(bytes, _stat)| bytes))
    }

    fn name(&self) -> &str {
        "zookeeper"
    }
}
