//! Configuration structures for the Kafka admin facade.
//!
//! All values are read once at startup and never change afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Coordination service (legacy group registry)
    #[serde(default)]
    pub zookeeper: ZooKeeperConfig,

    /// Kafka cluster (native group registry)
    #[serde(default)]
    pub kafka: KafkaConfig,

    /// Background refresh settings
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl Config {
    /// Load and validate a YAML configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.zookeeper.connect.trim().is_empty() {
            return Err(Error::Config("zookeeper.connect must not be empty".into()));
        }
        if self.kafka.bootstrap_servers.is_empty() {
            return Err(Error::Config(
                "kafka.bootstrap_servers must list at least one broker".into(),
            ));
        }
        if self.refresh.interval_secs == 0 {
            return Err(Error::Config("refresh.interval_secs must be positive".into()));
        }
        if self.refresh.max_concurrent_groups == 0 {
            return Err(Error::Config(
                "refresh.max_concurrent_groups must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// ZooKeeper connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZooKeeperConfig {
    /// Connect string, optionally with a chroot (e.g. "zk1:2181,zk2:2181/kafka")
    #[serde(default = "default_zk_connect")]
    pub connect: String,

    /// Session establishment timeout in milliseconds
    #[serde(default = "default_zk_timeout_ms")]
    pub session_timeout_ms: u64,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_zk_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ZooKeeperConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ZooKeeperConfig {
    fn default() -> Self {
        Self {
            connect: default_zk_connect(),
            session_timeout_ms: default_zk_timeout_ms(),
            request_timeout_ms: default_zk_timeout_ms(),
        }
    }
}

fn default_zk_connect() -> String {
    "localhost:2181".to_string()
}

fn default_zk_timeout_ms() -> u64 {
    3000
}

/// Kafka cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    /// Bootstrap servers
    #[serde(default = "default_bootstrap_servers")]
    pub bootstrap_servers: Vec<String>,

    /// Client id sent in every request header
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Per-request timeout in milliseconds, also bounds connection setup
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// TCP connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,
}

impl KafkaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Same settings, pointed at a single broker.
    pub fn for_broker(&self, address: String) -> Self {
        Self {
            bootstrap_servers: vec![address],
            ..self.clone()
        }
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: default_bootstrap_servers(),
            client_id: default_client_id(),
            request_timeout_ms: default_request_timeout_ms(),
            connection: ConnectionConfig::default(),
        }
    }
}

fn default_bootstrap_servers() -> Vec<String> {
    vec!["localhost:9092".to_string()]
}

fn default_client_id() -> String {
    "kafka-admin".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// TCP connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Enable TCP keepalive (default: true)
    #[serde(default = "default_true")]
    pub tcp_keepalive: bool,

    /// Time before the first keepalive probe in seconds (default: 60)
    #[serde(default = "default_keepalive_time_secs")]
    pub keepalive_time_secs: u64,

    /// Interval between keepalive probes in seconds (default: 20)
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,

    /// Enable TCP_NODELAY (default: true)
    #[serde(default = "default_true")]
    pub tcp_nodelay: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            tcp_keepalive: true,
            keepalive_time_secs: default_keepalive_time_secs(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
            tcp_nodelay: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_keepalive_time_secs() -> u64 {
    60
}

fn default_keepalive_interval_secs() -> u64 {
    20
}

/// Background refresher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Pause between the start of two refresh cycles in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Native groups scanned in parallel within one cycle
    #[serde(default = "default_max_concurrent_groups")]
    pub max_concurrent_groups: usize,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_concurrent_groups: default_max_concurrent_groups(),
        }
    }
}

fn default_interval_secs() -> u64 {
    10
}

fn default_max_concurrent_groups() -> usize {
    8
}
