pub mod brokers;
pub mod group;
pub mod groups;
pub mod reset;
pub mod topics;
pub mod watch;

use anyhow::{Context, Result};
use kafka_admin_core::{AdminFacade, Config};
use serde::Serialize;
use tracing::info;

/// Output format shared by all commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Text,
        }
    }
}

impl OutputFormat {
    /// Print `value` as JSON or YAML. Returns false for text output, which
    /// each command renders itself.
    pub fn print_structured<T: Serialize>(self, value: &T) -> Result<bool> {
        match self {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
            OutputFormat::Text => return Ok(false),
        }
        Ok(true)
    }
}

/// Load the configuration and connect to ZooKeeper and Kafka.
pub async fn connect(config_path: &str) -> Result<(Config, AdminFacade)> {
    let config = Config::load(config_path)
        .await
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    info!(
        "Connecting to ZooKeeper {} and Kafka {}",
        config.zookeeper.connect,
        config.kafka.bootstrap_servers.join(",")
    );
    let facade = AdminFacade::connect(&config)
        .await
        .context("Failed to connect to the cluster")?;

    Ok((config, facade))
}

/// Connect and publish one snapshot so group queries have data.
pub async fn connect_and_refresh(config_path: &str) -> Result<AdminFacade> {
    let (_, facade) = connect(config_path).await?;
    facade
        .refresh()
        .await
        .context("Failed to scan consumer groups")?;
    Ok(facade)
}
