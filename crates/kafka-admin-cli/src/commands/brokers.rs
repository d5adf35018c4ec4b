use anyhow::Result;
use tracing::warn;

use super::OutputFormat;

pub async fn run(config_path: &str, format: OutputFormat) -> Result<()> {
    let (_, facade) = super::connect(config_path).await?;

    let mut brokers = Vec::new();
    for id in facade.brokers().await? {
        match facade.broker(id).await? {
            Some(broker) => brokers.push(broker),
            None => warn!("Broker {} deregistered while listing", id),
        }
    }

    if format.print_structured(&brokers)? {
        return Ok(());
    }

    if brokers.is_empty() {
        println!("No brokers registered.");
        return Ok(());
    }

    println!("{:>6}  {:<40} {:>6} {:>9}", "ID", "HOST", "PORT", "JMX");
    for broker in &brokers {
        let jmx = if broker.jmx_enabled() {
            broker.jmx_port.to_string()
        } else {
            "disabled".to_string()
        };
        println!(
            "{:>6}  {:<40} {:>6} {:>9}",
            broker.id, broker.host, broker.port, jmx
        );
    }

    Ok(())
}
