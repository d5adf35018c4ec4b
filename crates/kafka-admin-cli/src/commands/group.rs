use anyhow::Result;
use kafka_admin_core::Error;

use super::OutputFormat;

pub async fn run(config_path: &str, group_id: &str, format: OutputFormat) -> Result<()> {
    let facade = super::connect_and_refresh(config_path).await?;

    let Some(group) = facade.get_group(group_id) else {
        return Err(Error::GroupNotFound(group_id.to_string()).into());
    };

    if format.print_structured(&group)? {
        return Ok(());
    }

    println!("Group: {} ({})", group.id, group.kind.as_str());
    if group.offsets.is_empty() {
        println!("No committed offsets.");
        return Ok(());
    }

    println!();
    println!("{:<48} {:>9} {:>14}", "TOPIC", "PARTITION", "OFFSET");
    for entry in &group.offsets {
        let offset = entry
            .offset
            .map(|o| o.to_string())
            .unwrap_or_else(|| "unreadable".to_string());
        println!("{:<48} {:>9} {:>14}", entry.topic, entry.partition, offset);
    }

    Ok(())
}
