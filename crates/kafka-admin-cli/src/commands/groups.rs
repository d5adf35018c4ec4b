use anyhow::Result;
use kafka_admin_core::GroupKind;
use serde::Serialize;

use super::OutputFormat;

#[derive(Serialize)]
struct GroupSummary {
    id: String,
    kind: GroupKind,
    topics: usize,
    partitions: usize,
}

pub async fn run(config_path: &str, format: OutputFormat) -> Result<()> {
    let facade = super::connect_and_refresh(config_path).await?;
    let snapshot = facade.snapshot();

    let summaries: Vec<GroupSummary> = snapshot
        .groups
        .values()
        .map(|group| GroupSummary {
            id: group.id.clone(),
            kind: group.kind,
            topics: group.topics().len(),
            partitions: group.offsets.len(),
        })
        .collect();

    if format.print_structured(&summaries)? {
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No consumer groups found.");
        return Ok(());
    }

    println!("{:<48} {:<8} {:>7} {:>11}", "GROUP", "KIND", "TOPICS", "PARTITIONS");
    for summary in &summaries {
        println!(
            "{:<48} {:<8} {:>7} {:>11}",
            summary.id,
            summary.kind.as_str(),
            summary.topics,
            summary.partitions
        );
    }
    println!();
    println!(
        "{} groups ({} legacy, {} native)",
        snapshot.len(),
        snapshot.count_by_kind(GroupKind::Legacy),
        snapshot.count_by_kind(GroupKind::Native)
    );

    Ok(())
}
