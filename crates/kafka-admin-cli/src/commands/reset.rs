use anyhow::Result;
use serde::Serialize;

use super::OutputFormat;

#[derive(Serialize)]
struct ResetResult<'a> {
    group: &'a str,
    topic: &'a str,
    partition: i32,
    offset: i64,
}

pub async fn run(
    config_path: &str,
    group: &str,
    topic: &str,
    partition: i32,
    offset: i64,
    format: OutputFormat,
) -> Result<()> {
    let (_, facade) = super::connect(config_path).await?;

    facade.reset_offset(group, topic, partition, offset).await?;

    let result = ResetResult {
        group,
        topic,
        partition,
        offset,
    };
    if format.print_structured(&result)? {
        return Ok(());
    }

    println!(
        "Committed offset {} for group {} on {}:{}",
        offset, group, topic, partition
    );
    Ok(())
}
