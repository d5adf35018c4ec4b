use anyhow::Result;

use super::OutputFormat;

pub async fn run(config_path: &str, groups_of: Option<&str>, format: OutputFormat) -> Result<()> {
    let (_, facade) = super::connect(config_path).await?;

    let (heading, names) = match groups_of {
        Some(topic) => (
            format!("Legacy groups holding offsets for {}", topic),
            facade.legacy_groups_for_topic(topic).await?,
        ),
        None => ("Topics".to_string(), facade.topics().await?),
    };

    if format.print_structured(&names)? {
        return Ok(());
    }

    println!("{} ({}):", heading, names.len());
    for name in &names {
        println!("  {}", name);
    }

    Ok(())
}
