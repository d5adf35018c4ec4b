use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::OutputFormat;

#[derive(Parser)]
#[command(name = "kafka-admin")]
#[command(about = "Consumer group and cluster metadata for Kafka", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List consumer groups from both registries
    Groups {
        /// Path to the configuration file
        #[arg(short, long)]
        config: String,

        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show committed offsets of one consumer group
    Group {
        /// Consumer group id
        group_id: String,

        /// Path to the configuration file
        #[arg(short, long)]
        config: String,

        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List topics registered in ZooKeeper
    Topics {
        /// Path to the configuration file
        #[arg(short, long)]
        config: String,

        /// List the legacy groups holding offsets for this topic instead
        #[arg(long)]
        groups_of: Option<String>,

        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List registered brokers
    Brokers {
        /// Path to the configuration file
        #[arg(short, long)]
        config: String,

        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Commit a new offset for a consumer group
    Reset {
        /// Path to the configuration file
        #[arg(short, long)]
        config: String,

        /// Consumer group id
        #[arg(short, long)]
        group: String,

        /// Topic name
        #[arg(short, long)]
        topic: String,

        /// Partition number
        #[arg(short, long)]
        partition: i32,

        /// Offset to commit
        #[arg(short, long)]
        offset: i64,

        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run the refresher and print a summary after every interval
    Watch {
        /// Path to the configuration file
        #[arg(short, long)]
        config: String,

        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match cli.verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Groups { config, format } => {
            commands::groups::run(&config, OutputFormat::from(format.as_str())).await?;
        }
        Commands::Group {
            group_id,
            config,
            format,
        } => {
            commands::group::run(&config, &group_id, OutputFormat::from(format.as_str())).await?;
        }
        Commands::Topics {
            config,
            groups_of,
            format,
        } => {
            commands::topics::run(
                &config,
                groups_of.as_deref(),
                OutputFormat::from(format.as_str()),
            )
            .await?;
        }
        Commands::Brokers { config, format } => {
            commands::brokers::run(&config, OutputFormat::from(format.as_str())).await?;
        }
        Commands::Reset {
            config,
            group,
            topic,
            partition,
            offset,
            format,
        } => {
            commands::reset::run(
                &config,
                &group,
                &topic,
                partition,
                offset,
                OutputFormat::from(format.as_str()),
            )
            .await?;
        }
        Commands::Watch { config, format } => {
            commands::watch::run(&config, OutputFormat::from(format.as_str())).await?;
        }
    }

    Ok(())
}
