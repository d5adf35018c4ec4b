//! Runs the background refresher in the foreground until interrupted.

use anyhow::Result;
use tokio::time::MissedTickBehavior;
use tracing::info;

use super::OutputFormat;

pub async fn run(config_path: &str, format: OutputFormat) -> Result<()> {
    let (config, facade) = super::connect(config_path).await?;
    facade.start();

    let mut ticker = tokio::time::interval(config.refresh.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Give the first cycle its interval before reporting.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = facade.health();
                if !format.print_structured(&report)? {
                    println!("{}", report);
                    println!("Refresher: {:?}", facade.refresh_state());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                break;
            }
        }
    }

    Ok(())
}
