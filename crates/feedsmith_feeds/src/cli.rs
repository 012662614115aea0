use clap::Subcommand;
use feedsmith_core::{Error, Result};
use tracing::info;

use crate::manager::GeneratorManager;

#[derive(Subcommand)]
pub enum FeedCommands {
    /// Generate every feed, continuing past per-source failures
    RunAll,
    /// Generate a single feed by source name (e.g. arxiv-cs-ai)
    Run { source: String },
    /// List available feed generators
    List,
}

pub async fn handle_command(command: FeedCommands) -> Result<()> {
    let manager = GeneratorManager::new()?;

    match command {
        FeedCommands::RunAll => {
            let report = manager.run_all().await;
            if !report.all_succeeded() {
                return Err(Error::Feed(format!(
                    "{} of {} sources failed",
                    report.failed,
                    report.succeeded + report.failed
                )));
            }
        }
        FeedCommands::Run { source } => {
            let count = manager.run_source(&source).await?;
            info!("Generated feed for {} with {} entries", source, count);
        }
        FeedCommands::List => {
            println!("Available feed generators:");
            for (name, title) in manager.list() {
                println!("  {} - {}", name, title);
            }
        }
    }
    Ok(())
}
