use clap::Parser;
use feedsmith_feeds::cli::{handle_command, FeedCommands};
use feedsmith_feeds::logging::init_logging;

#[derive(Parser)]
#[command(name = "feedsmith", about = "Generates RSS feeds for research news sources")]
struct Cli {
    #[command(subcommand)]
    command: FeedCommands,
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = handle_command(cli.command).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
