mod commands;

use clap::Parser;
use commands::{execute_command, utils, Commands};
use std::path::PathBuf;

/// Back up Spotify playlists to CSV files
#[derive(Parser)]
#[command(
    name = "spotify-backup",
    about = "Back up Spotify playlists to CSV files",
    long_about = None
)]
struct Cli {
    /// Show detailed debug information
    #[arg(long, global = true)]
    verbose: bool,

    /// Config file (defaults to <config dir>/spotify-backup/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    utils::init_logging(args.verbose);

    let config = match utils::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    log::debug!("Using client id {} for user {}", config.client_id, config.user);
    let interface = utils::create_interface(config);

    if let Err(e) = execute_command(args.command, &interface).await {
        eprintln!("Command failed: {e}");
        std::process::exit(1);
    }

    Ok(())
}
