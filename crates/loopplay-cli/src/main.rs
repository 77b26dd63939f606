//! Loopplay CLI - Headless Player State Driver
//!
//! Plays a simulated video through the player view model and prints every composite
//! state snapshot: playing status, HUD visibility and the skip-intro overlay.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Loopplay CLI - Player state engine driver
#[derive(Parser)]
#[command(name = "loopplay-cli")]
#[command(author = "Loopplay Contributors")]
#[command(version)]
#[command(about = "Drive the player state engine over a simulated clock", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a simulated video and print state snapshots
    Run {
        /// Media seconds to play
        #[arg(short, long, default_value = "90")]
        duration: f64,

        /// Time multiplier (10 plays ten media seconds per wall second)
        #[arg(short, long, default_value = "10")]
        speed: f64,

        /// Media seconds at which to tap the video surface
        #[arg(long, value_delimiter = ',')]
        tap_at: Vec<f64>,

        /// Initial media position in seconds
        #[arg(long, default_value = "0")]
        start_at: f64,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing, stdout is reserved for snapshots
    let level = if cli.verbose { "debug" } else { "info" };
    if output::OutputFormat::from(cli.format.as_str()) == output::OutputFormat::Json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(level)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(level)
            .with_writer(std::io::stderr)
            .init();
    }
    loopplay_core::init();

    match cli.command {
        Commands::Run { duration, speed, tap_at, start_at, config } => {
            let options = commands::RunOptions {
                duration,
                speed,
                tap_at,
                start_at,
                config,
            };
            commands::run(options, &cli.format).await?;
        }
        Commands::Config => {
            commands::print_config()?;
        }
    }

    Ok(())
}
