//! LocalTube CLI - stream and player inspection
//!
//! Features:
//! - Rendition ladder listing, as shown in the quality selector
//! - Media playlist segment listing per rendition
//! - Video metadata lookup against the backend
//! - Per-quality download URL resolution
//! - Player route parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// LocalTube CLI - inspect streams, videos and player routes
#[derive(Parser)]
#[command(name = "localtube-cli")]
#[command(author = "LocalTube Developers")]
#[command(version)]
#[command(about = "Stream and player inspection for LocalTube", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "table", global = true)]
    format: String,

    /// Client config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the renditions of an adaptive manifest
    Renditions {
        /// URL of the master manifest
        manifest: String,
    },

    /// List segments of one rendition
    Segments {
        /// URL of the master manifest
        manifest: String,

        /// Rendition index in manifest order
        #[arg(short, long, default_value = "0")]
        level: usize,

        /// Number of segments to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Fetch video metadata from the backend
    Video {
        /// Video identifier
        id: String,
    },

    /// Resolve the playlist URL for a download quality
    DownloadUrl {
        /// Adaptive manifest URL of the video, absolute or relative to the backend
        hls_url: String,

        /// Quality label, e.g. 720p
        quality: String,
    },

    /// Parse a player route such as /video/42?t=90
    Route {
        /// Route path
        path: String,
    },

    /// Print the effective client configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Renditions { manifest } => {
            commands::renditions(&config, &manifest, &cli.format).await?;
        }
        Commands::Segments { manifest, level, limit } => {
            commands::segments(&config, &manifest, level, limit, &cli.format).await?;
        }
        Commands::Video { id } => {
            commands::video(&config, &id, &cli.format).await?;
        }
        Commands::DownloadUrl { hls_url, quality } => {
            commands::download_url(&config, &hls_url, &quality)?;
        }
        Commands::Route { path } => {
            commands::route(&path, &cli.format)?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
