//! # boardsync
//!
//! Terminal front end for boardsync game sessions.
//!
//! ## Commands
//!
//! - `play`: Join a room and play from stdin
//! - `decode`: Decode a wire board object and print it
//!
//! ## Example
//!
//! ```bash
//! # Join a room handed out by matchmaking
//! boardsync play --room 3f9c --user-id 42 --username alice
//!
//! # Same, with server and identity taken from a config file
//! boardsync --config boardsync.toml play --room 3f9c
//!
//! # Inspect a captured frame
//! boardsync decode frame.json
//! ```
//!
//! Logs go to stderr and are filtered by `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use boardsync_client::SessionConfig;
use boardsync_types::UserId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

use commands::{decode, play};
use config::Config;

/// Terminal front end for boardsync game sessions.
#[derive(Parser, Debug)]
#[command(name = "boardsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: boardsync.toml in the config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Join a room and play
    Play {
        /// Room identifier from matchmaking
        #[arg(long)]
        room: String,

        /// Game server WebSocket URL
        #[arg(long)]
        url: Option<String>,

        /// Your user id
        #[arg(long)]
        user_id: Option<u64>,

        /// Your display name
        #[arg(long)]
        username: Option<String>,
    },

    /// Decode a wire board object (a file, or - for stdin)
    Decode {
        /// Input file
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            room,
            url,
            user_id,
            username,
        } => {
            let file = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
            let session = session_config(file, room, url, user_id, username)?;
            play::run(session).await?;
        }
        Commands::Decode { input } => {
            decode::run(&input).await?;
        }
    }

    Ok(())
}

/// Merge flags over file values.
fn session_config(
    file: Config,
    room: String,
    url: Option<String>,
    user_id: Option<u64>,
    username: Option<String>,
) -> Result<SessionConfig> {
    let user_id = user_id
        .or(file.player.user_id)
        .context("No user id: pass --user-id or set player.user_id in the config file")?;
    let username = username
        .or(file.player.username)
        .context("No username: pass --username or set player.username in the config file")?;
    let url = url.unwrap_or(file.server.url);

    Ok(SessionConfig::new(url, room.as_str(), UserId::new(user_id), username)
        .with_reconnect(file.reconnect))
}
