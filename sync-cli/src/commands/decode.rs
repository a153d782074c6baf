//! Decode a wire board object and print it.

use anyhow::{Context, Result};
use boardsync_core::BoardState;
use serde_json::Value;
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::render;

/// Run the decode command. `-` reads from stdin.
pub async fn run(input: &Path) -> Result<()> {
    let text = if input == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read stdin")?;
        text
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))?
    };

    let board = decode_text(&text)?;
    print!("{}", render::board(&board, false));
    print!("{}", render::summary(&board));
    Ok(())
}

/// Accepts either a bare board object or a whole `gameState`/`gameUpdate`
/// frame, in which case its `gameState` field is decoded.
fn decode_text(text: &str) -> Result<BoardState> {
    let value: Value = serde_json::from_str(text).context("Input is not JSON")?;
    let board = match value.get("gameState") {
        Some(inner) if value.get("type").is_some() => inner,
        _ => &value,
    };
    boardsync_core::decode(board).context("Not a board state")
}
