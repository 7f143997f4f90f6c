//! Echo Bot Example
//!
//! A small hubbot that answers a few `!` commands in the rooms it joins.
//!
//! # Handler Chain
//!
//! Handlers are offered each message in registration order and the first one
//! returning `Ok(true)` consumes it:
//!
//! ```text
//! logging (never consumes) ─▶ !echo ─▶ !ping ─▶ !rooms ─▶ !join ─▶ !help
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot -- --config hubbot.toml --room lobby
//! ```

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use hubbot::prelude::*;
use tracing::info;

const HELP_TEXT: &str = "commands: !echo <text>, !ping, !rooms, !join <room>, !help";

#[derive(Parser, Debug)]
#[command(name = "echo-bot", about = "A simple echo bot for hubbot")]
struct Cli {
    /// Config file, searched in the working directory when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Config profile, e.g. `dev` loads `hubbot.dev.toml` first.
    #[arg(short, long)]
    profile: Option<String>,

    /// Extra rooms to join, replacing `bot.rooms`.
    #[arg(short, long = "room")]
    rooms: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Logs every message and passes it on.
struct Logging;

#[async_trait]
impl Handler for Logging {
    fn name(&self) -> &str {
        "logging"
    }

    async fn handle(&self, message: &ChatMessage, _bot: &Bot) -> anyhow::Result<bool> {
        info!(room = %message.room(), sender = %message.sender(), "{}", message.content());
        Ok(false)
    }
}

/// `!echo <text>` - says the text back in the same room.
struct Echo;

#[async_trait]
impl Handler for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    async fn handle(&self, message: &ChatMessage, bot: &Bot) -> anyhow::Result<bool> {
        let Some(text) = message.content().strip_prefix("!echo ") else {
            return Ok(false);
        };
        bot.say_in(text, message.room()).await?;
        Ok(true)
    }
}

/// `!join <room>` - joins another room.
struct Join;

#[async_trait]
impl Handler for Join {
    fn name(&self) -> &str {
        "join"
    }

    async fn handle(&self, message: &ChatMessage, bot: &Bot) -> anyhow::Result<bool> {
        let Some(room) = message.content().strip_prefix("!join ") else {
            return Ok(false);
        };
        let room = room.trim();
        bot.join(room).await?;
        bot.reply(message.sender(), &format!("joined {room}"), message.room())
            .await?;
        Ok(true)
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = HubbotRuntime::builder();
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }
    if !cli.rooms.is_empty() {
        builder = builder.set("bot.rooms", &cli.rooms);
    }
    let runtime = builder.build()?;

    runtime.add_handler(Logging);
    runtime.add_handler(Echo);
    runtime.add_handler(
        handler_fn(|message, bot| async move {
            if message.content().trim() != "!ping" {
                return Ok(false);
            }
            bot.reply(message.sender(), "pong", message.room()).await?;
            Ok(true)
        })
        .named("ping"),
    );
    runtime.add_handler(
        handler_fn(|message, bot| async move {
            if message.content().trim() != "!rooms" {
                return Ok(false);
            }
            let rooms = bot.rooms().join(", ");
            bot.private_reply(message.sender(), &format!("I am in: {rooms}"))
                .await?;
            Ok(true)
        })
        .named("rooms"),
    );
    runtime.add_handler(Join);
    runtime.add_handler(
        handler_fn(|message, bot| async move {
            if message.content().trim() != "!help" {
                return Ok(false);
            }
            bot.private_reply(message.sender(), HELP_TEXT).await?;
            Ok(true)
        })
        .named("help"),
    );

    runtime.run_ws().await?;
    Ok(())
}
