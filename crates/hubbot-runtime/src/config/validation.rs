//! Configuration validation utilities.

use hubbot_core::names_match;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotSection, HubConfig, HubbotConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &HubbotConfig) -> ConfigResult<()> {
    validate_hub_config(&config.hub)?;
    validate_bot_config(&config.bot)?;
    Ok(())
}

/// Validates hub connection settings.
fn validate_hub_config(hub: &HubConfig) -> ConfigResult<()> {
    validate_url(&hub.url)?;

    if hub.invoke_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "Invoke timeout must be greater than 0",
        ));
    }

    Ok(())
}

/// Validates the bot identity and room list.
fn validate_bot_config(bot: &BotSection) -> ConfigResult<()> {
    if bot.name.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.name"));
    }

    // The name travels as a single word inside `/nick <name> <secret>`.
    if bot.name.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation("Bot name cannot contain whitespace"));
    }

    let mut seen: Vec<&str> = Vec::with_capacity(bot.rooms.len());
    for room in &bot.rooms {
        if room.trim().is_empty() {
            return Err(ConfigError::validation("Room names cannot be empty"));
        }
        if seen.iter().any(|r| names_match(r, room)) {
            return Err(ConfigError::DuplicateRoom(room.clone()));
        }
        seen.push(room);
    }

    Ok(())
}

/// Validates the hub URL.
fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("hub.url"));
    }

    let valid_schemes = ["ws://", "wss://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }

    Ok(())
}
