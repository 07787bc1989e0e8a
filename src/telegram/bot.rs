//! Bot initialization and command surface
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation (token per environment, custom API URL support)
//! - Command registration in the Telegram UI

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "show the welcome page and language picker")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "bot uptime and counters")]
    Status,
    #[command(description = "publish the pinned welcome page to the channel (admins only)")]
    SendToChannel,
    #[command(description = "delete every tracked channel message (admins only)")]
    SweepChannel,
    #[command(description = "open the admin panel (admins only)")]
    Admin,
}

/// Creates a Bot instance with the environment's token and an optional
/// custom API URL (`BOT_API_URL`, for a local Bot API server).
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = config::bot_token()?;
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;

    let bot = if let Ok(bot_api_url) = std::env::var("BOT_API_URL") {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        Bot::with_client(token, client).set_api_url(url)
    } else {
        Bot::with_client(token, client)
    };

    Ok(bot)
}

/// Registers the command list shown in the Telegram client UI.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "show the welcome page and language picker"),
        BotCommand::new("help", "show available commands"),
        BotCommand::new("status", "bot uptime and counters"),
        BotCommand::new("sendtochannel", "publish the pinned welcome page to the channel (admins only)"),
        BotCommand::new("sweepchannel", "delete every tracked channel message (admins only)"),
        BotCommand::new("admin", "open the admin panel (admins only)"),
    ])
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lowercase_commands() {
        assert_eq!(Command::parse("/start", "vitrina_bot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/sendtochannel", "vitrina_bot").unwrap(), Command::SendToChannel);
        assert_eq!(Command::parse("/sweepchannel@vitrina_bot", "vitrina_bot").unwrap(), Command::SweepChannel);
        assert!(Command::parse("/backup", "vitrina_bot").is_err());
    }

    #[test]
    fn descriptions_list_every_command() {
        let listing = Command::descriptions().to_string();
        for name in ["start", "help", "status", "sendtochannel", "sweepchannel", "admin"] {
            assert!(listing.contains(name), "missing /{} in descriptions", name);
        }
    }
}
