use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vitrina")]
#[command(author, version, about = "Telegram channel page manager with a persistent message ledger", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot in normal mode
    Run {
        /// Use webhook mode instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Run the bot in staging mode (uses staging environment variables)
    RunStaging {
        /// Use webhook mode instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Manage the Telegram webhook registration
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
}

#[derive(Subcommand)]
pub enum WebhookAction {
    /// Register the webhook URL with Telegram
    Set {
        /// Public HTTPS URL (defaults to WEBHOOK_URL)
        #[arg(long)]
        url: Option<String>,

        /// Secret token Telegram echoes back on every delivery
        /// (defaults to WEBHOOK_SECRET)
        #[arg(long)]
        secret: Option<String>,
    },

    /// Print the current webhook registration
    Info,

    /// Remove the webhook registration (reverts to polling)
    Delete,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
