use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use tokio::signal;
use tokio::sync::mpsc;

use vitrina::cli::{Cli, Commands, WebhookAction};
use vitrina::core::{config, init_logger, log_startup_configuration, Stats};
use vitrina::publisher::{channel_recipient, ChannelPublisher};
use vitrina::telegram::{create_bot, schema, setup_bot_commands, webhook_router, HandlerDeps, WebhookState};
use vitrina::{ContentStore, LedgerStore};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Global panic handler so dispatcher panics are logged instead of
    // silently killing the process.
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // Environment files must load before the logger (and before any other
    // config static), or values set in them are invisible to the Lazy reads.
    // Staging credentials override whatever `.env` also defines.
    let staging = matches!(cli.command, Some(Commands::RunStaging { .. }));
    let env_warnings = config::load_env_files(staging.then_some(Path::new(".env.staging")));

    init_logger(&config::LOG_FILE_PATH)?;
    for warning in &env_warnings {
        log::warn!("{}", warning);
    }

    match cli.command {
        Some(Commands::Run { webhook }) => {
            log::info!("Running bot in normal mode (webhook: {})", webhook);
            run_bot(webhook).await
        }
        Some(Commands::RunStaging { webhook }) => {
            log::info!("Running bot in staging mode (webhook: {})", webhook);
            run_bot(webhook).await
        }
        Some(Commands::Webhook { action }) => run_webhook_action(action).await,
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot(false).await
        }
    }
}

/// One-shot webhook management against the Bot API.
async fn run_webhook_action(action: WebhookAction) -> Result<()> {
    let bot = create_bot()?;

    match action {
        WebhookAction::Set { url, secret } => {
            let url = url
                .or_else(|| config::WEBHOOK_URL.clone())
                .ok_or_else(|| anyhow::anyhow!("No webhook URL given (pass --url or set WEBHOOK_URL)"))?;
            let secret = secret.or_else(config::webhook_secret);

            let mut request = bot.set_webhook(url::Url::parse(&url)?);
            match secret {
                Some(s) => request = request.secret_token(s),
                None => println!("Warning: no secret token configured, deliveries will not be authenticated"),
            }
            request.await?;
            println!("Webhook set to {}", url);
        }
        WebhookAction::Info => {
            let info = bot.get_webhook_info().await?;
            match info.url {
                Some(url) => println!("Webhook URL: {}", url),
                None => println!("No webhook registered"),
            }
            println!("Pending updates: {}", info.pending_update_count);
            if let Some(err) = info.last_error_message {
                println!("Last delivery error: {}", err);
            }
        }
        WebhookAction::Delete => {
            bot.delete_webhook().await?;
            println!("Webhook deleted, bot reverts to polling");
        }
    }
    Ok(())
}

/// Run the Telegram bot
async fn run_bot(use_webhook: bool) -> Result<()> {
    log::info!("Starting bot...");
    log_startup_configuration();

    let bot = create_bot()?;

    let bot_info = bot.get_me().await?;
    log::info!("Bot username: {:?}, Bot ID: {}", bot_info.username, bot_info.id);

    setup_bot_commands(&bot).await?;

    let ledger = Arc::new(LedgerStore::open(config::LEDGER_PATH.as_str()));
    let content = Arc::new(ContentStore::new(config::CONTENT_DIR.as_str()));
    let publisher = Arc::new(ChannelPublisher::new(
        bot.clone(),
        channel_recipient(&config::CHANNEL_ID),
        Arc::clone(&ledger),
    ));

    let handler_deps = HandlerDeps {
        ledger,
        content,
        publisher,
        sessions: Arc::new(DashMap::new()),
        stats: Arc::new(Stats::default()),
    };

    let handler = schema(handler_deps);

    let webhook_url = if use_webhook { config::WEBHOOK_URL.clone() } else { None };

    if let Some(url) = webhook_url {
        run_webhook_mode(bot, handler, &url).await
    } else {
        if use_webhook {
            log::warn!("Webhook mode requested but WEBHOOK_URL is not set, falling back to polling");
        }
        run_polling_mode(bot, handler).await
    }
}

/// Webhook mode: register the URL with Telegram, serve the intake endpoint,
/// and drain decoded updates through the same handler tree polling uses.
async fn run_webhook_mode(
    bot: Bot,
    handler: teloxide::dispatching::UpdateHandler<vitrina::telegram::HandlerError>,
    url: &str,
) -> Result<()> {
    log::info!("Starting bot in webhook mode at {}", url);

    let secret = config::webhook_secret();
    if secret.is_none() {
        log::warn!("No webhook secret configured, the intake endpoint will accept any request");
    }

    // Re-register from a clean slate so stale URLs do not linger.
    let _ = bot.delete_webhook().await;
    let mut request = bot.set_webhook(url::Url::parse(url)?);
    if let Some(s) = secret.clone() {
        request = request.secret_token(s);
    }
    request.await?;
    log::info!("Webhook registered");

    let (tx, mut rx) = mpsc::channel::<Update>(128);
    let router = webhook_router(WebhookState { secret, updates: tx });

    let bind_addr = config::WEBHOOK_BIND_ADDR.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("Webhook server listening on {}", bind_addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            log::error!("Webhook server error: {}", e);
        }
    });

    loop {
        tokio::select! {
            maybe_update = rx.recv() => {
                let Some(update) = maybe_update else {
                    log::warn!("Webhook update queue closed, shutting down");
                    break;
                };
                match handler.dispatch(dptree::deps![bot.clone(), update]).await {
                    ControlFlow::Break(Ok(())) => {}
                    ControlFlow::Break(Err(e)) => log::error!("Handler error: {}", e),
                    ControlFlow::Continue(_) => log::debug!("Update not handled by any branch"),
                }
            }
            _ = signal::ctrl_c() => {
                log::info!("Shutting down gracefully...");
                bot.delete_webhook().await?;
                break;
            }
        }
    }
    Ok(())
}

/// Long polling mode (default).
async fn run_polling_mode(
    bot: Bot,
    handler: teloxide::dispatching::UpdateHandler<vitrina::telegram::HandlerError>,
) -> Result<()> {
    log::info!("Starting bot in long polling mode");

    // Drop updates accumulated while the bot was down; stale navigation
    // clicks against deleted messages are not worth replaying.
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    Dispatcher::builder(bot, handler)
        .dependencies(DependencyMap::new())
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
