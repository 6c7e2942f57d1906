use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ChatKind;
use tracing::{debug, error, info};
use tracing_subscriber::prelude::*;

use relaybot::access::{Access, AccessGate};
use relaybot::chatbot::telegram::to_raw_update;
use relaybot::chatbot::{Database, Pipeline, Platform, TelegramClient};
use relaybot::claude::Client as ClaudeClient;
use relaybot::config::Config;
use relaybot::telegram_log::LogChatLayer;

struct BotState {
    gate: AccessGate,
    pipeline: Pipeline,
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "relaybot.json".to_string());
    let config = Config::load(&config_path).unwrap_or_else(|e| fail(e));

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("relaybot.log"))
        .unwrap_or_else(|e| fail(format!("Failed to open log file: {e}")));
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        let layer = LogChatLayer::new(bot.clone(), log_chat_id, config.token_mask());
        registry.with(layer).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting relaybot...");
    info!("Loaded config from {config_path}");
    if config.allowed_user_ids.is_empty() {
        info!("No allowed_user_ids configured, accepting everyone");
    } else {
        info!("Allowed users: {:?}", config.allowed_user_ids);
    }

    let telegram = TelegramClient::connect(bot.clone(), config.telegram_bot_token.clone())
        .await
        .unwrap_or_else(|e| fail(e));
    let me = telegram.identity();
    info!("Bot user ID: {}, username: @{}", me.user_id, me.username.as_deref().unwrap_or("?"));

    let store = Database::open(&config.data_dir.join("transcript.db"))
        .unwrap_or_else(|e| fail(format!("Failed to open transcript: {e}")));

    let completion = ClaudeClient::new(
        config.completion_api_key.clone(),
        config.completion_endpoint.clone(),
        config.completion_model.clone(),
        config.completion_max_tokens,
    );

    let pipeline = Pipeline::new(
        config.pipeline_config(),
        Arc::new(telegram),
        Arc::new(completion),
        Arc::new(store),
    );

    let state = Arc::new(BotState {
        gate: AccessGate::new(config.allowed_user_ids.clone()),
        pipeline,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    // Conversations are one-on-one; groups are ignored.
    if !matches!(msg.chat.kind, ChatKind::Private(_)) {
        return Ok(());
    }

    let sender = msg.from.as_ref().map(|u| u.id);
    if state.gate.check(sender) == Access::Deny {
        info!("🚫 Ignoring message from non-allowed user {:?}", sender);
        return Ok(());
    }

    match state.pipeline.handle_update(to_raw_update(&msg)).await {
        Ok(outcome) => debug!("Message {} in chat {}: {:?}", msg.id, msg.chat.id, outcome),
        Err(e) => error!("Failed to handle message {} in chat {}: {e}", msg.id, msg.chat.id),
    }

    Ok(())
}
