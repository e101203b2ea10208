use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

use voicebot::bot::{
    ConversationId, ConversationStore, DispatchEngine, TelegramClient, ThrottlePolicy,
};
use voicebot::config::Config;

/// How often the number of tracked conversations is logged.
const STATS_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
enum Command {
    #[command(description = "Show the voice menu.")]
    Start,
    #[command(description = "Hide the voice menu.")]
    Clear,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "voicebot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let _guard = init_logging(&config.data_dir);

    info!("🚀 Starting voicebot...");
    info!("Loaded config from {config_path}");
    info!(
        "{} trigger(s), repeat limit {}",
        config.catalog.len(),
        config.repeat_limit
    );
    for trigger in config.presenter.unlisted_triggers(&config.catalog) {
        info!("Trigger {:?} is not on the keyboard", trigger.as_str());
    }

    let bot = Bot::new(&config.telegram_bot_token);
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register commands: {e}");
    }

    let Config {
        catalog,
        presenter,
        repeat_limit,
        refusal_text,
        state_idle_ttl,
        state_max_conversations,
        ..
    } = config;

    let store = ConversationStore::new(state_idle_ttl, state_max_conversations);
    spawn_stats_logger(store.clone());

    let engine = Arc::new(DispatchEngine::new(
        Arc::new(catalog),
        store,
        ThrottlePolicy::new(repeat_limit),
        Arc::new(presenter),
        Arc::new(TelegramClient::new(bot.clone())),
        refusal_text,
    ));

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Stdout plus `<data_dir>/logs/voicebot.log`. Falls back to stdout only if
/// the log file can't be opened.
fn init_logging(data_dir: &Path) -> Option<WorkerGuard> {
    let log_dir = data_dir.join("logs");
    let log_file = std::fs::create_dir_all(&log_dir).and_then(|_| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("voicebot.log"))
    });

    let (file_layer, guard) = match log_file {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                );
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("Failed to open log file in {}: {e}", log_dir.display());
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(file_layer)
        .init();

    guard
}

fn spawn_stats_logger(store: ConversationStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STATS_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            info!("📊 Tracking {} conversation(s)", store.entry_count());
        }
    });
}

async fn handle_command(msg: Message, cmd: Command, engine: Arc<DispatchEngine>) -> ResponseResult<()> {
    let chat = ConversationId(msg.chat.id.0);
    match cmd {
        Command::Start => engine.start_session(chat).await,
        Command::Clear => engine.clear_menu(chat).await,
    }
    Ok(())
}

async fn handle_message(msg: Message, engine: Arc<DispatchEngine>) -> ResponseResult<()> {
    engine
        .handle_message(ConversationId(msg.chat.id.0), msg.text())
        .await;
    Ok(())
}
