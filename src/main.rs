mod commands;
mod gateway;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use yuki_channels::telegram::TelegramChannel;
use yuki_core::{
    config::{self, shellexpand, YukiConfig},
    context::Context,
    traits::{Channel, Provider},
};
use yuki_engage::{ActivityMonitor, ChannelDispatcher, InteractionScheduler, MessageComposer};
use yuki_memory::Store;
use yuki_moderation::{ContentClassifier, Moderator, ProviderClassifier};

#[derive(Parser)]
#[command(
    name = "yuki",
    version,
    about = "Yuki, a Telegram group companion that speaks up when the chat goes quiet"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml", env = "YUKI_CONFIG")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Check configuration and provider availability.
    Status,
    /// Send a one-shot message to the persona.
    Ask {
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_logging(&cfg.yuki, matches!(cli.command, Commands::Start));

    match cli.command {
        Commands::Start => {
            let tg = match cfg.channel.telegram.clone() {
                Some(tg) if tg.enabled => tg,
                _ => anyhow::bail!(
                    "Telegram is not enabled. Enable [channel.telegram] in {}.",
                    cli.config
                ),
            };
            if tg.bot_token.is_empty() {
                anyhow::bail!(
                    "Telegram is enabled but bot_token is empty. \
                     Set it in config.toml or the YUKI_TELEGRAM_TOKEN env var."
                );
            }

            let provider = build_provider(&cfg)?;
            if !provider.is_available().await {
                anyhow::bail!("provider '{}' is not available", provider.name());
            }

            let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::new(&tg));
            let store = Store::new(&cfg.memory).await?;

            let classifier: Arc<dyn ContentClassifier> =
                Arc::new(ProviderClassifier::new(provider.clone()));
            let moderator = Moderator::new(&cfg.moderation, Some(classifier))?;

            let monitor = Arc::new(ActivityMonitor::new(cfg.activity.clone()));
            let composer = MessageComposer::new(provider.clone(), cfg.yuki.persona.clone());
            let dispatcher = Arc::new(ChannelDispatcher::new(channel.clone()));
            let scheduler = Arc::new(InteractionScheduler::new(
                monitor.clone(),
                composer,
                dispatcher,
                cfg.interaction.clone(),
            ));

            println!("{} is waking up...", cfg.yuki.name);
            let gw = Arc::new(gateway::Gateway::new(
                provider, channel, store, monitor, scheduler, moderator, cfg,
            ));
            gw.run().await?;
        }
        Commands::Status => {
            println!("{} status check\n", cfg.yuki.name);
            println!("Config: {}", cli.config);
            println!("Provider: {}", cfg.provider.default);

            match build_provider(&cfg) {
                Ok(provider) => println!(
                    "  {}: {}",
                    provider.name(),
                    if provider.is_available().await {
                        "available"
                    } else {
                        "missing api key"
                    }
                ),
                Err(e) => println!("  {e}"),
            }
            println!();

            if let Some(ref tg) = cfg.channel.telegram {
                println!(
                    "  telegram: {}",
                    if tg.enabled && !tg.bot_token.is_empty() {
                        "configured"
                    } else if tg.enabled {
                        "enabled but missing bot_token"
                    } else {
                        "disabled"
                    }
                );
                println!("  admins: {}", tg.admin_users.len());
            } else {
                println!("  telegram: not configured");
            }

            println!("  memory: {}", shellexpand(&cfg.memory.db_path));
            println!(
                "  auto-interaction: {} (every {}m, p={})",
                if cfg.interaction.enabled { "on" } else { "off" },
                cfg.interaction.check_interval_minutes,
                cfg.interaction.interaction_probability
            );
            println!(
                "  moderation: {}{}",
                if cfg.moderation.enabled { "on" } else { "off" },
                if cfg.moderation.ai_classification {
                    " + AI classification"
                } else {
                    ""
                }
            );
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: yuki ask <message>");
            }

            let prompt = message.join(" ");
            let provider = build_provider(&cfg)?;
            if !provider.is_available().await {
                anyhow::bail!(
                    "provider '{}' is not available. Is its API key set?",
                    provider.name()
                );
            }

            let context = Context::with_system(&cfg.yuki.persona, &prompt);
            let response = provider.complete(&context).await?;
            println!("{}", response.text);
        }
    }

    Ok(())
}

/// Build the configured provider.
fn build_provider(cfg: &config::Config) -> anyhow::Result<Arc<dyn Provider>> {
    Ok(yuki_providers::build(&cfg.provider)?)
}

/// Console logging, plus `{data_dir}/logs/yuki.log` for long-running commands.
///
/// `RUST_LOG` wins over the configured level. The returned guard flushes the
/// file writer and must live until exit.
fn init_logging(yuki: &YukiConfig, to_file: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(yuki.log_level.as_str()));

    let mut guard = None;
    let file_layer = if to_file && !yuki.data_dir.is_empty() {
        let dir = PathBuf::from(shellexpand(&yuki.data_dir)).join("logs");
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::never(&dir, "yuki.log");
                let (writer, g) = tracing_appender::non_blocking(appender);
                guard = Some(g);
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
            }
            Err(e) => {
                eprintln!("cannot create log dir {}: {e}", dir.display());
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}
