//! FeedClaw - Personal RSS digest assistant

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feedclaw::{
    bot::Dispatcher,
    channels::{ChannelAdapter, DiscordAdapter},
    config::{default_config_path, require_secret, resolve_secret, FeedClawConfig},
    delivery::{DeliveryStore, FeedbackTracker},
    feeds::{FeedProcessor, HttpFeedFetcher},
    scheduler::RunScheduler,
    store::TextStore,
    summarizer::{CompletionClient, ModelSummarizer},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "feedclaw")]
#[command(author = "FeedClaw Team")]
#[command(version)]
#[command(about = "Personal RSS digest assistant with LLM summaries and Discord delivery")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FEEDCLAW_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and answer commands until interrupted
    Serve,

    /// Process all feeds once and exit
    Run {
        /// Discord user to deliver to (defaults to discord.owner_user_id)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Run diagnostics
    Doctor,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("feedclaw={}", log_level).into());
    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = FeedClawConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::Run { user } => run_once(config, user).await?,
        Commands::Doctor => run_doctor(&config, cli.config.as_deref()).await?,
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

/// Everything a run needs, wired from configuration
struct Components {
    channel: Arc<DiscordAdapter>,
    processor: Arc<FeedProcessor>,
}

fn build(config: &FeedClawConfig) -> Result<Components> {
    let store = TextStore::new(config.paths.clone());

    let api_key = require_secret(&config.model.api_key_ref)?;
    let client = CompletionClient::new(&config.model, api_key)?;
    let summarizer = Arc::new(ModelSummarizer::new(client, config.model.clone()));
    let fetcher = Arc::new(HttpFeedFetcher::new(Duration::from_secs(
        config.model.timeout_secs,
    ))?);

    let token = require_secret(&config.discord.bot_token_ref)?;
    let channel = Arc::new(DiscordAdapter::new(config.discord.clone(), token)?);

    let tracker = Arc::new(FeedbackTracker::new(
        channel.clone(),
        store.clone(),
        DeliveryStore::new(),
        &config.discord.command_prefix,
    ));
    let processor = Arc::new(FeedProcessor::new(
        fetcher,
        summarizer,
        tracker,
        store,
        config.notes.clone(),
    ));

    Ok(Components { channel, processor })
}

async fn serve(config: FeedClawConfig) -> Result<()> {
    tracing::info!("Starting FeedClaw");
    let Components { channel, processor } = build(&config)?;

    let (channel_tx, channel_rx) = mpsc::channel(256);
    let (bot_tx, bot_rx) = mpsc::channel(64);

    let dispatcher = Arc::new(Dispatcher::new(
        processor,
        channel.clone(),
        &config.discord.command_prefix,
    ));
    let dispatcher_task = tokio::spawn(dispatcher.run(channel_rx, bot_rx));

    let scheduler = RunScheduler::from_config(
        &config.scheduler,
        config.discord.owner_user_id.as_deref(),
    )?
    .map(|s| s.spawn(bot_tx.clone()));

    channel.start(channel_tx).await?;

    tracing::info!("FeedClaw is running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    if let Some(scheduler) = scheduler {
        scheduler.abort();
    }
    drop(bot_tx);
    channel.stop().await?;
    // The gateway task drops its sender once it sees the stop signal
    if tokio::time::timeout(Duration::from_secs(10), dispatcher_task)
        .await
        .is_err()
    {
        tracing::warn!("Dispatcher did not stop in time");
    }

    Ok(())
}

async fn run_once(config: FeedClawConfig, user: Option<String>) -> Result<()> {
    let recipient = user
        .or_else(|| config.discord.owner_user_id.clone())
        .context("No recipient: pass --user or set discord.owner_user_id")?;
    let Components { processor, .. } = build(&config)?;

    let report = processor.process_all_feeds(&recipient).await?;
    println!("{}", report.summary_line());
    for feed in report.feeds.iter().filter(|f| f.is_skipped()) {
        println!(
            "  skipped {}: {}",
            feed.url,
            feed.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

async fn run_doctor(config: &FeedClawConfig, config_path: Option<&std::path::Path>) -> Result<()> {
    println!("🔍 FeedClaw Doctor");
    println!();

    println!("Checking configuration...");
    match config_path.map(PathBuf::from).or_else(default_config_path) {
        Some(path) if path.exists() => {
            println!("  ✓ Configuration file found: {}", path.display())
        }
        _ => println!("  ℹ No configuration file found (using defaults)"),
    }

    println!();
    println!("Checking text files...");
    let paths = &config.paths;
    for (label, path) in [
        ("Interest file", &paths.interest_file),
        ("Profile file", &paths.profile_file),
        ("Feed sources", &paths.feed_sources_file),
    ] {
        if path.exists() {
            println!("  ✓ {}: {}", label, path.display());
        } else {
            println!("  ✗ {} missing: {}", label, path.display());
        }
    }
    let store = TextStore::new(paths.clone());
    match store.feed_sources().await {
        Ok(sources) => println!("  ✓ {} feed source(s) configured", sources.len()),
        Err(e) => println!("  ✗ Cannot read feed sources: {}", e),
    }

    println!();
    println!("Checking notes directory...");
    match tokio::fs::create_dir_all(&paths.notes_dir).await {
        Ok(()) => println!("  ✓ Writable: {}", paths.notes_dir.display()),
        Err(e) => println!("  ✗ {}: {}", paths.notes_dir.display(), e),
    }

    println!();
    println!("Checking secrets...");
    for secret_ref in [&config.model.api_key_ref, &config.discord.bot_token_ref] {
        if resolve_secret(secret_ref).is_some() {
            println!("  ✓ {} is set", secret_ref);
        } else {
            println!("  ✗ {} is not set", secret_ref);
        }
    }
    if config.scheduler.enabled && config.discord.owner_user_id.is_none() {
        println!("  ✗ scheduler.enabled requires discord.owner_user_id");
    }

    println!();
    println!("Doctor check complete!");

    Ok(())
}

fn show_config(config: Option<&FeedClawConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
