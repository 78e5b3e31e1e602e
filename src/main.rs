mod api;
mod config;
mod error;
mod models;
mod services;
mod sources;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{create_rest_router, AppState};
use config::Config;
use services::notifier::build_message;
use services::{DailyCollector, LarkNotifier, SnapshotStore, Sources};

#[derive(Parser)]
#[command(name = "dex-dashboard", about = "Daily DEX snapshot, alerts and digest")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect today's snapshot and publish it
    Collect {
        /// Replace an already published snapshot for the date
        #[arg(long)]
        force: bool,
        /// Snapshot date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Push the latest snapshot to Lark
    Push {
        #[arg(long, env = "LARK_WEBHOOK")]
        webhook: Option<String>,
        /// Print the message without sending it
        #[arg(long)]
        dry_run: bool,
    },
    /// Serve published snapshots over HTTP
    Serve,
}

async fn collect(config: &Config, date: Option<NaiveDate>, force: bool) -> anyhow::Result<()> {
    let sources = Sources::from_config(config).context("building data sources")?;
    let collector = DailyCollector::new(config, sources);
    let date = date.unwrap_or_else(|| Local::now().date_naive());

    let summary = collector.run(date, Utc::now(), force).await?;
    println!("\n✅ {} published to {}", summary.date, summary.path.display());
    Ok(())
}

async fn push(config: &Config, webhook: Option<String>, dry_run: bool) -> anyhow::Result<()> {
    let store = SnapshotStore::new(config.data_dir());
    let Some(snapshot) = store.load_latest()? else {
        bail!("No published snapshot under {}, run `collect` first", store.root().display());
    };

    let text = build_message(&snapshot, &config.sources.platform_name, &config.sources.platform_slug);
    println!("{text}\n{}", "=".repeat(40));

    if dry_run {
        tracing::info!("Dry run, nothing sent");
        return Ok(());
    }

    let Some(webhook) = webhook.or_else(|| config.notify.lark_webhook.clone()) else {
        bail!("No Lark webhook: set LARK_WEBHOOK, [notify].lark_webhook or pass --webhook");
    };

    LarkNotifier::new(webhook)?.send_text(&text).await?;
    tracing::info!("✓ Lark push sent for {}", snapshot.date);
    Ok(())
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState { store: SnapshotStore::new(config.data_dir()) });
    let app = create_rest_router(state).layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("✓ Serving snapshots from {} on http://{}", config.storage.data_dir, addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dex_dashboard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    tracing::info!("✓ Configuration loaded");

    match cli.command {
        Command::Collect { force, date } => collect(&config, date, force).await,
        Command::Push { webhook, dry_run } => push(&config, webhook, dry_run).await,
        Command::Serve => serve(&config).await,
    }
}
