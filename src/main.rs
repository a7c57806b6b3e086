use std::sync::Arc;

use anyhow::Context;

use sales_funnel::bot::Bot;
use sales_funnel::catalog::{NameMatcher, load_catalog};
use sales_funnel::channels::{Channel, CliChannel, TelegramChannel};
use sales_funnel::config::{FunnelConfig, TelegramConfig};
use sales_funnel::funnel::{EngineDeps, FunnelEngine, SystemClock};
use sales_funnel::store::{JsonFileStore, StateStore};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %format!("{e:#}"), "Fatal error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = FunnelConfig::from_env().context("invalid configuration")?;

    eprintln!("🎯 Sales Funnel v{}", env!("CARGO_PKG_VERSION"));

    // ── Catalog ─────────────────────────────────────────────────────────
    let catalog = load_catalog(&config.catalog_dir, &config.media_dir)
        .await
        .with_context(|| format!("loading catalog from {}", config.catalog_dir.display()))?;
    eprintln!(
        "   Catalog: {} programs ({})",
        catalog.entries().len(),
        config.catalog_dir.display()
    );

    // ── State ───────────────────────────────────────────────────────────
    let store = JsonFileStore::open(&config.state_path).await;
    eprintln!(
        "   State: {} conversations ({})",
        store.len().await,
        config.state_path.display()
    );

    // ── Channel ─────────────────────────────────────────────────────────
    let channel: Arc<dyn Channel> = match TelegramConfig::from_env() {
        Some(telegram) => {
            eprintln!(
                "   Channel: telegram (allowed: {})",
                if telegram.allowed_users.iter().any(|u| u == "*") {
                    "everyone".to_string()
                } else {
                    telegram.allowed_users.join(", ")
                }
            );
            Arc::new(TelegramChannel::new(telegram))
        }
        None => {
            eprintln!("   Channel: cli (prefix a line with @<id> to impersonate a user)\n");
            Arc::new(CliChannel::new())
        }
    };

    let engine = Arc::new(FunnelEngine::new(
        &config,
        EngineDeps {
            catalog: Arc::new(catalog),
            matcher: Arc::new(NameMatcher),
            store: Arc::new(store),
            channel: Arc::clone(&channel),
            clock: Arc::new(SystemClock),
        },
    ));

    Bot::new(&config, channel, engine).run().await?;
    Ok(())
}
