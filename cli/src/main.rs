//! ChainWatch daemon: watches an EVM chain for subscribed addresses and
//! serves their transactions over HTTP.
//!
//! # Commands
//! ```bash
//! chainwatch run  --config chainwatch.yaml
//! chainwatch info --config chainwatch.yaml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use chainwatch_core::{SubscriberRegistry, TransactionStore};
use chainwatch_evm::WatcherBuilder;
use chainwatch_storage::{InMemoryRegistry, InMemoryTxStore, SqliteStorage};

mod config;
mod tracing_setup;

use config::{AppConfig, Overrides, StorageBackend, StorageConfig};

#[derive(Parser)]
#[command(
    name = "chainwatch",
    about = "Watch an EVM chain for subscribed addresses",
    long_about = "
ChainWatch: follows new block headers over WebSocket, fetches each block over
HTTP JSON-RPC, recovers transaction senders and records transactions that
touch a subscribed address. Exposes /api/current-block, /api/subscribe,
/api/txs and /api/stats.

ENVIRONMENT VARIABLES:
  CHAINWATCH_CONFIG      Path to the YAML config file
  CHAINWATCH_HTTP_URL    JSON-RPC endpoint for block fetches
  CHAINWATCH_WS_URL      WebSocket endpoint for the header subscription
  CHAINWATCH_LISTEN      HTTP API listen address
  CHAINWATCH_LOG         Log level / EnvFilter directive
  CHAINWATCH_JSON_LOGS   true for JSON log lines
",
    version
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct GlobalArgs {
    /// YAML config file; missing file means built-in defaults
    #[arg(short, long, global = true, env = "CHAINWATCH_CONFIG", default_value = "chainwatch.yaml")]
    config: PathBuf,

    #[arg(long, global = true, env = "CHAINWATCH_HTTP_URL")]
    http_url: Option<String>,

    #[arg(long, global = true, env = "CHAINWATCH_WS_URL")]
    ws_url: Option<String>,

    #[arg(long, global = true, env = "CHAINWATCH_LISTEN")]
    listen: Option<String>,

    #[arg(long, global = true, env = "CHAINWATCH_LOG")]
    log: Option<String>,

    #[arg(long, global = true, env = "CHAINWATCH_JSON_LOGS", value_name = "BOOL")]
    json_logs: Option<bool>,
}

impl GlobalArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            http_url: self.http_url.clone(),
            ws_url: self.ws_url.clone(),
            listen_addr: self.listen.clone(),
            log_level: self.log.clone(),
            json_logs: self.json_logs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the watcher pipeline and the HTTP API (default)
    Run,
    /// Print the effective configuration and exit
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = AppConfig::load(&cli.global.config)?;
    let found = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    config.apply(cli.global.overrides());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Info => cmd_info(&config, found, &cli.global.config),
        Commands::Run => {
            tracing_setup::init_tracing(&config.log);
            if !found {
                warn!(path = %cli.global.config.display(), "config file not found, using defaults");
            }
            cmd_run(config).await
        }
    }
}

fn cmd_info(config: &AppConfig, found: bool, path: &std::path::Path) -> Result<()> {
    println!("ChainWatch v{}", env!("CARGO_PKG_VERSION"));
    if found {
        println!("  Config file: {}", path.display());
    } else {
        println!("  Config file: {} (not found, defaults)", path.display());
    }
    println!();
    print!("{}", serde_yaml::to_string(config).context("rendering config")?);
    Ok(())
}

async fn cmd_run(config: AppConfig) -> Result<()> {
    let (registry, store) = open_storage(&config.storage).await?;

    let pipeline = WatcherBuilder::new()
        .http_url(config.chain.http_url.clone())
        .ws_url(config.chain.ws_url.clone())
        .config(config.watcher.clone())
        .request_timeout(config.chain.request_timeout())
        .registry(registry)
        .store(store)
        .build()
        .context("building watcher pipeline")?;
    let service = pipeline.service();

    let listener = TcpListener::bind(&config.http.listen_addr)
        .await
        .with_context(|| format!("binding HTTP API to {}", config.http.listen_addr))?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    info!(
        http_url = %config.chain.http_url,
        ws_url = %config.chain.ws_url,
        queue_capacity = config.watcher.queue_capacity,
        "chainwatch starting"
    );

    let api = tokio::spawn(chainwatch_api::serve(listener, service, cancel.clone()));
    let outcome = pipeline.run(cancel.clone()).await;

    // The pipeline only returns early on a fatal error; take the API down too.
    cancel.cancel();
    match api.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "HTTP server failed"),
        Err(e) => error!(error = %e, "HTTP server task panicked"),
    }

    if let Err(e) = &outcome {
        error!(error = %e, "pipeline terminated");
    }
    outcome.context("watcher pipeline failed")?;
    info!("chainwatch stopped");
    Ok(())
}

async fn open_storage(cfg: &StorageConfig) -> Result<(Arc<dyn SubscriberRegistry>, Arc<dyn TransactionStore>)> {
    match cfg.backend {
        StorageBackend::Memory => {
            info!("using in-memory storage");
            let registry: Arc<dyn SubscriberRegistry> = Arc::new(InMemoryRegistry::new());
            let store: Arc<dyn TransactionStore> = Arc::new(InMemoryTxStore::new());
            Ok((registry, store))
        }
        StorageBackend::Sqlite => {
            let storage = SqliteStorage::open(&cfg.path)
                .await
                .with_context(|| format!("opening SQLite database {}", cfg.path))?;
            info!(path = %cfg.path, "using SQLite storage");
            let storage = Arc::new(storage);
            let registry: Arc<dyn SubscriberRegistry> = Arc::clone(&storage) as _;
            let store: Arc<dyn TransactionStore> = storage;
            Ok((registry, store))
        }
    }
}

async fn cancel_on_signal(cancel: CancellationToken) {
    shutdown_signal().await;
    info!("shutdown signal received");
    cancel.cancel();
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "cannot install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
