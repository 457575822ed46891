//! Faucet bot executable.
//!
//! ## Usage
//!
//! ```bash
//! # Use ./faucet-bot.toml (defaults if missing) plus FAUCET_* overrides
//! faucet-bot
//!
//! # Explicit config, verbose logs, in-memory claim store
//! faucet-bot --config /etc/faucet/faucet-bot.toml --log-level debug --ephemeral
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use faucet_bot::adapters::{JsonRpcClient, RpcFaucetWallet, RpcNodeConnector, WalletSettings};
use faucet_bot::application::{
    BotContext, ClaimLedger, Dispatcher, EligibilityEngine, StatusTask,
};
use faucet_bot::{BotConfig, ConsoleTransport, InMemoryStatusStore, StatusStore};
use faucet_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};

/// Pactus faucet bot
#[derive(Parser, Debug)]
#[command(name = "faucet-bot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "faucet-bot.toml")]
    config: PathBuf,

    /// Log level or filter directive (overrides FAUCET_LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    /// Keep claim records in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Name used for console lines without a `name:` prefix
    #[arg(long, default_value = "console")]
    user: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let result = runtime.block_on(run(args));
    // A pending stdin read must not hold the process open.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn run(args: Args) -> Result<()> {
    let mut telemetry = TelemetryConfig::from_env();
    if let Some(level) = &args.log_level {
        telemetry = telemetry.with_log_level(level.clone());
    }
    let _telemetry = init_telemetry(telemetry).context("failed to initialize telemetry")?;

    let config = load_config(&args)?;
    info!(
        node = %config.node.endpoint,
        wallet = %config.wallet_endpoint(),
        amount = %config.faucet_amount(),
        "Starting faucet bot v{}",
        faucet_bot::VERSION
    );

    let store = open_store(&config, args.ephemeral)?;
    let connector = Arc::new(RpcNodeConnector::new(
        config.node.endpoint.clone(),
        config.request_timeout(),
        config.connect_timeout(),
    ));

    let wallet_rpc = JsonRpcClient::new(
        config.wallet_endpoint(),
        config.request_timeout(),
        config.connect_timeout(),
    )
    .context("invalid wallet endpoint")?;
    let wallet = Arc::new(RpcFaucetWallet::new(
        wallet_rpc,
        WalletSettings {
            faucet_address: config.faucet.address.clone(),
            wallet_name: config.wallet.name.clone(),
            password: config.wallet.password.clone(),
            fee: config.faucet_fee(),
        },
    ));

    let engine = Arc::new(EligibilityEngine::new(
        config.eligibility(),
        connector.clone(),
        wallet,
        ClaimLedger::new(store),
    ));
    let dispatcher = Dispatcher::new(BotContext {
        connector: connector.clone(),
        faucet: engine,
        bot_user_id: config.discord.bot_user_id.clone(),
        hrp: config.chain.hrp.clone(),
        request_timeout: config.request_timeout(),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (status_task, mut status_rx) = StatusTask::new(
        connector,
        config.status_interval(),
        config.request_timeout(),
    );
    let status_handle = tokio::spawn(status_task.run(shutdown_rx.clone()));
    let status_logger = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            if let Some(snapshot) = *status_rx.borrow() {
                info!(
                    height = snapshot.height,
                    peers = snapshot.connected_peers,
                    validators = snapshot.total_validators,
                    "Chain status"
                );
            }
        }
    });

    if config.discord.token.is_empty() {
        info!("No chat platform token configured; serving the console transport");
    } else {
        warn!(
            guild = %config.discord.guild_id,
            "Chat gateway is provided externally; serving the console transport"
        );
    }

    let console = ConsoleTransport::new(dispatcher, args.user.clone());
    let mut console_handle = tokio::spawn(console.run(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        shutdown_rx,
    ));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
        finished = &mut console_handle => {
            finished
                .context("console task panicked")?
                .context("console transport failed")?;
            info!("Console input closed");
        }
    }

    // Graceful shutdown
    let _ = shutdown_tx.send(true);
    if !console_handle.is_finished() {
        match tokio::time::timeout(Duration::from_secs(5), &mut console_handle).await {
            Ok(Ok(Err(e))) => warn!("Console transport failed during shutdown: {}", e),
            Ok(_) => {}
            Err(_) => warn!("In-flight requests did not finish within 5s"),
        }
    }
    let _ = status_handle.await;
    status_logger.abort();

    if let Ok(metrics) = encode_metrics() {
        debug!("Final metrics:\n{}", metrics);
    }
    info!("Faucet bot stopped");
    Ok(())
}

fn load_config(args: &Args) -> Result<BotConfig> {
    let mut config = BotConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[cfg(feature = "rocksdb")]
fn open_store(config: &BotConfig, ephemeral: bool) -> Result<Arc<dyn StatusStore>> {
    use faucet_bot::adapters::store::RocksDbStoreConfig;
    use faucet_bot::RocksDbStatusStore;

    if ephemeral {
        warn!("Claim records are kept in memory and lost on exit");
        return Ok(Arc::new(InMemoryStatusStore::new()));
    }
    let store = RocksDbStatusStore::open(RocksDbStoreConfig {
        path: config.store.path.clone(),
        sync_writes: true,
    })
    .with_context(|| format!("failed to open claim store at {}", config.store.path))?;
    info!("Claim store holds {} records", store.len()?);
    Ok(Arc::new(store))
}

#[cfg(not(feature = "rocksdb"))]
fn open_store(config: &BotConfig, ephemeral: bool) -> Result<Arc<dyn StatusStore>> {
    if !ephemeral {
        warn!(
            "Built without RocksDB; ignoring store.path {} and keeping claims in memory",
            config.store.path
        );
    }
    Ok(Arc::new(InMemoryStatusStore::new()))
}
