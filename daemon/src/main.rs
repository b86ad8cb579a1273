//! votesync daemon: mirrors a voting program into LMDB and serves it over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use votesync_api::{ApiServer, ApiState};
use votesync_indexer::{
    init_logging, IndexerConfig, LogFormat, ShutdownController, Stores, SyncMetrics, Synchronizer,
};
use votesync_ledger_client::{LedgerClient, RpcConfig, RpcLedgerClient};
use votesync_store_lmdb::{environment::DATABASE_COUNT, LmdbEnvironment};
use votesync_types::SystemClock;

#[derive(Parser, Debug)]
#[command(name = "votesync", about = "Voting program chain-state synchronizer")]
struct Cli {
    /// JSON-RPC endpoint of the ledger node.
    #[arg(long, env = "RPC_HTTP_URL")]
    rpc_http_url: Option<String>,

    /// Pub-sub endpoint (derived from the HTTP URL when omitted).
    #[arg(long, env = "RPC_WS_URL")]
    rpc_ws_url: Option<String>,

    /// Base58 address of the voting program.
    #[arg(long, env = "PROGRAM_ID")]
    program_id: Option<String>,

    /// Data directory for the LMDB mirror.
    #[arg(long, env = "VOTESYNC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Read API port.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Do not serve the read API.
    #[arg(long, env = "VOTESYNC_DISABLE_API")]
    no_api: bool,

    /// Origins allowed by CORS (comma-separated).
    #[arg(long, env = "VOTESYNC_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "VOTESYNC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "VOTESYNC_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Layer CLI flags and env vars over the file (or default) configuration.
fn merge(cli: Cli, base: IndexerConfig) -> anyhow::Result<IndexerConfig> {
    let log_format = match cli.log_format.as_deref() {
        Some(raw) => raw.parse::<LogFormat>()?,
        None => base.log_format,
    };
    Ok(IndexerConfig {
        rpc_http_url: cli.rpc_http_url.unwrap_or(base.rpc_http_url),
        rpc_ws_url: cli.rpc_ws_url.unwrap_or(base.rpc_ws_url),
        program_id: cli.program_id.unwrap_or(base.program_id),
        data_dir: cli.data_dir.unwrap_or(base.data_dir),
        api_port: cli.port.unwrap_or(base.api_port),
        enable_api: base.enable_api && !cli.no_api,
        cors_origins: if cli.cors_origins.is_empty() {
            base.cors_origins
        } else {
            cli.cors_origins
        },
        log_level: cli.log_level.unwrap_or(base.log_level),
        log_format,
        ..base
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    let base = match cli.config.take() {
        Some(path) => IndexerConfig::from_toml_file(&path.to_string_lossy())
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => IndexerConfig::default(),
    };
    let config = merge(cli, base)?;

    init_logging(config.log_format, &config.log_level)?;
    config.validate().context("invalid configuration")?;
    let program_id = config.program_address()?;

    tracing::info!(
        program = %program_id,
        rpc = %config.rpc_http_url,
        ws = %config.ws_url(),
        "starting votesync"
    );

    let ledger = Arc::new(RpcLedgerClient::new(RpcConfig::new(
        config.rpc_http_url.clone(),
        config.ws_url(),
    ))?);
    let version = ledger
        .get_version()
        .await
        .with_context(|| format!("ledger node {} is unreachable", config.rpc_http_url))?;
    tracing::info!(version = %version, "connected to ledger node");

    let env = LmdbEnvironment::open(&config.data_dir, DATABASE_COUNT, config.map_size)
        .with_context(|| format!("failed to open store at {}", config.data_dir.display()))?;
    let stores = Stores {
        polls: Arc::new(env.poll_store()),
        candidates: Arc::new(env.candidate_store()),
        votes: Arc::new(env.vote_store()),
    };
    let metrics = Arc::new(SyncMetrics::new());

    let mut synchronizer = Synchronizer::new(
        ledger,
        stores.clone(),
        program_id,
        config.ingest_capacity,
        metrics.clone(),
    );
    let report = synchronizer.start().await.context("startup failed")?;
    tracing::info!(
        polls = report.polls,
        candidates = report.candidates,
        "mirror is live"
    );

    let shutdown = ShutdownController::new();
    let api_handle = if config.enable_api {
        let server = ApiServer::new(
            config.api_port,
            Arc::new(ApiState {
                stores,
                metrics,
                clock: Arc::new(SystemClock),
            }),
            config.cors_origins.clone(),
        );
        let stop = shutdown.signalled();
        Some(tokio::spawn(async move {
            if let Err(e) = server.start(stop).await {
                tracing::error!(error = %e, "read API failed");
            }
        }))
    } else {
        tracing::info!("read API disabled");
        None
    };

    let reason = shutdown.wait_for_signal().await;

    tracing::info!(%reason, "stopping synchronizer");
    synchronizer.stop().await;
    if let Some(handle) = api_handle {
        let _ = handle.await;
    }
    if let Err(e) = env.sync() {
        tracing::warn!("LMDB force_sync failed: {e}");
    }

    tracing::info!("votesync exited cleanly");
    Ok(())
}
