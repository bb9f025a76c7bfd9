//! Dexgate Stream Gateway Smoke Test CLI
//!
//! Commands:
//! - `market`: Subscribe to public market streams and collect events
//! - `user`: Subscribe to a wallet's user stream and collect events
//!
//! # Usage
//! ```bash
//! # Depth + trades for two symbols on Arbitrum
//! dg_smoke market --chain-id 42161 --symbol ethusdc --symbol btcusdc \
//!     --stream depth --stream trade --out data/market_raw.jsonl --limit 500
//!
//! # User stream for one wallet
//! dg_smoke user --chain-id 42161 --address 0xabc...def --limit 200
//!
//! # Against a local gateway
//! dg_smoke market --chain-id 1 --gateway-base ws://127.0.0.1:9944 --symbol ethusdc
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{info, warn};
use url::Url;

use dexgate_adapter::{
    ChainId, GatewayEndpoints, GatewayEvent, MarketStream, MessageStats, Phase, StreamType,
    UserStream, WalletAddress,
};

#[derive(Parser)]
#[command(name = "dg_smoke")]
#[command(about = "Dexgate stream gateway smoke test CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Override the per-chain gateway base URL (staging / local gateway)
    #[arg(long, global = true)]
    gateway_base: Option<Url>,
}

#[derive(Subcommand)]
enum Commands {
    /// Subscribe to public market streams and collect events
    Market {
        /// Chain id the gateway serves
        #[arg(long, default_value = "1")]
        chain_id: u64,

        /// Symbol(s) to subscribe to. Can specify multiple times.
        #[arg(long, required = true)]
        symbol: Vec<String>,

        /// Stream kind(s): depth, trade, miniTicker, kline_<interval>
        #[arg(long, default_value = "depth")]
        stream: Vec<String>,

        /// Output file path for raw JSONL (default: timestamped name)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Maximum events to collect (0 = unlimited until Ctrl+C)
        #[arg(long, default_value = "500")]
        limit: u64,
    },

    /// Subscribe to a wallet's user stream and collect events
    User {
        /// Chain id the gateway serves
        #[arg(long, default_value = "1")]
        chain_id: u64,

        /// Wallet address (0x-prefixed)
        #[arg(long)]
        address: String,

        /// Output file path for raw JSONL (default: timestamped name)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Maximum events to collect (0 = unlimited until Ctrl+C)
        #[arg(long, default_value = "200")]
        limit: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();

    let endpoints = match &cli.gateway_base {
        Some(base) => GatewayEndpoints::with_base(base.clone()),
        None => GatewayEndpoints::new(),
    };

    // Setup Ctrl+C handler
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, shutting down...");
        shutdown_clone.store(true, Ordering::Relaxed);
    });

    match cli.command {
        Commands::Market { chain_id, symbol, stream, out, limit } => {
            run_market_smoke(endpoints, chain_id, symbol, stream, out, limit, shutdown).await
        }
        Commands::User { chain_id, address, out, limit } => {
            run_user_smoke(endpoints, chain_id, address, out, limit, shutdown).await
        }
    }
}

fn parse_stream_type(spec: &str) -> Result<StreamType> {
    match spec {
        "depth" => Ok(StreamType::Depth),
        "trade" => Ok(StreamType::Trade),
        "miniTicker" => Ok(StreamType::MiniTicker),
        other => match other.strip_prefix("kline_") {
            Some(interval) if !interval.is_empty() => {
                Ok(StreamType::Kline(interval.to_string()))
            }
            _ => anyhow::bail!(
                "unknown stream kind '{other}' (expected depth, trade, miniTicker, kline_<interval>)"
            ),
        },
    }
}

/// Generate timestamped output filename
fn generate_output_filename(prefix: &str) -> PathBuf {
    PathBuf::from(format!("{}_{}.jsonl", prefix, Utc::now().format("%Y%m%d_%H%M%S")))
}

#[allow(clippy::too_many_arguments)]
async fn run_market_smoke(
    endpoints: GatewayEndpoints,
    chain_id: u64,
    symbols: Vec<String>,
    stream_specs: Vec<String>,
    out: Option<PathBuf>,
    limit: u64,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let out = out.unwrap_or_else(|| generate_output_filename("ws_market"));
    let stream_types =
        stream_specs.iter().map(|s| parse_stream_type(s)).collect::<Result<Vec<_>>>()?;

    let market = MarketStream::with_endpoints(&endpoints, ChainId(chain_id))?;

    info!("=== Market Stream Smoke Test ===");
    info!("Endpoint: {}", market.client().url());
    info!("Symbols: {:?}", symbols);
    info!("Streams: {:?}", stream_specs);
    info!("Output: {}", out.display());
    info!("Limit: {} (0 = unlimited)", limit);
    info!("Press Ctrl+C to stop");

    for symbol in &symbols {
        for stream_type in &stream_types {
            match stream_type {
                StreamType::Depth => market.subscribe_depth(symbol),
                StreamType::Trade => market.subscribe_trades(symbol),
                StreamType::Kline(interval) => market.subscribe_kline(symbol, interval),
                StreamType::MiniTicker => market.subscribe_mini_ticker(symbol),
            };
        }
    }
    market.connect();

    let stats = collect_events(market.client(), &out, limit, shutdown).await?;
    market.disconnect();

    print_summary(&stats, &out);
    Ok(())
}

async fn run_user_smoke(
    endpoints: GatewayEndpoints,
    chain_id: u64,
    address: String,
    out: Option<PathBuf>,
    limit: u64,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let out = out.unwrap_or_else(|| generate_output_filename("ws_user"));
    let wallet = WalletAddress::parse(&address)
        .with_context(|| format!("invalid wallet address: {address}"))?;

    let user = UserStream::with_endpoints(&endpoints, ChainId(chain_id), wallet)?;

    info!("=== User Stream Smoke Test ===");
    info!("Endpoint: {}", user.client().url());
    info!("Wallet: {}", user.wallet());
    info!("Output: {}", out.display());
    info!("Limit: {} (0 = unlimited)", limit);
    info!("Press Ctrl+C to stop");

    user.connect();

    let stats = collect_events(user.client(), &out, limit, shutdown).await?;
    user.disconnect();

    print_summary(&stats, &out);
    Ok(())
}

/// Drain events into a JSONL file until the limit, Ctrl+C, or a permanent
/// give-up by the client.
async fn collect_events(
    client: &dexgate_adapter::StreamClient,
    out: &PathBuf,
    limit: u64,
    shutdown: Arc<AtomicBool>,
) -> Result<MessageStats> {
    // Ensure output directory exists
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let mut file =
        tokio::fs::File::create(out).await.with_context(|| format!("creating {}", out.display()))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<GatewayEvent>();
    let handler = client.add_handler(move |event| {
        let _ = tx.send(event.clone());
    });

    let mut stats = MessageStats::new();
    let mut collected: u64 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        if limit > 0 && collected >= limit {
            info!("Reached event limit: {}", limit);
            break;
        }
        if client.phase() == Phase::GivenUp {
            warn!("Client gave up reconnecting; stopping collection");
            break;
        }

        match tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
            Ok(Some(event)) => {
                let line = serde_json::to_string(&event)?;
                file.write_all(line.as_bytes()).await?;
                file.write_all(b"\n").await?;

                stats.record(&event);
                collected += 1;

                if collected % 100 == 0 {
                    info!("Collected {} events, {} unknown", collected, stats.unknown_type_count);
                }
            }
            Ok(None) => break,
            // Timeout: loop back around to re-check shutdown and phase
            Err(_) => {}
        }
    }

    client.remove_handler(handler);
    file.flush().await?;
    Ok(stats)
}

fn print_summary(stats: &MessageStats, out: &PathBuf) {
    info!("");
    info!("=== Summary ===");
    info!("Total events: {}", stats.total_events);
    info!("Parsed OK: {}", stats.parsed_ok);
    info!("Unknown type count: {}", stats.unknown_type_count);
    info!("Last event type: {:?}", stats.last_event_type);
    info!("");
    info!("Event type distribution:");
    let mut types: Vec<_> = stats.type_counts.iter().collect();
    types.sort_by(|a, b| b.1.cmp(a.1));
    for (event_type, count) in types {
        info!("  {}: {}", event_type, count);
    }
    info!("");
    info!("Output written to: {}", out.display());
}
