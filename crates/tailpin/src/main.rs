//! tailpin command line entry point.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use tailpin::config::{DEFAULT_RECV_BUFFER_BYTES, DEFAULT_REQUEST_TIMEOUT_MS};
use tailpin::{
    fetch_latest_offsets, parse_broker_list, publish_offsets, resolve_leaders, RunConfig,
    RunReport,
};
use tailpin_zk::{ZkClient, ZkConfig};

#[derive(Parser)]
#[command(name = "tailpin")]
#[command(version, about = "Capture the latest Kafka offsets for a consumer group", long_about = None)]
struct Cli {
    /// Comma-separated seed brokers (host:port,host:port)
    #[arg(short, long, default_value = "")]
    brokers: String,

    /// Topic to capture; repeat the flag for multiple topics
    #[arg(short, long = "topic", required = true)]
    topics: Vec<String>,

    /// Consumer group whose offsets are written
    #[arg(short, long)]
    group: String,

    /// ZooKeeper connect string (host:port,host:port)
    #[arg(short, long, default_value = "")]
    zookeeper: String,

    /// Broker request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Read buffer capacity per broker connection in bytes
    #[arg(long, default_value_t = DEFAULT_RECV_BUFFER_BYTES)]
    recv_buffer_bytes: usize,

    /// Resolve and fetch, but do not write anything to ZooKeeper
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Plain,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "tailpin=info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut cli = Cli::parse();

    // Flags win; the environment fills in what was left at its default.
    if cli.brokers.is_empty() {
        if let Ok(brokers) = std::env::var("TAILPIN_BROKERS") {
            cli.brokers = brokers;
        }
    }
    if cli.zookeeper.is_empty() {
        cli.zookeeper = std::env::var("TAILPIN_ZOOKEEPER")
            .unwrap_or_else(|_| "127.0.0.1:2181".to_string());
    }

    let brokers = parse_broker_list(&cli.brokers).context("parsing --brokers")?;
    if brokers.is_empty() {
        warn!("No seed brokers configured, nothing to resolve");
    }

    let config = RunConfig {
        request_timeout: Duration::from_millis(cli.timeout_ms),
        recv_buffer_bytes: cli.recv_buffer_bytes,
        ..RunConfig::default()
    };

    info!(
        brokers = brokers.len(),
        topics = ?cli.topics,
        group = %cli.group,
        "Starting offset capture"
    );

    let leaders = resolve_leaders(&config, &brokers, &cli.topics).await;
    if leaders.is_empty() {
        warn!("No partition leaders resolved");
    }

    // The group id doubles as the client id on offset connections, so
    // broker request logs show who asked.
    let offsets = fetch_latest_offsets(&config, &leaders, &cli.group).await;

    let report = RunReport::assemble(&cli.group, &leaders, &offsets);
    match cli.output {
        OutputFormat::Plain => report.print_plain(),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if cli.dry_run {
        info!("Dry run, skipping ZooKeeper publication");
        return Ok(());
    }
    if offsets.values().all(|outcome| outcome.is_err()) {
        info!("No offsets fetched, skipping ZooKeeper publication");
        return Ok(());
    }

    let zk_config =
        ZkConfig::from_connect_string(&cli.zookeeper).context("parsing --zookeeper")?;
    match ZkClient::connect(&zk_config).await {
        Ok(mut client) => {
            let summary = publish_offsets(&mut client, &cli.group, &offsets).await;
            if let Err(e) = client.close().await {
                warn!("ZooKeeper session close failed: {e}");
            }
            info!(written = summary.written, "Offset capture finished");
        }
        Err(e) => {
            error!("ZooKeeper connection failed, no offsets were recorded: {e}");
        }
    }

    Ok(())
}
