//! # Speechflow Worker
//!
//! Runs the message consumer worker with the default speech chain and the
//! local collaborators, fed by an in-memory broker.
//!
//! ## Usage
//!
//! ```bash
//! # Process a JSON-lines file of broker messages, exit once everything settled
//! speechflow-worker --input messages.jsonl --exit-when-idle
//!
//! # Run until Ctrl+C with a specific environment
//! SPEECHFLOW_ENV=production speechflow-worker --input messages.jsonl
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use speechflow_core::config::ConfigManager;
use speechflow_core::logging;
use speechflow_core::messaging::InMemoryBroker;
use speechflow_core::queue::ProcessingQueue;
use speechflow_core::strategies::{default_chain, Collaborators};
use speechflow_core::worker::{MessageConsumerWorker, ShutdownReport};

const IDLE_CHECK_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "speechflow-worker")]
#[command(about = "Consume speech requests and run them through the strategy chain")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Environment to load (development, test, production, ...)
    #[arg(short, long, env = "SPEECHFLOW_ENV")]
    environment: Option<String>,

    /// Configuration directory path (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// JSON-lines file of broker messages to publish at startup
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Shut down once every published message has settled
    #[arg(long)]
    exit_when_idle: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment)
        .context("Failed to load configuration")?;
    let config = manager.config();
    logging::init_with_config(&config.logging);

    info!("🚀 Starting Speechflow Worker");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));
    info!("   Environment: {}", manager.environment());

    let collaborators =
        Collaborators::local(config).context("Failed to build local collaborators")?;
    let orchestrator = Arc::new(
        default_chain(config, &collaborators).context("Failed to assemble strategy chain")?,
    );
    let queue = Arc::new(ProcessingQueue::from_config(&config.queue));
    let broker = Arc::new(InMemoryBroker::new());

    if let Some(input) = &cli.input {
        let published = publish_file(&broker, input).await?;
        info!(published = published, input = %input.display(), "📨 Input messages published");
    }

    let worker = MessageConsumerWorker::new(
        config.worker.clone(),
        broker.clone(),
        queue,
        orchestrator,
    );

    let report = if cli.exit_when_idle {
        worker.start().await?;
        tokio::select! {
            _ = wait_until_idle(&worker, &broker) => info!("All messages settled"),
            result = signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C");
            }
        }
        worker.shutdown().await?
    } else {
        info!("   Press Ctrl+C to shutdown gracefully");
        worker.run_until_signal().await?
    };

    print_report(&report);
    Ok(())
}

async fn publish_file(broker: &InMemoryBroker, path: &PathBuf) -> Result<usize> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut published = 0;
    for (line_number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match broker.publish_json(line.as_bytes()) {
            Ok(()) => published += 1,
            Err(e) => warn!(line = line_number + 1, error = %e, "Skipping malformed message"),
        }
    }
    Ok(published)
}

async fn wait_until_idle(worker: &MessageConsumerWorker, broker: &InMemoryBroker) {
    loop {
        tokio::time::sleep(IDLE_CHECK_INTERVAL).await;
        let received = worker.stats().counters.received;
        if received >= broker.published_count() && worker.queue().is_empty() && worker.in_flight() == 0 {
            return;
        }
    }
}

fn print_report(report: &ShutdownReport) {
    let counters = &report.stats.counters;
    println!("📊 Received:  {}", counters.received);
    println!("✅ Processed: {}", counters.processed);
    println!("❌ Failed:    {}", counters.failed);
    println!("🔄 Requeued:  {}", counters.requeued);
    println!("   Success rate: {:.1}%", report.stats.success_rate);
    if !report.drained {
        println!(
            "⚠️  Not drained: {} queued, {} abandoned in flight",
            report.remaining_in_queue, report.abandoned_in_flight
        );
    }
}
