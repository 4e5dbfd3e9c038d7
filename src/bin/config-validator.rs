//! # Speechflow Configuration Validator
//!
//! Command-line tool for validating Speechflow configuration across environments.
//! Loads the layered configuration, validates it and assembles the default
//! strategy chain so problems surface before the worker starts.

use clap::{Parser, Subcommand};
use serde_json::Value;
use speechflow_core::config::{ConfigManager, SpeechflowConfig};
use speechflow_core::strategies::{default_chain, Collaborators};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

const COMPONENTS: &[&str] = &[
    "logging",
    "queue",
    "worker",
    "orchestrator",
    "validation",
    "synthesis",
    "voices",
    "transcription",
    "post_processing",
    "word_processing",
    "upload",
    "storage",
];

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate Speechflow configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate (development, test, production, ...)
    #[arg(short, long, default_value = "development", env = "SPEECHFLOW_ENV")]
    environment: String,

    /// Configuration directory path (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the configuration and the default strategy chain
    All,

    /// Print one configuration section as JSON
    Component {
        /// Section name (queue, worker, synthesis, ...)
        name: String,
    },

    /// List environments that have an override file
    Environments,

    /// Compare the resolved configuration of two environments
    Compare {
        /// Base environment for comparison
        #[arg(short, long, default_value = "development")]
        base: String,

        /// Target environment for comparison
        #[arg(short, long)]
        target: String,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all_config(&cli),
        Some(Commands::Component { name }) => show_component(&cli, name),
        Some(Commands::Environments) => list_environments(&cli),
        Some(Commands::Compare { base, target }) => compare_configs(&cli, base, target),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            eprintln!("❌ {e}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli, environment: &str) -> Result<Arc<ConfigManager>, Box<dyn std::error::Error>> {
    Ok(ConfigManager::load_from_directory_with_env(
        cli.config_dir.clone(),
        environment,
    )?)
}

fn validate_all_config(cli: &Cli) -> CliResult {
    println!("🔧 Validating Speechflow Configuration");
    println!("Environment: {}", cli.environment);
    if let Some(config_dir) = &cli.config_dir {
        println!("Config Directory: {}", config_dir.display());
    }
    println!();

    let manager = load(cli, &cli.environment)?;
    let config = manager.config();
    println!("✅ Configuration loaded and validated");

    print_summary(config);

    let collaborators = Collaborators::local(config)?;
    let chain = default_chain(config, &collaborators)?;
    println!("\n🧩 Strategy chain ({} strategies):", chain.len());
    for descriptor in chain.list_strategies() {
        println!("   {:>4}  {}", descriptor.order, descriptor.name);
    }

    println!("\n🎉 All configuration validation checks passed!");
    Ok(())
}

fn print_summary(config: &SpeechflowConfig) {
    let capacity = match config.queue.max_size {
        0 => "unbounded".to_string(),
        size => size.to_string(),
    };
    println!("📬 Queue: capacity {}, max retries {}", capacity, config.queue.max_retries);
    println!(
        "👷 Worker: {} processors, drain timeout {}s",
        config.worker.concurrent_processors, config.worker.drain_timeout_seconds
    );
    println!(
        "🎙️ Synthesis: chunk length {}, timeout {}s, output {}",
        config.synthesis.max_chunk_length,
        config.synthesis.generation_timeout_seconds,
        config.synthesis.output_directory.display()
    );
    println!(
        "🎧 Transcription: {}",
        if config.transcription.enabled { "enabled" } else { "disabled" }
    );
    println!(
        "📤 Upload: {}",
        if config.upload.enabled { "enabled" } else { "disabled" }
    );
    if let Some(url) = &config.post_processing.webhook_url {
        println!("🔔 Webhook: {url}");
    }
}

fn show_component(cli: &Cli, component_name: &str) -> CliResult {
    let manager = load(cli, &cli.environment)?;
    let section = section(manager.config(), component_name)?;
    println!("🔧 Component: {component_name}");
    println!("{}", serde_json::to_string_pretty(&section)?);
    Ok(())
}

fn section(config: &SpeechflowConfig, name: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let tree = serde_json::to_value(config)?;
    tree.get(name).cloned().ok_or_else(|| {
        format!(
            "Unknown component '{name}'. Available: {}",
            COMPONENTS.join(", ")
        )
        .into()
    })
}

fn list_environments(cli: &Cli) -> CliResult {
    let directory = cli
        .config_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("config"));
    println!("📋 Available Environments in {}:", directory.display());

    let mut environments: Vec<String> = std::fs::read_dir(&directory)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            name.strip_prefix("speechflow.")
                .and_then(|rest| rest.strip_suffix(".toml"))
                .map(str::to_string)
        })
        .collect();
    environments.sort();

    if environments.is_empty() {
        println!("  (no environment overrides, defaults only)");
    }
    for environment in environments {
        println!("  • {environment}");
    }
    Ok(())
}

fn compare_configs(cli: &Cli, base: &str, target: &str) -> CliResult {
    println!("🔍 Comparing Configurations: {base} vs {target}");

    let base_tree = serde_json::to_value(load(cli, base)?.config())?;
    let target_tree = serde_json::to_value(load(cli, target)?.config())?;

    let mut differences = Vec::new();
    diff_values("", &base_tree, &target_tree, &mut differences);

    if differences.is_empty() {
        println!("✅ No differences");
    }
    for (path, left, right) in differences {
        println!("  {path}: {left} -> {right}");
    }
    Ok(())
}

fn diff_values(path: &str, left: &Value, right: &Value, out: &mut Vec<(String, Value, Value)>) {
    match (left, right) {
        (Value::Object(left_map), Value::Object(right_map)) => {
            for (key, left_value) in left_map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                let right_value = right_map.get(key).unwrap_or(&Value::Null);
                diff_values(&child, left_value, right_value, out);
            }
        }
        _ if left != right => out.push((path.to_string(), left.clone(), right.clone())),
        _ => {}
    }
}
