//! Teleassist - Telegram assistant backed by Gemini, SerpAPI and MongoDB

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use teleassist::{
    config::{default_config_path, AppConfig, StorageBackend},
    gateway::{api, GatewayBuilder},
    store::MongoStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "teleassist")]
#[command(version)]
#[command(about = "Telegram assistant backed by Gemini, SerpAPI and MongoDB")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TELEASSIST_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot
    Run {
        /// Keep history in memory instead of MongoDB
        #[arg(long)]
        memory_store: bool,

        /// Serve /health and /status
        #[arg(long)]
        health: bool,
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
        .unwrap_or_else(|_| format!("teleassist={},tower_http=info", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            memory_store,
            health,
        } => {
            run_bot(config, memory_store, health).await?;
        }
        Commands::Doctor => {
            run_doctor(&config).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_bot(mut config: AppConfig, memory_store: bool, health: bool) -> Result<()> {
    if memory_store {
        config.storage.backend = StorageBackend::Memory;
    }
    if health {
        config.health.enabled = true;
    }
    config.validate()?;

    let health_addr = config
        .health
        .enabled
        .then(|| (config.health.host.clone(), config.health.port));

    let gateway = Arc::new(GatewayBuilder::new(config).build().await?);
    gateway.start().await?;

    let health_task = health_addr.map(|(host, port)| {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            if let Err(e) = api::serve(gateway, &host, port).await {
                tracing::error!("{}", e);
            }
        })
    });

    tracing::info!("Teleassist is running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    if let Some(task) = health_task {
        task.abort();
    }
    gateway.stop().await?;

    Ok(())
}

async fn run_doctor(config: &AppConfig) -> Result<()> {
    println!("🔍 Teleassist Doctor");
    println!();

    println!("Checking configuration...");
    match default_config_path() {
        Some(path) if path.exists() => {
            println!("  ✓ Configuration file found: {}", path.display())
        }
        _ => println!("  ℹ No configuration file found (using defaults)"),
    }

    let secrets = [
        ("TELEGRAM_TOKEN", config.telegram.bot_token.is_empty()),
        ("GEMINI_API_KEY", config.ai.api_key.is_empty()),
        ("SERPAPI_KEY", config.search.api_key.is_empty()),
    ];
    for (name, missing) in secrets {
        if missing {
            println!("  ✗ {} not set", name);
        } else {
            println!("  ✓ {} set", name);
        }
    }

    println!();
    println!("Checking storage...");
    match config.storage.backend {
        StorageBackend::Memory => println!("  ℹ In-memory storage (history is not kept)"),
        StorageBackend::Mongodb if config.storage.uri.is_empty() => {
            println!("  ✗ MONGODB_URI not set")
        }
        StorageBackend::Mongodb => match MongoStore::connect(&config.storage).await {
            Ok(_) => println!("  ✓ MongoDB reachable ({})", config.storage.database),
            Err(e) => println!("  ✗ MongoDB unreachable: {}", e),
        },
    }

    println!();
    println!("Doctor check complete!");

    Ok(())
}

fn show_config(config: Option<&AppConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default().redacted();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
