mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

// Use mimalloc to prevent memory bloat (glibc malloc doesn't release memory with high concurrency)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use citysearch_core::config::AppConfig;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Custom Tokio runtime: a worker process spends most of its time
    // blocked on I/O (fetch, headless Chrome, Postgres), so a higher
    // blocking-thread ceiling than the default matters more than worker count.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(16)
        .thread_stack_size(8 * 1024 * 1024)
        .max_blocking_threads(256)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let config: AppConfig = toml::from_str(&config_str)?;

    // Operators can point a worker at a different master without editing
    // the config file (narrower than the teacher's SCALE_LEVEL env sprawl,
    // since this system has one network (HTTP) rather than five overlay
    // networks to tune per-instance).
    let master_url_override = std::env::var("CITYSEARCH_MASTER_URL").ok();

    match cli.command {
        Commands::Master => {
            commands::master::run(config).await?;
        }
        Commands::Worker { master_url, limit } => {
            let master_url = master_url_override.unwrap_or(master_url);
            commands::worker::run(config, master_url, limit).await?;
        }
        Commands::Bootstrap { seeds } => {
            commands::bootstrap::run(config, seeds).await?;
        }
        Commands::BuildLinkGraph => {
            commands::build_link_graph::run(config).await?;
        }
        Commands::UpdatePagerank => {
            commands::update_pagerank::run(config).await?;
        }
        Commands::BuildIndex => {
            commands::build_index::run(config).await?;
        }
        Commands::BuildVectorspace => {
            commands::build_vectorspace::run(config).await?;
        }
        Commands::UpdateRelevance => {
            commands::update_relevance::run(config).await?;
        }
        Commands::ServeSearch => {
            commands::serve_search::run(config).await?;
        }
        Commands::Status => {
            commands::status::run(config).await?;
        }
    }

    Ok(())
}
