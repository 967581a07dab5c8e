use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use citysearch_core::config::AppConfig;
use citysearch_worker::{run_worker, MasterClient, WorkerOptions};

pub async fn run(config: AppConfig, master_url: String, limit: Option<usize>) -> Result<()> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch.timeout_seconds))
        .build()?;
    let master = Arc::new(MasterClient::new(http, master_url, config.master.password.clone()));
    run_worker(Arc::new(config), master, WorkerOptions { max_documents: limit }).await?;
    Ok(())
}
