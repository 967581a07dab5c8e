use anyhow::Result;
use citysearch_core::config::AppConfig;
use citysearch_linkgraph::HostGraph;
use citysearch_storage::Storage;
use tracing::info;

use crate::commands::link_graph_path;

/// Builds the directed host link graph from cross-host edges harvested out
/// of every relevant document (spec §4.8 step 1) and persists it under the
/// configured data directory.
pub async fn run(config: AppConfig) -> Result<()> {
    let storage = Storage::new(&config.database.postgres_url).await?;
    let edges = storage.host_link_edges().await?;
    let graph = HostGraph::from_edges(edges);

    let path = link_graph_path(&config.general);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, graph.to_bytes()?)?;

    info!(hosts = graph.node_count(), path = %path.display(), "link graph built");
    Ok(())
}
