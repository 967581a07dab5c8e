use anyhow::Result;
use citysearch_core::config::AppConfig;
use citysearch_invindex::InvertedIndex;
use citysearch_storage::Storage;
use tracing::info;

use crate::commands::index_path;

/// Builds the per-field inverted index over every relevant document
/// (spec §4.9) and persists it under the configured data directory.
pub async fn run(config: AppConfig) -> Result<()> {
    let storage = Storage::new(&config.database.postgres_url).await?;
    let documents = storage.stream_relevant_documents().await?;
    let index = InvertedIndex::build(&documents);

    let path = index_path(&config.general);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, index.to_bytes()?)?;

    info!(documents = index.document_count(), path = %path.display(), "inverted index built");
    Ok(())
}
