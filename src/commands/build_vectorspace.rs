use anyhow::Result;
use citysearch_core::config::AppConfig;
use citysearch_storage::Storage;
use citysearch_vectorspace::VectorSpaceModel;
use tracing::info;

use crate::commands::vectorspace_path;

/// Fits the per-field TF-IDF vector space over every relevant document and
/// persists both the model and each document's per-field vectors
/// (spec §4.10).
pub async fn run(config: AppConfig) -> Result<()> {
    let storage = Storage::new(&config.database.postgres_url).await?;
    let documents = storage.stream_relevant_documents().await?;
    let (model, rows) = VectorSpaceModel::fit_transform(&documents);

    for row in &rows {
        storage.upsert_tfidf_row(row).await?;
    }

    let path = vectorspace_path(&config.general);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, model.to_bytes()?)?;

    info!(documents = rows.len(), path = %path.display(), "vector space model built");
    Ok(())
}
