use std::sync::Arc;

use anyhow::Result;
use citysearch_core::config::AppConfig;
use citysearch_core::tokenize::TokenizeOptions;
use citysearch_invindex::InvertedIndex;
use citysearch_ranker::SearchState;
use citysearch_storage::Storage;
use citysearch_vectorspace::VectorSpaceModel;
use tokio::net::TcpListener;
use tracing::info;

use crate::commands::{index_path, vectorspace_path};

/// Runs the query HTTP API (spec §4.11/§6), loading the offline-built
/// inverted index and vector space model from disk at startup.
pub async fn run(config: AppConfig) -> Result<()> {
    let storage = Storage::new(&config.database.postgres_url).await?;

    let index_bytes = std::fs::read(index_path(&config.general))
        .map_err(|e| anyhow::anyhow!("failed to read inverted index: {e}"))?;
    let index = InvertedIndex::from_bytes(&index_bytes)?;

    let vectorspace_bytes = std::fs::read(vectorspace_path(&config.general))
        .map_err(|e| anyhow::anyhow!("failed to read vector space model: {e}"))?;
    let vectorspace = VectorSpaceModel::from_bytes(&vectorspace_bytes)?;

    let state = Arc::new(SearchState {
        storage,
        index,
        vectorspace,
        ranking: config.ranking.clone(),
        tokenize_opts: TokenizeOptions {
            long_word_threshold: config.relevance.long_word_threshold,
            topic_canonical: config.relevance.topic_canonical_spelling.clone(),
            topic_variants: config.relevance.topic_writing_styles.clone(),
        },
    });

    let app = citysearch_ranker::router(state);
    let addr = format!("{}:{}", config.search.host, config.search.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "search api listening");
    axum::serve(listener, app).await?;
    Ok(())
}
