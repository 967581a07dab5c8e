use anyhow::Result;
use citysearch_core::config::AppConfig;
use citysearch_storage::Storage;
use tracing::info;
use url::Url;

/// Offline re-classification sweep (ambient feature grounded in
/// `original_source/crawler/update_relevance.py`): re-runs document
/// relevance classification over every stored document, for use after a
/// `[relevance]` config change (new topic spelling variants, a tuned
/// threshold) without re-crawling anything.
pub async fn run(config: AppConfig) -> Result<()> {
    let storage = Storage::new(&config.database.postgres_url).await?;
    let documents = storage.all_documents().await?;

    let mut flipped = 0;
    for doc in &documents {
        let Ok(url) = Url::parse(&doc.url) else { continue };
        let relevant = citysearch_classify::is_document_relevant(&url, doc, &config.relevance);
        if relevant != doc.relevant {
            storage.update_relevant_flag(doc.id, relevant).await?;
            flipped += 1;
        }
    }

    info!(checked = documents.len(), flipped, "relevance sweep complete");
    Ok(())
}
