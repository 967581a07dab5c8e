use anyhow::Result;
use citysearch_core::config::AppConfig;
use citysearch_core::tokenize::TokenizeOptions;
use citysearch_linkgraph::{pagerank, HostGraph};
use citysearch_storage::Storage;
use citysearch_urlscore::{priority_from_config, RuleBasedUrlClassifier, ScoredUrl};
use tracing::info;
use url::Url;

use crate::commands::link_graph_path;

/// Recomputes PageRank over the persisted link graph, writes the updated
/// scores back onto `servers.page_rank`, then feeds the new host importance
/// into every unfinished job's priority (spec §4.8 steps 2-3).
pub async fn run(config: AppConfig) -> Result<()> {
    let path = link_graph_path(&config.general);
    let bytes = std::fs::read(&path)
        .map_err(|e| anyhow::anyhow!("failed to read link graph at {}: {e}", path.display()))?;
    let graph = HostGraph::from_bytes(&bytes)?;

    let personalization = if config.ranking.pagerank_personalization.is_empty() {
        None
    } else {
        Some(&config.ranking.pagerank_personalization)
    };
    let ranks = pagerank(
        &graph,
        config.ranking.pagerank_damping,
        config.ranking.pagerank_max_iterations,
        personalization,
    );

    let storage = Storage::new(&config.database.postgres_url).await?;
    storage.update_page_ranks(&ranks).await?;

    // Recompute each unfinished job's priority from scratch rather than
    // adding the new importance on top of the old one, which would double
    // count whatever importance was already baked in at ingest time.
    let opts = TokenizeOptions {
        long_word_threshold: config.relevance.long_word_threshold,
        topic_canonical: config.relevance.topic_canonical_spelling.clone(),
        topic_variants: config.relevance.topic_writing_styles.clone(),
    };
    let classifier = RuleBasedUrlClassifier;
    let updated = storage
        .recompute_unfinished_priorities(|job, server| {
            let Ok(url) = Url::parse(&job.url) else {
                return job.priority;
            };
            let scored = ScoredUrl::new(
                url,
                job.anchor_text.clone().unwrap_or_default(),
                job.surrounding_text.clone().unwrap_or_default(),
                job.title_text.clone().unwrap_or_default(),
            );
            let url_priority =
                priority_from_config(&scored, &opts, &classifier, &config.relevance, &config.urlscore);
            url_priority + citysearch_registry::importance(server, &config.registry)
        })
        .await?;

    info!(hosts = ranks.len(), jobs_updated = updated, "pagerank updated");
    Ok(())
}
