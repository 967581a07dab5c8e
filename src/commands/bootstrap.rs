use anyhow::Result;
use citysearch_core::config::AppConfig;
use citysearch_storage::Storage;
use tracing::{info, warn};

/// Loads a seed list as jobs (spec §2's `bootstrap` subcommand). `seeds` is
/// either a comma-separated list of URLs or a path to a file with one URL
/// per line; each seed is normalized, assigned to its host, and inserted
/// with the seed-list priority bonus already baked in by `urlscore`'s
/// seed-pattern match so it is reserved ahead of anything harvested later.
pub async fn run(config: AppConfig, seeds: String) -> Result<()> {
    let storage = Storage::new(&config.database.postgres_url).await?;
    storage.run_migrations().await?;

    let raw_seeds: Vec<String> = if std::path::Path::new(&seeds).is_file() {
        std::fs::read_to_string(&seeds)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        seeds.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    };

    let mut inserted = 0;
    for raw in raw_seeds {
        let url = match citysearch_urlscore::normalize(&raw, None) {
            Ok(u) => u,
            Err(e) => {
                warn!(seed = %raw, error = %e, "skipping malformed seed");
                continue;
            }
        };
        let host = citysearch_urlscore::server_name(&url);
        let host_ids = storage.upsert_servers(&[host.clone()]).await?;
        let server_id = host_ids.get(&host).copied();
        storage.insert_seed_job(url.as_str(), server_id, config.urlscore.seed_list_hit).await?;
        inserted += 1;
    }

    info!(inserted, "seed jobs loaded");
    Ok(())
}
