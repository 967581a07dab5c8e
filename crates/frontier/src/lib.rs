//! Priority queue / frontier (spec §4.5): durable, host-fair selection of
//! the next jobs to crawl.
//!
//! The durable, cross-process serialization this needs (§4.5's "no two
//! concurrent reserve calls return overlapping jobs") is owned by
//! `citysearch-storage`'s transactional `UPDATE ... RETURNING`; this crate
//! owns the policy-agnostic `Frontier` trait and the two pure selection
//! policies (`TopK`, `HostFair`) storage applies to a candidate batch.
//! An in-memory `Frontier` implementation is provided for tests that
//! exercise the reservation invariant without a database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use citysearch_core::config::FrontierPolicy;
use citysearch_core::{Job, SearchError};
use tokio::sync::Mutex;

/// Durable reservation surface the master and offline jobs depend on.
/// `citysearch-storage::PgFrontier` is the production implementation;
/// `InMemoryFrontier` below is the test double.
#[async_trait]
pub trait Frontier: Send + Sync {
    /// Atomically reserve up to `n` jobs per spec §4.5, set
    /// `being_crawled = true`, and return them.
    async fn reserve(&self, n: usize) -> Result<Vec<Job>, SearchError>;

    /// Clear `being_crawled` on the given job ids. Idempotent.
    async fn unreserve(&self, ids: &[i64]) -> Result<(), SearchError>;

    /// `done = true, success = false, being_crawled = false`.
    async fn mark_failed(&self, id: i64) -> Result<(), SearchError>;

    /// `done = true, success = true, being_crawled = false`.
    async fn mark_success(&self, id: i64) -> Result<(), SearchError>;

    /// Clear `being_crawled` on any job reserved longer than
    /// `stale_after_seconds` ago. Returns the number recovered.
    async fn sweep_stale(&self, stale_after_seconds: i64) -> Result<usize, SearchError>;
}

/// Sort all reservable candidates by descending priority (ties keep
/// insertion order, i.e. the order `candidates` already arrives in since
/// storage orders by `id ASC`), then take the first `n`.
pub fn select_top_k(mut candidates: Vec<Job>, n: usize) -> Vec<Job> {
    candidates.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(n);
    candidates
}

/// Take the single highest-priority job per host (candidates are assumed
/// pre-sorted by descending priority, so the first job seen per host wins),
/// then sort those descending by priority and take `n`.
pub fn select_host_fair(candidates: Vec<Job>, n: usize) -> Vec<Job> {
    let mut by_host: HashMap<Option<i64>, Job> = HashMap::new();
    for job in candidates {
        by_host
            .entry(job.server_id)
            .and_modify(|existing| {
                if job.priority > existing.priority {
                    *existing = job.clone();
                }
            })
            .or_insert(job);
    }
    let mut picked: Vec<Job> = by_host.into_values().collect();
    picked.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));
    picked.truncate(n);
    picked
}

/// Apply the configured policy to a pre-sorted (by descending priority)
/// candidate batch.
pub fn select(policy: FrontierPolicy, candidates: Vec<Job>, n: usize) -> Vec<Job> {
    match policy {
        FrontierPolicy::TopK => select_top_k(candidates, n),
        FrontierPolicy::HostFair => select_host_fair(candidates, n),
    }
}

/// In-memory `Frontier` for tests: no persistence, but the same reservation
/// invariant (a single `tokio::sync::Mutex` serializes reserve calls, as
/// spec §4.5 option (b) — a coarse lock — permits).
pub struct InMemoryFrontier {
    jobs: Arc<Mutex<Vec<Job>>>,
    policy: FrontierPolicy,
}

impl InMemoryFrontier {
    pub fn new(jobs: Vec<Job>, policy: FrontierPolicy) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(jobs)),
            policy,
        }
    }

    pub async fn snapshot(&self) -> Vec<Job> {
        self.jobs.lock().await.clone()
    }
}

#[async_trait]
impl Frontier for InMemoryFrontier {
    async fn reserve(&self, n: usize) -> Result<Vec<Job>, SearchError> {
        let mut jobs = self.jobs.lock().await;
        let mut candidates: Vec<Job> = jobs
            .iter()
            .filter(|j| !j.done && !j.being_crawled)
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));
        let picked = select(self.policy, candidates, n);
        let picked_ids: std::collections::HashSet<i64> = picked.iter().map(|j| j.id).collect();
        for job in jobs.iter_mut() {
            if picked_ids.contains(&job.id) {
                job.being_crawled = true;
            }
        }
        Ok(picked)
    }

    async fn unreserve(&self, ids: &[i64]) -> Result<(), SearchError> {
        let mut jobs = self.jobs.lock().await;
        for job in jobs.iter_mut() {
            if ids.contains(&job.id) {
                job.being_crawled = false;
            }
        }
        Ok(())
    }

    async fn mark_failed(&self, id: i64) -> Result<(), SearchError> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            job.done = true;
            job.success = Some(false);
            job.being_crawled = false;
        }
        Ok(())
    }

    async fn mark_success(&self, id: i64) -> Result<(), SearchError> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            job.done = true;
            job.success = Some(true);
            job.being_crawled = false;
        }
        Ok(())
    }

    async fn sweep_stale(&self, _stale_after_seconds: i64) -> Result<usize, SearchError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: i64, server_id: i64, priority: f64) -> Job {
        Job {
            id,
            url: format!("http://host{server_id}.example/{id}"),
            server_id: Some(server_id),
            parent_id: None,
            anchor_text: None,
            anchor_text_tokens: vec![],
            surrounding_text: None,
            surrounding_text_tokens: vec![],
            title_text: None,
            title_text_tokens: vec![],
            priority,
            being_crawled: false,
            done: false,
            success: None,
        }
    }

    #[test]
    fn host_fair_takes_best_per_host_then_sorts() {
        let candidates = vec![job(1, 1, 10.0), job(2, 1, 9.0), job(3, 2, 8.0), job(4, 2, 8.0)];
        let picked = select_host_fair(candidates, 2);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].id, 1);
        assert_eq!(picked[1].server_id, Some(2));
    }

    #[test]
    fn top_k_ignores_host_grouping() {
        let candidates = vec![job(1, 1, 10.0), job(2, 1, 9.0), job(3, 2, 8.0)];
        let picked = select_top_k(candidates, 2);
        assert_eq!(picked.iter().map(|j| j.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn concurrent_reserves_never_overlap() {
        let jobs: Vec<Job> = (1..=20).map(|id| job(id, id % 3, id as f64)).collect();
        let frontier = Arc::new(InMemoryFrontier::new(jobs, FrontierPolicy::TopK));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let f = frontier.clone();
            handles.push(tokio::spawn(async move { f.reserve(4).await.unwrap() }));
        }
        let mut seen = std::collections::HashSet::new();
        for h in handles {
            for job in h.await.unwrap() {
                assert!(seen.insert(job.id), "job {} reserved twice", job.id);
            }
        }
    }

    #[tokio::test]
    async fn unreserve_makes_job_reservable_again() {
        let frontier = InMemoryFrontier::new(vec![job(1, 1, 5.0)], FrontierPolicy::TopK);
        let picked = frontier.reserve(10).await.unwrap();
        assert_eq!(picked.len(), 1);
        assert!(frontier.reserve(10).await.unwrap().is_empty());
        frontier.unreserve(&[1]).await.unwrap();
        assert_eq!(frontier.reserve(10).await.unwrap().len(), 1);
    }
}
