use std::collections::VecDeque;
use std::sync::Arc;

use citysearch_core::config::{RegistryConfig, RelevanceConfig};
use citysearch_core::{Job, SearchError};
use citysearch_frontier::Frontier;
use citysearch_storage::Storage;
use tokio::sync::Mutex;

/// Shared master state: the durable store, the frontier it reserves
/// through, and a small in-process buffer so most `reserve_jobs` calls are
/// answered without a round trip to Postgres (spec §4.6 "buffered
/// reserve").
pub struct MasterState {
    pub storage: Storage,
    pub frontier: Arc<dyn Frontier>,
    pub registry: RegistryConfig,
    pub relevance: RelevanceConfig,
    pub password: String,
    pub max_job_request: usize,
    reserve_buffer_size: usize,
    buffer: Mutex<VecDeque<Job>>,
}

impl MasterState {
    pub fn new(
        storage: Storage,
        frontier: Arc<dyn Frontier>,
        registry: RegistryConfig,
        relevance: RelevanceConfig,
        password: String,
        max_job_request: usize,
        reserve_buffer_size: usize,
    ) -> Self {
        Self {
            storage,
            frontier,
            registry,
            relevance,
            password,
            max_job_request,
            reserve_buffer_size,
            buffer: Mutex::new(VecDeque::new()),
        }
    }

    pub fn check_password(&self, pw: Option<&str>) -> bool {
        pw.is_some_and(|p| p == self.password)
    }

    /// Pop up to `n` (capped at `max_job_request`) jobs from the buffer,
    /// refilling from the frontier first if the buffer is running low.
    pub async fn reserve(&self, n: usize) -> Result<Vec<Job>, SearchError> {
        let n = n.min(self.max_job_request);
        let mut buffer = self.buffer.lock().await;
        if buffer.len() < n {
            let fresh = self.frontier.reserve(self.reserve_buffer_size).await?;
            buffer.extend(fresh);
        }
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            match buffer.pop_front() {
                Some(job) => out.push(job),
                None => break,
            }
        }
        Ok(out)
    }

    /// All jobs still sitting in the in-process buffer, unreserved as a
    /// batch — called on graceful shutdown so a restarted master doesn't
    /// leak `being_crawled` jobs nobody is actually working on.
    pub async fn drain_buffer_and_unreserve(&self) -> Result<(), SearchError> {
        let mut buffer = self.buffer.lock().await;
        let ids: Vec<i64> = buffer.iter().map(|j| j.id).collect();
        buffer.clear();
        drop(buffer);
        self.frontier.unreserve(&ids).await
    }
}
