use anyhow::Result;
use async_trait::async_trait;
use citysearch_core::config::FrontierPolicy;
use citysearch_core::{Job, SearchError, Server};
use citysearch_frontier::Frontier;
use sqlx::FromRow;

use crate::Storage;

#[derive(FromRow)]
struct JobRow {
    id: i64,
    url: String,
    server_id: Option<i64>,
    parent_id: Option<i64>,
    anchor_text: Option<String>,
    anchor_text_tokens: Vec<String>,
    surrounding_text: Option<String>,
    surrounding_text_tokens: Vec<String>,
    title_text: Option<String>,
    title_text_tokens: Vec<String>,
    priority: f64,
    being_crawled: bool,
    done: bool,
    success: Option<bool>,
}

const JOB_COLUMNS: &str = "id, url, server_id, parent_id, anchor_text, anchor_text_tokens, surrounding_text, surrounding_text_tokens, title_text, title_text_tokens, priority, being_crawled, done, success";

impl From<JobRow> for Job {
    fn from(r: JobRow) -> Self {
        Job {
            id: r.id,
            url: r.url,
            server_id: r.server_id,
            parent_id: r.parent_id,
            anchor_text: r.anchor_text,
            anchor_text_tokens: r.anchor_text_tokens,
            surrounding_text: r.surrounding_text,
            surrounding_text_tokens: r.surrounding_text_tokens,
            title_text: r.title_text,
            title_text_tokens: r.title_text_tokens,
            priority: r.priority,
            being_crawled: r.being_crawled,
            done: r.done,
            success: r.success,
        }
    }
}

fn to_search_error(e: sqlx::Error) -> SearchError {
    SearchError::Storage(e.to_string())
}

/// Everything needed to insert one new job row; `server_id`/`parent_id`
/// are resolved by the caller (the master, per ingest step 3 of §4.6)
/// before the bulk insert.
#[derive(Debug, Clone)]
pub struct JobInsert {
    pub url: String,
    pub server_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub anchor_text: Option<String>,
    pub anchor_text_tokens: Vec<String>,
    pub surrounding_text: Option<String>,
    pub surrounding_text_tokens: Vec<String>,
    pub title_text: Option<String>,
    pub title_text_tokens: Vec<String>,
    pub priority: f64,
}

impl Storage {
    /// Bulk-insert new jobs with on-conflict-ignore on `url` (§4.6 step 4).
    /// Token arrays differ in length per job so this loops one insert per
    /// row inside a single transaction rather than a `UNNEST`-style batch.
    pub async fn insert_jobs_bulk(&self, jobs: &[JobInsert]) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for j in jobs {
            sqlx::query(
                r#"INSERT INTO jobs (url, server_id, parent_id, anchor_text, anchor_text_tokens, surrounding_text, surrounding_text_tokens, title_text, title_text_tokens, priority)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                   ON CONFLICT (url) DO NOTHING"#,
            )
            .bind(&j.url)
            .bind(j.server_id)
            .bind(j.parent_id)
            .bind(&j.anchor_text)
            .bind(&j.anchor_text_tokens)
            .bind(&j.surrounding_text)
            .bind(&j.surrounding_text_tokens)
            .bind(&j.title_text)
            .bind(&j.title_text_tokens)
            .bind(j.priority)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Convenience for the bootstrap subcommand: insert a single seed job
    /// with no link context and a fixed priority.
    pub async fn insert_seed_job(&self, url: &str, server_id: Option<i64>, priority: f64) -> Result<()> {
        self.insert_jobs_bulk(&[JobInsert {
            url: url.to_string(),
            server_id,
            parent_id: None,
            anchor_text: None,
            anchor_text_tokens: vec![],
            surrounding_text: None,
            surrounding_text_tokens: vec![],
            title_text: None,
            title_text_tokens: vec![],
            priority,
        }])
        .await
    }

    pub async fn get_job(&self, id: i64) -> Result<Option<Job>> {
        let row: Option<JobRow> =
            sqlx::query_as(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    /// §4.6 ingest step 5: mark the parent job done/success. Deliberately
    /// the last write of an ingest request so a crashed or retried ingest
    /// leaves the parent reservable-by-staleness rather than silently lost
    /// (Open Question 2's resolution: see DESIGN.md).
    pub async fn mark_parent_done(&self, job_id: i64, success: bool) -> Result<()> {
        sqlx::query("UPDATE jobs SET done = true, success = $1, being_crawled = false WHERE id = $2")
            .bind(success)
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn job_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs").fetch_one(&self.pool).await?;
        Ok(row.0)
    }

    pub async fn done_job_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE done = true")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// §4.8's feedback step: recompute every unfinished job's priority
    /// after a PageRank/importance update. `f` is applied to each
    /// `(job, owning server)` pair; jobs with no resolved server are
    /// skipped (their priority never depended on host importance).
    pub async fn recompute_unfinished_priorities<F>(&self, mut f: F) -> Result<usize>
    where
        F: FnMut(&Job, &Server) -> f64,
    {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE done = false AND server_id IS NOT NULL"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut updated = 0;
        for row in rows {
            let job: Job = row.into();
            let Some(server_id) = job.server_id else { continue };
            let Some(server) = self.get_server(server_id).await? else { continue };
            let new_priority = f(&job, &server);
            sqlx::query("UPDATE jobs SET priority = $1 WHERE id = $2 AND done = false")
                .bind(new_priority)
                .bind(job.id)
                .execute(&self.pool)
                .await?;
            updated += 1;
        }
        Ok(updated)
    }
}

/// The production `Frontier`: reservation is serialized by a Postgres
/// transaction that `SELECT ... FOR UPDATE SKIP LOCKED`s a candidate batch,
/// applies the configured policy in-process, then flips `being_crawled`
/// before committing — spec §4.5 option (a), "DB row-lock + transaction".
pub struct PgFrontier {
    storage: Storage,
    policy: FrontierPolicy,
    candidate_batch_size: usize,
}

impl PgFrontier {
    pub fn new(storage: Storage, policy: FrontierPolicy, candidate_batch_size: usize) -> Self {
        Self {
            storage,
            policy,
            candidate_batch_size,
        }
    }
}

#[async_trait]
impl Frontier for PgFrontier {
    async fn reserve(&self, n: usize) -> Result<Vec<Job>, SearchError> {
        let mut tx = self.storage.pool.begin().await.map_err(to_search_error)?;
        let batch = self.candidate_batch_size.max(n) as i64;
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            r#"SELECT j.id, j.url, j.server_id, j.parent_id, j.anchor_text, j.anchor_text_tokens,
                      j.surrounding_text, j.surrounding_text_tokens, j.title_text, j.title_text_tokens,
                      j.priority, j.being_crawled, j.done, j.success
               FROM jobs j
               LEFT JOIN servers s ON s.id = j.server_id
               WHERE j.done = false AND j.being_crawled = false AND COALESCE(s.is_blacklisted, false) = false
               ORDER BY j.priority DESC, j.id ASC
               LIMIT $1
               FOR UPDATE OF j SKIP LOCKED"#
        ))
        .bind(batch)
        .fetch_all(&mut *tx)
        .await
        .map_err(to_search_error)?;

        let candidates: Vec<Job> = rows.into_iter().map(Into::into).collect();
        let picked = citysearch_frontier::select(self.policy, candidates, n);
        if picked.is_empty() {
            tx.commit().await.map_err(to_search_error)?;
            return Ok(vec![]);
        }
        let ids: Vec<i64> = picked.iter().map(|j| j.id).collect();
        sqlx::query("UPDATE jobs SET being_crawled = true, reserved_at = now() WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(to_search_error)?;
        tx.commit().await.map_err(to_search_error)?;

        Ok(picked
            .into_iter()
            .map(|mut j| {
                j.being_crawled = true;
                j
            })
            .collect())
    }

    async fn unreserve(&self, ids: &[i64]) -> Result<(), SearchError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE jobs SET being_crawled = false WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.storage.pool)
            .await
            .map_err(to_search_error)?;
        Ok(())
    }

    async fn mark_failed(&self, id: i64) -> Result<(), SearchError> {
        sqlx::query("UPDATE jobs SET done = true, success = false, being_crawled = false WHERE id = $1")
            .bind(id)
            .execute(&self.storage.pool)
            .await
            .map_err(to_search_error)?;
        Ok(())
    }

    async fn mark_success(&self, id: i64) -> Result<(), SearchError> {
        sqlx::query("UPDATE jobs SET done = true, success = true, being_crawled = false WHERE id = $1")
            .bind(id)
            .execute(&self.storage.pool)
            .await
            .map_err(to_search_error)?;
        Ok(())
    }

    async fn sweep_stale(&self, stale_after_seconds: i64) -> Result<usize, SearchError> {
        let rows = sqlx::query(
            "UPDATE jobs SET being_crawled = false WHERE being_crawled = true AND reserved_at < now() - make_interval(secs => $1) RETURNING id",
        )
        .bind(stale_after_seconds as f64)
        .fetch_all(&self.storage.pool)
        .await
        .map_err(to_search_error)?;
        Ok(rows.len())
    }
}
