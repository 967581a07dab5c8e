use std::collections::HashMap;

use anyhow::Result;
use citysearch_core::Server;
use sqlx::FromRow;

use crate::Storage;

#[derive(FromRow)]
struct ServerRow {
    id: i64,
    name: String,
    is_blacklisted: bool,
    page_rank: f64,
    total_done_jobs: i64,
    success_jobs: i64,
    relevant_documents: i64,
}

impl From<ServerRow> for Server {
    fn from(r: ServerRow) -> Self {
        Server {
            id: r.id,
            name: r.name,
            is_blacklisted: r.is_blacklisted,
            page_rank: r.page_rank,
            total_done_jobs: r.total_done_jobs,
            success_jobs: r.success_jobs,
            relevant_documents: r.relevant_documents,
        }
    }
}

impl Storage {
    /// Upsert a batch of host names (creating rows for hosts never seen
    /// before) and return a `name -> id` map for all of them. Mirrors the
    /// master's ingest step 2 (§4.6): "collect unique hosts... upsert
    /// Server rows; return their ids."
    pub async fn upsert_servers(&self, names: &[String]) -> Result<HashMap<String, i64>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(i64, String)> = sqlx::query_as(
            r#"INSERT INTO servers (name)
               SELECT * FROM UNNEST($1::text[])
               ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
               RETURNING id, name"#,
        )
        .bind(names)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id, name)| (name, id)).collect())
    }

    pub async fn get_server(&self, id: i64) -> Result<Option<Server>> {
        let row: Option<ServerRow> = sqlx::query_as(
            "SELECT id, name, is_blacklisted, page_rank, total_done_jobs, success_jobs, relevant_documents FROM servers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get_server_by_name(&self, name: &str) -> Result<Option<Server>> {
        let row: Option<ServerRow> = sqlx::query_as(
            "SELECT id, name, is_blacklisted, page_rank, total_done_jobs, success_jobs, relevant_documents FROM servers WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list_servers(&self) -> Result<Vec<Server>> {
        let rows: Vec<ServerRow> = sqlx::query_as(
            "SELECT id, name, is_blacklisted, page_rank, total_done_jobs, success_jobs, relevant_documents FROM servers",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Apply a save-results call's outcome to the owning host's running
    /// totals (spec §4.4).
    pub async fn record_job_outcome(&self, server_id: i64, success: bool, relevant: bool) -> Result<()> {
        sqlx::query(
            r#"UPDATE servers SET
                 total_done_jobs = total_done_jobs + 1,
                 success_jobs = success_jobs + CASE WHEN $1 THEN 1 ELSE 0 END,
                 relevant_documents = relevant_documents + CASE WHEN $2 THEN 1 ELSE 0 END
               WHERE id = $3"#,
        )
        .bind(success)
        .bind(relevant)
        .bind(server_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Offline PageRank feedback (§4.8): update every host present in the
    /// link graph; hosts not in the graph keep their prior value (callers
    /// simply don't include them in `ranks`).
    pub async fn update_page_ranks(&self, ranks: &HashMap<String, f64>) -> Result<()> {
        for (name, rank) in ranks {
            sqlx::query("UPDATE servers SET page_rank = $1 WHERE name = $2")
                .bind(rank)
                .bind(name)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    pub async fn server_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM servers")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
