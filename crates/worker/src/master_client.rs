//! HTTP client for the master's API (spec §6 "Master HTTP API").

use citysearch_core::{NewDocument, NewJob, SearchError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct JobDescriptor {
    pub id: i64,
    pub url: String,
}

#[derive(Debug, Serialize)]
struct SaveCrawlingResultsBody<'a> {
    new_document: &'a NewDocument,
    new_jobs: &'a [NewJob],
}

pub struct MasterClient {
    http: reqwest::Client,
    base_url: String,
    password: String,
}

impl MasterClient {
    pub fn new(http: reqwest::Client, base_url: String, password: String) -> Self {
        Self { http, base_url, password }
    }

    fn with_pw(&self, path: &str) -> String {
        format!("{}{}?pw={}", self.base_url, path, self.password)
    }

    pub async fn reserve_jobs(&self, n: usize) -> Result<Vec<JobDescriptor>, SearchError> {
        let url = self.with_pw(&format!("/reserve_jobs/{n}"));
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SearchError::MasterUnreachable(e.to_string()))?;
        ensure_success(&resp)?;
        resp.json()
            .await
            .map_err(|e| SearchError::MasterUnreachable(e.to_string()))
    }

    pub async fn unreserve_jobs(&self, ids: &[i64]) -> Result<(), SearchError> {
        if ids.is_empty() {
            return Ok(());
        }
        let url = self.with_pw("/unreserve_jobs");
        let resp = self
            .http
            .post(&url)
            .json(ids)
            .send()
            .await
            .map_err(|e| SearchError::MasterUnreachable(e.to_string()))?;
        ensure_success(&resp)
    }

    pub async fn mark_job_as_fail(&self, id: i64) -> Result<(), SearchError> {
        let url = self.with_pw(&format!("/mark_job_as_fail/{id}"));
        let resp = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| SearchError::MasterUnreachable(e.to_string()))?;
        ensure_success(&resp)
    }

    pub async fn save_crawling_results(
        &self,
        parent_job_id: i64,
        new_document: &NewDocument,
        new_jobs: &[NewJob],
    ) -> Result<(), SearchError> {
        let url = self.with_pw(&format!("/save_crawling_results/{parent_job_id}"));
        let resp = self
            .http
            .post(&url)
            .json(&SaveCrawlingResultsBody { new_document, new_jobs })
            .send()
            .await
            .map_err(|e| SearchError::MasterUnreachable(e.to_string()))?;
        ensure_success(&resp)
    }
}

fn ensure_success(resp: &reqwest::Response) -> Result<(), SearchError> {
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(SearchError::MasterUnreachable(format!(
            "master returned status {}",
            resp.status()
        )))
    }
}
