use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use citysearch_core::{NewDocument, NewJob};
use citysearch_storage::JobInsert;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::state::MasterState;

#[derive(Debug, Deserialize)]
pub struct PwParam {
    pub pw: Option<String>,
}

fn unauthorized() -> impl IntoResponse {
    (StatusCode::UNAUTHORIZED, "missing or incorrect password")
}

pub async fn liveness() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
pub struct JobDescriptor {
    pub id: i64,
    pub url: String,
}

pub async fn reserve_jobs(
    State(state): State<Arc<MasterState>>,
    Path(n): Path<usize>,
    Query(pw): Query<PwParam>,
) -> impl IntoResponse {
    if !state.check_password(pw.pw.as_deref()) {
        return unauthorized().into_response();
    }
    match state.reserve(n).await {
        Ok(jobs) => Json(
            jobs.into_iter()
                .map(|j| JobDescriptor { id: j.id, url: j.url })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "reserve_jobs failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn unreserve_jobs(
    State(state): State<Arc<MasterState>>,
    Query(pw): Query<PwParam>,
    Json(ids): Json<Vec<i64>>,
) -> impl IntoResponse {
    if !state.check_password(pw.pw.as_deref()) {
        return unauthorized().into_response();
    }
    match state.frontier.unreserve(&ids).await {
        Ok(()) => (StatusCode::OK, "unreserved").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "unreserve_jobs failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn mark_job_as_fail(
    State(state): State<Arc<MasterState>>,
    Path(id): Path<i64>,
    Query(pw): Query<PwParam>,
) -> impl IntoResponse {
    if !state.check_password(pw.pw.as_deref()) {
        return unauthorized().into_response();
    }
    match state.frontier.mark_failed(id).await {
        Ok(()) => (StatusCode::OK, "marked failed").into_response(),
        Err(e) => {
            tracing::error!(error = %e, job_id = id, "mark_job_as_fail failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveCrawlingResultsBody {
    pub new_document: NewDocument,
    pub new_jobs: Vec<NewJob>,
}

/// §4.6 ingest sequence. Ordering within the batch doesn't matter except
/// that the parent job update is last, so a crashed or retried request
/// never leaves the parent job permanently stuck `being_crawled` without a
/// chance for the staleness sweep to reclaim it.
pub async fn save_crawling_results(
    State(state): State<Arc<MasterState>>,
    Path(parent_job_id): Path<i64>,
    Query(pw): Query<PwParam>,
    Json(body): Json<SaveCrawlingResultsBody>,
) -> impl IntoResponse {
    if !state.check_password(pw.pw.as_deref()) {
        return unauthorized().into_response();
    }

    let url = match Url::parse(&body.new_document.url) {
        Ok(u) => u,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("invalid document url: {e}")).into_response(),
    };

    let mut document = body.new_document.into_document(parent_job_id);
    document.relevant = citysearch_classify::is_document_relevant(&url, &document, &state.relevance);

    let document_id = match state.storage.insert_document(&document).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "failed to persist document");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    if let Err(e) = ingest_new_jobs(&state, document_id, &body.new_jobs).await {
        tracing::error!(error = %e, "failed to ingest new jobs");
    }

    // Reaching this handler at all means the fetch succeeded; relevance is
    // a separate question fed into the registry's importance bonus.
    match state.storage.get_job(parent_job_id).await {
        Ok(Some(parent_job)) => {
            if let Some(server_id) = parent_job.server_id {
                if let Err(e) = state.storage.record_job_outcome(server_id, true, document.relevant).await {
                    tracing::error!(error = %e, job_id = parent_job_id, "failed to record job outcome");
                }
            }
        }
        Ok(None) => tracing::warn!(job_id = parent_job_id, "save_crawling_results for unknown parent job"),
        Err(e) => tracing::error!(error = %e, job_id = parent_job_id, "failed to load parent job"),
    }

    // Parent job update is deliberately the last write.
    if let Err(e) = state.storage.mark_parent_done(parent_job_id, true).await {
        tracing::error!(error = %e, job_id = parent_job_id, "failed to mark parent job done");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (StatusCode::OK, "saved").into_response()
}

async fn ingest_new_jobs(
    state: &MasterState,
    document_id: i64,
    new_jobs: &[NewJob],
) -> anyhow::Result<()> {
    if new_jobs.is_empty() {
        return Ok(());
    }

    let mut host_names: Vec<String> = new_jobs
        .iter()
        .filter_map(|j| Url::parse(&j.url).ok())
        .map(|u| citysearch_urlscore::server_name(&u))
        .collect();
    host_names.sort_unstable();
    host_names.dedup();

    let host_ids = state.storage.upsert_servers(&host_names).await?;

    let mut importance_cache: HashMap<i64, f64> = HashMap::new();
    let mut inserts = Vec::with_capacity(new_jobs.len());
    for job in new_jobs {
        let Ok(url) = Url::parse(&job.url) else { continue };
        let host = citysearch_urlscore::server_name(&url);
        let server_id = host_ids.get(&host).copied();

        let importance = match server_id {
            Some(id) => match importance_cache.get(&id) {
                Some(&v) => v,
                None => {
                    let v = match state.storage.get_server(id).await? {
                        Some(server) => citysearch_registry::importance(&server, &state.registry),
                        None => 0.0,
                    };
                    importance_cache.insert(id, v);
                    v
                }
            },
            None => 0.0,
        };

        inserts.push(JobInsert {
            url: job.url.clone(),
            server_id,
            parent_id: Some(document_id),
            anchor_text: job.anchor_text.clone(),
            anchor_text_tokens: job.anchor_text_tokens.clone(),
            surrounding_text: job.surrounding_text.clone(),
            surrounding_text_tokens: job.surrounding_text_tokens.clone(),
            title_text: job.title_text.clone(),
            title_text_tokens: job.title_text_tokens.clone(),
            priority: job.priority + importance,
        });
    }

    state.storage.insert_jobs_bulk(&inserts).await
}
