//! The query HTTP API (spec §4.11, §6 "Search HTTP API"): a standalone
//! axum app, run via the `serve-search` subcommand.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use citysearch_core::config::RankingConfig;
use citysearch_core::tokenize::{tokenize, TokenizeOptions};
use citysearch_core::TfidfRow;
use citysearch_invindex::InvertedIndex;
use citysearch_storage::Storage;
use citysearch_vectorspace::VectorSpaceModel;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::rank::{paginate, rank};

pub struct SearchState {
    pub storage: Storage,
    pub index: InvertedIndex,
    pub vectorspace: VectorSpaceModel,
    pub ranking: RankingConfig,
    pub tokenize_opts: TokenizeOptions,
}

pub fn router(state: Arc<SearchState>) -> Router {
    Router::new()
        .route("/search", get(search))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    page: Option<usize>,
    page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
struct DisplayedResult {
    title: Option<String>,
    body: Option<String>,
    url: String,
    relevant: bool,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    query: String,
    query_tokens: Vec<String>,
    page: usize,
    page_size: usize,
    results: Vec<DisplayedResult>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

async fn search(State(state): State<Arc<SearchState>>, Query(params): Query<SearchParams>) -> impl IntoResponse {
    let query = params.q.unwrap_or_default();
    if query.trim().is_empty() {
        return Json(ErrorResponse {
            error: "Invalid query".to_string(),
        })
        .into_response();
    }

    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(10).max(1);
    let query_tokens = tokenize(&query, &state.tokenize_opts);

    let ranked = rank(
        &query_tokens,
        &state.index,
        &state.vectorspace,
        &load_tfidf_rows(&state, &query_tokens).await,
        &state.ranking.field_weights,
    );
    let page_slice = paginate(&ranked, page, page_size);

    let ids: Vec<i64> = page_slice.iter().map(|r| r.document_id).collect();
    let documents = match state.storage.get_documents(&ids).await {
        Ok(docs) => docs,
        Err(e) => {
            tracing::error!(error = %e, "failed to load documents for search results");
            Vec::new()
        }
    };
    let by_id: HashMap<i64, _> = documents.into_iter().map(|d| (d.id, d)).collect();

    let results = page_slice
        .iter()
        .filter_map(|r| by_id.get(&r.document_id))
        .map(|d| DisplayedResult {
            title: d.title.clone(),
            body: d.body.clone(),
            url: d.url.clone(),
            relevant: d.relevant,
        })
        .collect();

    Json(SearchResponse {
        query,
        query_tokens,
        page,
        page_size,
        results,
    })
    .into_response()
}

/// Loads the TF-IDF rows for every document the inverted index says could
/// possibly match, across all fields — the candidate set `rank` needs to
/// score against.
async fn load_tfidf_rows(state: &SearchState, query_tokens: &[String]) -> HashMap<i64, TfidfRow> {
    let candidates = state.index.candidates(query_tokens);
    if candidates.is_empty() {
        return HashMap::new();
    }
    match state.storage.get_tfidf_rows(&candidates).await {
        Ok(rows) => rows.into_iter().map(|r| (r.document_id, r)).collect(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load tfidf rows for search query");
            HashMap::new()
        }
    }
}
