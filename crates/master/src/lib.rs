//! Master service (spec §4.6): the shared-secret-gated HTTP API workers
//! pull jobs from and push crawl results into.

pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::MasterState;

pub fn router(state: Arc<MasterState>) -> Router {
    Router::new()
        .route("/", get(handlers::liveness))
        .route("/reserve_jobs/:n", get(handlers::reserve_jobs))
        .route("/unreserve_jobs", post(handlers::unreserve_jobs))
        .route("/mark_job_as_fail/:id", post(handlers::mark_job_as_fail))
        .route("/save_crawling_results/:parent_job_id", post(handlers::save_crawling_results))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
