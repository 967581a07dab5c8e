//! Static and dynamic fetch (spec §4.7 steps 2a/2c). Static fetch is a
//! plain `reqwest` GET with a hand-rolled retry/backoff loop — the teacher
//! itself hand-rolls retry-via-requeue rather than pulling a retry
//! middleware crate, so this follows the same shape rather than reaching
//! for `reqwest-retry`.

use std::time::Duration;

use citysearch_core::config::FetchConfig;
use citysearch_core::SearchError;
use headless_chrome::{Browser, LaunchOptionsBuilder};
use rand::Rng;

pub fn build_http_client(cfg: &FetchConfig) -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_seconds))
        .redirect(reqwest::redirect::Policy::limited(cfg.redirection_limit as usize))
        .user_agent(cfg.user_agent.clone())
        .build()
        .map_err(|e| SearchError::Config(format!("failed to build http client: {e}")))
}

/// Plain HTTP GET with retry on transient statuses. Requires a 2xx
/// response whose `Content-Type` contains "html"; anything else — a
/// permanently bad status, a timeout with no retries left, a body over
/// `max_body_size` — surfaces as `FetchFailed`.
pub async fn static_fetch(client: &reqwest::Client, url: &str, cfg: &FetchConfig) -> Result<String, SearchError> {
    let mut last_error = String::new();
    for attempt in 0..=cfg.retries {
        let response = match client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = e.to_string();
                if attempt < cfg.retries {
                    backoff_sleep(cfg.backoff_factor, attempt).await;
                    continue;
                }
                return Err(SearchError::TransientFetch(last_error));
            }
        };

        let status = response.status();
        if status.is_success() {
            let is_html = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains("html"));
            if !is_html {
                return Err(SearchError::FetchFailed(format!("non-html content-type for {url}")));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| SearchError::FetchFailed(e.to_string()))?;
            if bytes.len() > cfg.max_body_size {
                return Err(SearchError::BodyTooLarge {
                    size: bytes.len(),
                    max: cfg.max_body_size,
                });
            }
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }

        let retryable = status.is_server_error() || cfg.retries_if_status.contains(&status.as_u16());
        last_error = format!("status {status}");
        if retryable && attempt < cfg.retries {
            backoff_sleep(cfg.backoff_factor, attempt).await;
            continue;
        }
        return Err(SearchError::FetchFailed(last_error));
    }
    Err(SearchError::FetchFailed(last_error))
}

async fn backoff_sleep(backoff_factor: f64, attempt: u32) {
    let seconds = backoff_factor * 2f64.powi(attempt as i32);
    tokio::time::sleep(Duration::from_secs_f64(seconds.max(0.0))).await;
}

/// A bounded random politeness sleep between fetches (spec §4.7/§5).
pub async fn politeness_sleep(min_ms: u64, max_ms: u64) {
    let millis = if max_ms > min_ms {
        rand::thread_rng().gen_range(min_ms..=max_ms)
    } else {
        min_ms
    };
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

/// JS-rendered fallback fetch, used when the static fetch failed or
/// produced a non-relevant document (spec §4.7 step 2c). Spawned onto a
/// blocking thread since `headless_chrome`'s API is synchronous.
pub async fn dynamic_fetch(url: String, render_timeout_seconds: u64) -> Result<String, SearchError> {
    tokio::task::spawn_blocking(move || dynamic_fetch_blocking(&url, render_timeout_seconds))
        .await
        .map_err(|e| SearchError::FetchFailed(format!("render task panicked: {e}")))?
}

fn dynamic_fetch_blocking(url: &str, render_timeout_seconds: u64) -> Result<String, SearchError> {
    let launch_options = LaunchOptionsBuilder::default()
        .headless(true)
        .args(vec![
            std::ffi::OsStr::new("--no-sandbox"),
            std::ffi::OsStr::new("--disable-dev-shm-usage"),
            std::ffi::OsStr::new("--disable-gpu"),
        ])
        .build()
        .map_err(|e| SearchError::FetchFailed(format!("failed to configure headless browser: {e}")))?;

    let browser = Browser::new(launch_options).map_err(|e| SearchError::FetchFailed(e.to_string()))?;
    let tab = browser.new_tab().map_err(|e| SearchError::FetchFailed(e.to_string()))?;
    tab.set_default_timeout(Duration::from_secs(render_timeout_seconds));

    tab.navigate_to(url).map_err(|e| SearchError::FetchFailed(e.to_string()))?;
    tab.wait_until_navigated().map_err(|e| SearchError::FetchFailed(e.to_string()))?;

    tab.get_content().map_err(|e| SearchError::FetchFailed(e.to_string()))
}
