//! The worker pull/do/push loop (spec §4.7).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use citysearch_core::config::AppConfig;
use citysearch_core::tokenize::{tokenize, TokenizeOptions};
use citysearch_core::{Document, NewDocument, NewJob, SearchError};
use citysearch_extract::HarvestedLink;
use citysearch_urlscore::{RuleBasedUrlClassifier, ScoredUrl, UrlClassifier};
use url::Url;

use crate::fetch::{self, politeness_sleep};
use crate::master_client::{JobDescriptor, MasterClient};

pub struct WorkerOptions {
    /// Cap on the number of documents to crawl before graceful exit; `None`
    /// runs until the process is signaled (spec §6's `-n N` CLI flag).
    pub max_documents: Option<usize>,
}

/// Runs the pull/do/push loop until `max_documents` is reached or the
/// process receives a shutdown signal, at which point any buffered,
/// uncrawled jobs are handed back via `unreserve` (spec §4.7 step 4).
pub async fn run_worker(config: Arc<AppConfig>, master: Arc<MasterClient>, opts: WorkerOptions) -> Result<(), SearchError> {
    let http_client = fetch::build_http_client(&config.fetch)?;
    let classifier: Box<dyn UrlClassifier> = Box::new(RuleBasedUrlClassifier);
    let tokenize_opts = TokenizeOptions {
        long_word_threshold: config.relevance.long_word_threshold,
        topic_canonical: config.relevance.topic_canonical_spelling.clone(),
        topic_variants: config.relevance.topic_writing_styles.clone(),
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }

    let mut buffer: VecDeque<JobDescriptor> = VecDeque::new();
    let mut crawled = 0usize;

    let result = loop {
        if shutdown.load(Ordering::SeqCst) {
            break Ok(());
        }
        if let Some(max) = opts.max_documents {
            if crawled >= max {
                break Ok(());
            }
        }

        if buffer.is_empty() {
            match master.reserve_jobs(config.frontier.worker_batch_size).await {
                Ok(jobs) if jobs.is_empty() => {
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
                Ok(jobs) => buffer.extend(jobs),
                Err(e) => {
                    tracing::warn!(error = %e, "reserve_jobs failed, retrying shortly");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            }
        }

        let Some(job) = buffer.pop_front() else { continue };
        match process_job(&job, &http_client, classifier.as_ref(), &config, &tokenize_opts).await {
            Ok((new_document, new_jobs)) => {
                if let Err(e) = master.save_crawling_results(job.id, &new_document, &new_jobs).await {
                    tracing::error!(error = %e, job_id = job.id, url = %job.url, "failed to save crawling results");
                    let _ = master.mark_job_as_fail(job.id).await;
                } else {
                    crawled += 1;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, job_id = job.id, url = %job.url, "job failed entirely");
                let _ = master.mark_job_as_fail(job.id).await;
            }
        }

        politeness_sleep(
            config.fetch.random_sleep_interval_min_ms,
            config.fetch.random_sleep_interval_max_ms,
        )
        .await;
    };

    let remaining: Vec<i64> = buffer.into_iter().map(|j| j.id).collect();
    if let Err(e) = master.unreserve_jobs(&remaining).await {
        tracing::error!(error = %e, "failed to unreserve buffered jobs on exit");
    }

    result
}

/// Attempts a static fetch, falling back to a dynamic (JS-rendered) fetch
/// when the static attempt failed or produced an irrelevant document.
/// Returns `Err` only when neither attempt produced any HTML at all —
/// the mutually-exclusive "no document at all" case that the caller
/// reports via `mark_job_as_fail` instead of `save_crawling_results`
/// (Open Question 1's resolution).
async fn process_job(
    job: &JobDescriptor,
    http_client: &reqwest::Client,
    classifier: &dyn UrlClassifier,
    config: &AppConfig,
    tokenize_opts: &TokenizeOptions,
) -> Result<(NewDocument, Vec<NewJob>), SearchError> {
    let url = Url::parse(&job.url).map_err(|e| SearchError::MalformedUrl(e.to_string()))?;

    let static_result = fetch::static_fetch(http_client, &job.url, &config.fetch).await;
    let (html, document) = match static_result {
        Ok(html) => {
            let (doc, _) = citysearch_extract::extract_document(&html, &url, tokenize_opts);
            let relevant = citysearch_classify::is_document_relevant(&url, &doc, &config.relevance);
            if relevant {
                (html, doc)
            } else {
                dynamic_fallback(&job.url, &url, config, tokenize_opts).await?
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, url = %job.url, "static fetch failed, trying dynamic fetch");
            dynamic_fallback(&job.url, &url, config, tokenize_opts).await?
        }
    };

    let mut document = document;
    document.relevant = citysearch_classify::is_document_relevant(&url, &document, &config.relevance);

    let new_jobs = if document.relevant {
        let (_, links) = citysearch_extract::extract_document(&html, &url, tokenize_opts);
        harvest_to_new_jobs(&links, &document, &url, classifier, config, tokenize_opts)
    } else {
        Vec::new()
    };

    Ok((to_new_document(document, html), new_jobs))
}

async fn dynamic_fallback(
    raw_url: &str,
    url: &Url,
    config: &AppConfig,
    tokenize_opts: &TokenizeOptions,
) -> Result<(String, Document), SearchError> {
    politeness_sleep(
        config.fetch.random_sleep_interval_min_ms,
        config.fetch.random_sleep_interval_max_ms,
    )
    .await;
    let html = fetch::dynamic_fetch(raw_url.to_string(), config.fetch.render_timeout_seconds).await?;
    let (doc, _) = citysearch_extract::extract_document(&html, url, tokenize_opts);
    Ok((html, doc))
}

fn harvest_to_new_jobs(
    links: &[HarvestedLink],
    document: &Document,
    document_url: &Url,
    classifier: &dyn UrlClassifier,
    config: &AppConfig,
    tokenize_opts: &TokenizeOptions,
) -> Vec<NewJob> {
    let title_text = document.title.clone().unwrap_or_default();
    links
        .iter()
        .filter_map(|link| {
            let normalized = citysearch_urlscore::normalize(&link.url, Some(document_url)).ok()?;
            let scored = ScoredUrl::new(
                normalized.clone(),
                link.anchor_text.clone(),
                link.surrounding_text.clone(),
                title_text.clone(),
            );
            let priority = citysearch_urlscore::priority_from_config(
                &scored,
                tokenize_opts,
                classifier,
                &config.relevance,
                &config.urlscore,
            );
            if !citysearch_urlscore::is_relevant(priority) {
                return None;
            }
            Some(NewJob {
                url: normalized.to_string(),
                anchor_text: Some(link.anchor_text.clone()),
                anchor_text_tokens: tokenize(&link.anchor_text, tokenize_opts),
                surrounding_text: Some(link.surrounding_text.clone()),
                surrounding_text_tokens: tokenize(&link.surrounding_text, tokenize_opts),
                title_text: Some(title_text.clone()),
                title_text_tokens: tokenize(&title_text, tokenize_opts),
                priority,
            })
        })
        .collect()
}

fn to_new_document(doc: Document, html: String) -> NewDocument {
    NewDocument {
        url: doc.url,
        html,
        title: doc.title,
        meta_description: doc.meta_description,
        meta_keywords: doc.meta_keywords,
        meta_author: doc.meta_author,
        h1: doc.h1,
        h2: doc.h2,
        h3: doc.h3,
        h4: doc.h4,
        h5: doc.h5,
        h6: doc.h6,
        body: doc.body,
        title_tokens: doc.title_tokens,
        meta_description_tokens: doc.meta_description_tokens,
        meta_keywords_tokens: doc.meta_keywords_tokens,
        meta_author_tokens: doc.meta_author_tokens,
        h1_tokens: doc.h1_tokens,
        h2_tokens: doc.h2_tokens,
        h3_tokens: doc.h3_tokens,
        h4_tokens: doc.h4_tokens,
        h5_tokens: doc.h5_tokens,
        h6_tokens: doc.h6_tokens,
        body_tokens: doc.body_tokens,
        relevant: doc.relevant,
    }
}
