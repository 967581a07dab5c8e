use serde::{Deserialize, Serialize};

/// The ordered set of text fields carried through extraction, indexing,
/// TF-IDF, and ranking.
pub const FIELDS: &[&str] = &[
    "title",
    "meta_description",
    "meta_keywords",
    "meta_author",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "body",
];

/// A host. Created on first sight, never destroyed; mutated only by the
/// master (on result ingest) and the offline PageRank job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub is_blacklisted: bool,
    pub page_rank: f64,
    pub total_done_jobs: i64,
    pub success_jobs: i64,
    pub relevant_documents: i64,
}

impl Server {
    pub fn success_ratio(&self) -> f64 {
        if self.total_done_jobs == 0 {
            0.0
        } else {
            self.success_jobs as f64 / self.total_done_jobs as f64
        }
    }

    pub fn relevant_ratio(&self) -> f64 {
        if self.total_done_jobs == 0 {
            0.0
        } else {
            self.relevant_documents as f64 / self.total_done_jobs as f64
        }
    }
}

/// A unit of crawl work identified by a normalized URL.
///
/// Invariant: `done => success.is_some()`; `!done => success.is_none()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
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
    pub being_crawled: bool,
    pub done: bool,
    pub success: Option<bool>,
}

/// A new job as shipped from a worker to the master; identical to `Job`
/// minus the fields only the master can assign (id, server_id, parent_id,
/// being_crawled/done/success).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub url: String,
    pub anchor_text: Option<String>,
    pub anchor_text_tokens: Vec<String>,
    pub surrounding_text: Option<String>,
    pub surrounding_text_tokens: Vec<String>,
    pub title_text: Option<String>,
    pub title_text_tokens: Vec<String>,
    pub priority: f64,
}

/// The structured result of fetching and parsing a URL. Created once per
/// successful fetch; not mutated after insert except by offline
/// re-classification (the `relevant` flag only).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Document {
    pub id: i64,
    pub job_id: i64,
    pub url: String,
    pub html: String,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_author: Option<String>,
    pub h1: Option<String>,
    pub h2: Option<String>,
    pub h3: Option<String>,
    pub h4: Option<String>,
    pub h5: Option<String>,
    pub h6: Option<String>,
    pub body: Option<String>,
    pub title_tokens: Vec<String>,
    pub meta_description_tokens: Vec<String>,
    pub meta_keywords_tokens: Vec<String>,
    pub meta_author_tokens: Vec<String>,
    pub h1_tokens: Vec<String>,
    pub h2_tokens: Vec<String>,
    pub h3_tokens: Vec<String>,
    pub h4_tokens: Vec<String>,
    pub h5_tokens: Vec<String>,
    pub h6_tokens: Vec<String>,
    pub body_tokens: Vec<String>,
    pub relevant: bool,
}

impl Document {
    pub fn field_text(&self, field: &str) -> Option<&str> {
        match field {
            "title" => self.title.as_deref(),
            "meta_description" => self.meta_description.as_deref(),
            "meta_keywords" => self.meta_keywords.as_deref(),
            "meta_author" => self.meta_author.as_deref(),
            "h1" => self.h1.as_deref(),
            "h2" => self.h2.as_deref(),
            "h3" => self.h3.as_deref(),
            "h4" => self.h4.as_deref(),
            "h5" => self.h5.as_deref(),
            "h6" => self.h6.as_deref(),
            "body" => self.body.as_deref(),
            other => panic!("unknown field: {other}"),
        }
    }

    pub fn field_tokens(&self, field: &str) -> &[String] {
        match field {
            "title" => &self.title_tokens,
            "meta_description" => &self.meta_description_tokens,
            "meta_keywords" => &self.meta_keywords_tokens,
            "meta_author" => &self.meta_author_tokens,
            "h1" => &self.h1_tokens,
            "h2" => &self.h2_tokens,
            "h3" => &self.h3_tokens,
            "h4" => &self.h4_tokens,
            "h5" => &self.h5_tokens,
            "h6" => &self.h6_tokens,
            "body" => &self.body_tokens,
            other => panic!("unknown field: {other}"),
        }
    }
}

/// A new document as shipped from a worker to the master; identical to
/// `Document` minus the fields only the master can assign (id, job_id —
/// the latter comes from the `save_crawling_results/{parent_job_id}` path
/// segment, not the body) and the `relevant` flag, which the master
/// re-derives from the document's own content rather than trusting the
/// worker's classification (the worker runs the identical classifier, but
/// the master is the source of truth).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewDocument {
    pub url: String,
    pub html: String,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_author: Option<String>,
    pub h1: Option<String>,
    pub h2: Option<String>,
    pub h3: Option<String>,
    pub h4: Option<String>,
    pub h5: Option<String>,
    pub h6: Option<String>,
    pub body: Option<String>,
    pub title_tokens: Vec<String>,
    pub meta_description_tokens: Vec<String>,
    pub meta_keywords_tokens: Vec<String>,
    pub meta_author_tokens: Vec<String>,
    pub h1_tokens: Vec<String>,
    pub h2_tokens: Vec<String>,
    pub h3_tokens: Vec<String>,
    pub h4_tokens: Vec<String>,
    pub h5_tokens: Vec<String>,
    pub h6_tokens: Vec<String>,
    pub body_tokens: Vec<String>,
    pub relevant: bool,
}

impl NewDocument {
    pub fn into_document(self, job_id: i64) -> Document {
        Document {
            id: 0,
            job_id,
            url: self.url,
            html: self.html,
            title: self.title,
            meta_description: self.meta_description,
            meta_keywords: self.meta_keywords,
            meta_author: self.meta_author,
            h1: self.h1,
            h2: self.h2,
            h3: self.h3,
            h4: self.h4,
            h5: self.h5,
            h6: self.h6,
            body: self.body,
            title_tokens: self.title_tokens,
            meta_description_tokens: self.meta_description_tokens,
            meta_keywords_tokens: self.meta_keywords_tokens,
            meta_author_tokens: self.meta_author_tokens,
            h1_tokens: self.h1_tokens,
            h2_tokens: self.h2_tokens,
            h3_tokens: self.h3_tokens,
            h4_tokens: self.h4_tokens,
            h5_tokens: self.h5_tokens,
            h6_tokens: self.h6_tokens,
            body_tokens: self.body_tokens,
            relevant: self.relevant,
        }
    }
}

/// A sparse real vector: parallel `indices`/`values` plus the dimension of
/// the vectorizer's vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f64>,
    pub dim: u32,
}

impl SparseVector {
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let mut i = 0;
        let mut j = 0;
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn cosine(&self, other: &SparseVector) -> f64 {
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            0.0
        } else {
            self.dot(other) / denom
        }
    }
}

/// One row of the `tfidfs` table: per-field sparse vectors for a single
/// document. `None` means that field was empty for this document and has
/// no stored vector.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TfidfRow {
    pub document_id: i64,
    pub title: Option<SparseVector>,
    pub meta_description: Option<SparseVector>,
    pub meta_keywords: Option<SparseVector>,
    pub meta_author: Option<SparseVector>,
    pub h1: Option<SparseVector>,
    pub h2: Option<SparseVector>,
    pub h3: Option<SparseVector>,
    pub h4: Option<SparseVector>,
    pub h5: Option<SparseVector>,
    pub h6: Option<SparseVector>,
    pub body: Option<SparseVector>,
}

impl TfidfRow {
    pub fn field(&self, field: &str) -> Option<&SparseVector> {
        match field {
            "title" => self.title.as_ref(),
            "meta_description" => self.meta_description.as_ref(),
            "meta_keywords" => self.meta_keywords.as_ref(),
            "meta_author" => self.meta_author.as_ref(),
            "h1" => self.h1.as_ref(),
            "h2" => self.h2.as_ref(),
            "h3" => self.h3.as_ref(),
            "h4" => self.h4.as_ref(),
            "h5" => self.h5.as_ref(),
            "h6" => self.h6.as_ref(),
            "body" => self.body.as_ref(),
            other => panic!("unknown field: {other}"),
        }
    }

    pub fn set_field(&mut self, field: &str, vec: Option<SparseVector>) {
        match field {
            "title" => self.title = vec,
            "meta_description" => self.meta_description = vec,
            "meta_keywords" => self.meta_keywords = vec,
            "meta_author" => self.meta_author = vec,
            "h1" => self.h1 = vec,
            "h2" => self.h2 = vec,
            "h3" => self.h3 = vec,
            "h4" => self.h4 = vec,
            "h5" => self.h5 = vec,
            "h6" => self.h6 = vec,
            "body" => self.body = vec,
            other => panic!("unknown field: {other}"),
        }
    }
}
