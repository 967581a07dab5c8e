use thiserror::Error;

/// Crate-wide error kinds, named after the abstract error taxonomy the
/// crawl pipeline reasons about (transient vs. permanent fetch failures,
/// extraction failures, and so on) rather than after any one library's
/// own error type.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("malformed url: {0}")]
    MalformedUrl(String),

    #[error("transient fetch error: {0}")]
    TransientFetch(String),

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("master unreachable: {0}")]
    MasterUnreachable(String),

    #[error("queue contention")]
    QueueContention,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
