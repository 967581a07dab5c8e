use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "citysearch", about = "Focused, topic-restricted web search engine")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the master HTTP service (job reservation + result ingest).
    Master,
    /// Run a worker pull/do/push loop against a master.
    Worker {
        /// Base URL of the master, e.g. http://localhost:8080
        #[arg(long)]
        master_url: String,

        /// Stop after crawling this many documents.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Load seed URLs as jobs.
    Bootstrap {
        /// Comma-separated seed URLs, or a path to a file with one URL per line.
        #[arg(long)]
        seeds: String,
    },
    /// Build the host link graph from harvested cross-host links.
    BuildLinkGraph,
    /// Recompute PageRank over the stored link graph and feed it back into
    /// server importance and unfinished job priorities.
    UpdatePagerank,
    /// Build the per-field inverted index over relevant documents.
    BuildIndex,
    /// Fit the per-field TF-IDF vector space and persist per-document vectors.
    BuildVectorspace,
    /// Re-run document relevance classification over stored documents.
    UpdateRelevance,
    /// Run the query HTTP API.
    ServeSearch,
    /// Report database connectivity and row counts.
    Status,
}
