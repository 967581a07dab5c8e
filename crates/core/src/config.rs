use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub database: DatabaseConfig,
    pub master: MasterConfig,
    pub fetch: FetchConfig,
    pub frontier: FrontierConfig,
    pub relevance: RelevanceConfig,
    pub urlscore: UrlScoreConfig,
    pub registry: RegistryConfig,
    pub ranking: RankingConfig,
    pub search: SearchConfig,
}

/// The query HTTP API's own listen address (spec §4.11/§6) — kept separate
/// from `[master]`'s host/port since the two services run as independent
/// processes per spec.md's "independent process" contract.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    pub data_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub postgres_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MasterConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    #[serde(default = "default_max_job_request")]
    pub max_job_request: usize,
    #[serde(default = "default_reserve_buffer")]
    pub reserve_buffer_size: usize,
    #[serde(default = "default_stale_after")]
    pub stale_after_seconds: i64,
}

fn default_max_job_request() -> usize {
    50
}
fn default_reserve_buffer() -> usize {
    200
}
fn default_stale_after() -> i64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    pub timeout_seconds: u64,
    pub render_timeout_seconds: u64,
    pub retries: u32,
    pub retries_if_status: Vec<u16>,
    pub backoff_factor: f64,
    pub redirection_limit: u32,
    pub random_sleep_interval_min_ms: u64,
    pub random_sleep_interval_max_ms: u64,
    pub user_agent: String,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FrontierPolicy {
    /// Sort all reservable jobs by priority and take the top n.
    TopK,
    /// Take the single highest-priority job per host, sort those
    /// descending, then take n.
    HostFair,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FrontierConfig {
    pub batch_size: usize,
    pub worker_batch_size: usize,
    pub policy: FrontierPolicy,
    #[serde(default = "default_lock_retries")]
    pub lock_retries: u32,
    #[serde(default = "default_lock_backoff_ms")]
    pub lock_backoff_ms: u64,
}

fn default_lock_retries() -> u32 {
    5
}
fn default_lock_backoff_ms() -> u64 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelevanceConfig {
    pub english_probability_threshold: f64,
    pub english_probability_threshold_multilang: f64,
    pub topic_writing_styles: Vec<String>,
    /// The spelling every entry in `topic_writing_styles` unifies onto in
    /// tokenized text (spec's original `unify_tuebingen` pass).
    pub topic_canonical_spelling: String,
    pub blocked_patterns: Vec<String>,
    pub always_keep_patterns: Vec<String>,
    pub bonus_patterns: Vec<String>,
    pub media_extensions: Vec<String>,
    pub long_word_threshold: usize,
}

/// §4.1's URL-priority rule bonuses and the pattern lists they key off of.
#[derive(Debug, Deserialize, Clone)]
pub struct UrlScoreConfig {
    pub english_indicators: Vec<String>,
    pub seed_patterns: Vec<String>,
    #[serde(default = "default_topic_in_url")]
    pub topic_in_url: f64,
    #[serde(default = "default_english_in_url")]
    pub english_in_url: f64,
    #[serde(default = "default_bonus_list_hit")]
    pub bonus_list_hit: f64,
    #[serde(default = "default_seed_list_hit")]
    pub seed_list_hit: f64,
    #[serde(default = "default_topic_in_anchor")]
    pub topic_in_anchor: f64,
    #[serde(default = "default_english_in_anchor")]
    pub english_in_anchor: f64,
    #[serde(default = "default_topic_in_title")]
    pub topic_in_title: f64,
    #[serde(default = "default_english_in_surrounding")]
    pub english_in_surrounding: f64,
}

fn default_topic_in_url() -> f64 {
    5.0
}
fn default_english_in_url() -> f64 {
    20.0
}
fn default_bonus_list_hit() -> f64 {
    20.0
}
fn default_seed_list_hit() -> f64 {
    100_000.0
}
fn default_topic_in_anchor() -> f64 {
    10.0
}
fn default_english_in_anchor() -> f64 {
    5.0
}
fn default_topic_in_title() -> f64 {
    10.0
}
fn default_english_in_surrounding() -> f64 {
    5.0
}

/// §4.4 host-importance parameters (`ρ`'s shape constants plus the
/// page-rank weight/cap and the minimum-sample gate).
#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    pub importance_alpha: f64,
    pub importance_cap: f64,
    pub importance_theta: f64,
    pub importance_b_success: f64,
    pub importance_c_success: f64,
    pub importance_b_relevant: f64,
    pub importance_c_relevant: f64,
    pub importance_min_sample: i64,
    pub importance_below_threshold_penalty: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    pub ngram_min: usize,
    pub ngram_max: usize,
    pub field_weights: std::collections::HashMap<String, f64>,
    pub pagerank_max_iterations: usize,
    pub pagerank_damping: f64,
    #[serde(default)]
    pub pagerank_personalization: std::collections::HashMap<String, f64>,
}
