//! URL entity and scorer: canonicalize a URL and derive the scalar
//! priority that drives the frontier.

use citysearch_core::config::{RelevanceConfig, UrlScoreConfig};
use citysearch_core::tokenize::{tokenize, TokenizeOptions};
use citysearch_core::SearchError;
use url::Url;

/// Default set of extensions treated as non-HTML media. Configurable via
/// `RelevanceConfig::media_extensions`; this is only the fallback used by
/// tests and the default config file.
pub const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "svg", "webp", "bmp", "ico", "mp3", "mp4", "avi", "mov", "wmv",
    "flv", "mkv", "pdf", "zip", "gz", "tar", "rar", "exe", "dmg", "css", "js", "woff", "woff2",
    "ttf", "eot",
];

/// Normalize a URL: lower-case scheme/host, resolve relative to an
/// optional parent, strip the fragment. Fails with `MalformedUrl` when the
/// result is not an absolute http(s) URL.
///
/// Idempotent: `normalize(normalize(u)) == normalize(u)`.
pub fn normalize(raw: &str, parent: Option<&Url>) -> Result<Url, SearchError> {
    let parsed = match parent {
        Some(base) => base
            .join(raw)
            .map_err(|e| SearchError::MalformedUrl(format!("{raw}: {e}")))?,
        None => Url::parse(raw).map_err(|e| SearchError::MalformedUrl(format!("{raw}: {e}")))?,
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(SearchError::MalformedUrl(format!(
            "unsupported scheme: {raw}"
        )));
    }
    if parsed.host_str().is_none() {
        return Err(SearchError::MalformedUrl(format!("no host: {raw}")));
    }

    let mut normalized = parsed;
    normalized.set_fragment(None);
    let lower_host = normalized.host_str().unwrap().to_lowercase();
    normalized
        .set_host(Some(&lower_host))
        .map_err(|e| SearchError::MalformedUrl(e.to_string()))?;
    Ok(normalized)
}

/// The registered domain (host with a leading `www.` stripped). A real
/// public-suffix-aware registered-domain computation is out of scope here
/// (the crate has no `publicsuffix`-style dependency); stripping `www.`
/// matches what the source system actually does for server naming.
pub fn server_name(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UrlForm {
    pub is_http_like: bool,
    pub is_hyperlink: bool,
    pub is_html_site: bool,
}

pub fn classify_form(url: &Url, media_extensions: &[String]) -> UrlForm {
    let is_http_like = url.scheme() == "http" || url.scheme() == "https";
    let is_hyperlink = is_http_like && url.host_str().is_some();
    let ext = url
        .path_segments()
        .and_then(|mut segs| segs.next_back())
        .and_then(|last| last.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase());
    let is_html_site = match ext {
        Some(ext) => !media_extensions.iter().any(|m| m == &ext),
        None => true,
    };
    UrlForm {
        is_http_like,
        is_hyperlink,
        is_html_site,
    }
}

pub fn contains_blocked_pattern(url: &Url, blocked_patterns: &[String]) -> bool {
    let s = url.as_str();
    blocked_patterns.iter().any(|p| s.contains(p.as_str()))
}

fn contains_any(patterns: &[String], s: &str) -> bool {
    patterns.iter().any(|p| s.contains(p.as_str()))
}

fn count_any(patterns: &[String], tokens: &[String]) -> usize {
    tokens
        .iter()
        .filter(|t| patterns.iter().any(|p| t.contains(p.as_str())))
        .count()
}

/// Linguistic features of a URL in its link context, computed once and
/// memoized on the owning `ScoredUrl`.
#[derive(Debug, Clone, Default)]
pub struct UrlFeatures {
    pub server_name: String,
    pub path_tokens: Vec<String>,
    pub anchor_tokens: Vec<String>,
    pub surrounding_tokens: Vec<String>,
    pub title_tokens: Vec<String>,
}

/// Everything needed to compute a URL's priority: the URL itself plus its
/// link context (anchor text, surrounding text, the title of the
/// enclosing document). Features are cached on first access.
pub struct ScoredUrl {
    pub url: Url,
    pub anchor_text: String,
    pub surrounding_text: String,
    pub title_text: String,
    features: std::cell::OnceCell<UrlFeatures>,
}

impl ScoredUrl {
    pub fn new(url: Url, anchor_text: String, surrounding_text: String, title_text: String) -> Self {
        Self {
            url,
            anchor_text,
            surrounding_text,
            title_text,
            features: std::cell::OnceCell::new(),
        }
    }

    pub fn features(&self, opts: &TokenizeOptions) -> &UrlFeatures {
        self.features.get_or_init(|| UrlFeatures {
            server_name: server_name(&self.url),
            path_tokens: tokenize(self.url.path(), opts),
            anchor_tokens: tokenize(&self.anchor_text, opts),
            surrounding_tokens: tokenize(&self.surrounding_text, opts),
            title_tokens: tokenize(&self.title_text, opts),
        })
    }
}

/// The black-box URL relevance model. Returns a value the contract treats
/// as roughly `{0, 1}` — out of scope per spec, pluggable so the system
/// runs without a trained model artifact.
pub trait UrlClassifier: Send + Sync {
    fn score(&self, features: &UrlFeatures) -> f64;
}

/// Rule-based default: real content if the host/path aren't obviously
/// blocked and at least look like prose rather than an asset path. This is
/// what ships when no trained classifier is configured.
pub struct RuleBasedUrlClassifier;

impl UrlClassifier for RuleBasedUrlClassifier {
    fn score(&self, features: &UrlFeatures) -> f64 {
        if features.path_tokens.is_empty() && features.anchor_tokens.is_empty() {
            0.5
        } else {
            1.0
        }
    }
}

/// Weights for the rule bonuses §4.1 permits beyond the ML score, mirroring
/// the point weights the source topic-relevance model used for its own
/// bonus terms.
pub struct RuleBonusWeights {
    pub topic_in_url: f64,
    pub english_in_url: f64,
    pub bonus_list_hit: f64,
    pub seed_list_hit: f64,
    pub topic_in_anchor: f64,
    pub english_in_anchor: f64,
    pub topic_in_title: f64,
    pub english_in_surrounding: f64,
}

impl Default for RuleBonusWeights {
    fn default() -> Self {
        Self {
            topic_in_url: 5.0,
            english_in_url: 20.0,
            bonus_list_hit: 20.0,
            seed_list_hit: 100_000.0,
            topic_in_anchor: 10.0,
            english_in_anchor: 5.0,
            topic_in_title: 10.0,
            english_in_surrounding: 5.0,
        }
    }
}

/// Compute the §4.1 priority: -1 if blocked/non-html/non-hyperlink, else
/// `30 * ML(features)` plus rule bonuses for topic/English indicators and
/// seed/bonus-list membership.
#[allow(clippy::too_many_arguments)]
pub fn priority(
    scored: &ScoredUrl,
    opts: &TokenizeOptions,
    classifier: &dyn UrlClassifier,
    media_extensions: &[String],
    blocked_patterns: &[String],
    bonus_patterns: &[String],
    seed_patterns: &[String],
    topic_variants: &[String],
    english_indicators: &[String],
    weights: &RuleBonusWeights,
) -> f64 {
    let form = classify_form(&scored.url, media_extensions);
    if contains_blocked_pattern(&scored.url, blocked_patterns) {
        return -1.0;
    }
    if !form.is_html_site || !form.is_hyperlink {
        return -1.0;
    }

    let features = scored.features(opts);
    let ml = classifier.score(features);
    let mut score = 30.0 * ml;

    score += weights.topic_in_url * count_any(topic_variants, &features.path_tokens) as f64;
    score += weights.english_in_url * count_any(english_indicators, &features.path_tokens) as f64;
    score += weights.topic_in_anchor * count_any(topic_variants, &features.anchor_tokens) as f64;
    score += weights.english_in_anchor
        * count_any(english_indicators, &features.anchor_tokens) as f64;
    score += weights.topic_in_title * count_any(topic_variants, &features.title_tokens) as f64;
    score += weights.english_in_surrounding
        * count_any(english_indicators, &features.surrounding_tokens) as f64;

    if contains_any(bonus_patterns, scored.url.as_str()) {
        score += weights.bonus_list_hit;
    }
    if contains_any(seed_patterns, scored.url.as_str()) {
        score += weights.seed_list_hit;
    }

    score
}

pub fn is_relevant(priority: f64) -> bool {
    priority >= 0.0
}

/// Convenience wrapper over [`priority`] that reads every pattern list and
/// bonus weight straight out of config, the shape callers in `classify`,
/// `master` and `worker` actually have on hand.
pub fn priority_from_config(
    scored: &ScoredUrl,
    opts: &TokenizeOptions,
    classifier: &dyn UrlClassifier,
    relevance: &RelevanceConfig,
    urlscore: &UrlScoreConfig,
) -> f64 {
    let weights = RuleBonusWeights {
        topic_in_url: urlscore.topic_in_url,
        english_in_url: urlscore.english_in_url,
        bonus_list_hit: urlscore.bonus_list_hit,
        seed_list_hit: urlscore.seed_list_hit,
        topic_in_anchor: urlscore.topic_in_anchor,
        english_in_anchor: urlscore.english_in_anchor,
        topic_in_title: urlscore.topic_in_title,
        english_in_surrounding: urlscore.english_in_surrounding,
    };
    priority(
        scored,
        opts,
        classifier,
        &relevance.media_extensions,
        &relevance.blocked_patterns,
        &relevance.bonus_patterns,
        &urlscore.seed_patterns,
        &relevance.topic_writing_styles,
        &urlscore.english_indicators,
        &weights,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_fragment_and_lowercases_host() {
        let n = normalize("HTTP://Example.com/path#frag", None).unwrap();
        assert_eq!(n.as_str(), "http://example.com/path");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize("http://Example.com/path#x", None).unwrap();
        let twice = normalize(once.as_str(), None).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn blocked_pattern_forces_negative_priority() {
        let url = Url::parse("http://example.com/logout?next=/x").unwrap();
        let scored = ScoredUrl::new(url, String::new(), String::new(), String::new());
        let opts = TokenizeOptions::default();
        let p = priority(
            &scored,
            &opts,
            &RuleBasedUrlClassifier,
            &[],
            &["/logout".to_string()],
            &[],
            &[],
            &[],
            &[],
            &RuleBonusWeights::default(),
        );
        assert_eq!(p, -1.0);
    }

    #[test]
    fn server_name_strips_www() {
        let url = Url::parse("http://www.example.com/").unwrap();
        assert_eq!(server_name(&url), "example.com");
    }

    fn test_relevance_config() -> RelevanceConfig {
        RelevanceConfig {
            english_probability_threshold: 0.5,
            english_probability_threshold_multilang: 0.7,
            topic_writing_styles: vec!["tuebingen".to_string()],
            topic_canonical_spelling: "tubingen".to_string(),
            blocked_patterns: vec!["/logout".to_string()],
            always_keep_patterns: vec![],
            bonus_patterns: vec![],
            media_extensions: vec![],
            long_word_threshold: 24,
        }
    }

    fn test_urlscore_config() -> UrlScoreConfig {
        UrlScoreConfig {
            english_indicators: vec!["english".to_string()],
            seed_patterns: vec![],
            topic_in_url: 5.0,
            english_in_url: 20.0,
            bonus_list_hit: 20.0,
            seed_list_hit: 100_000.0,
            topic_in_anchor: 10.0,
            english_in_anchor: 5.0,
            topic_in_title: 10.0,
            english_in_surrounding: 5.0,
        }
    }

    #[test]
    fn priority_from_config_matches_direct_call() {
        let url = Url::parse("http://example.com/tuebingen-guide").unwrap();
        let scored = ScoredUrl::new(url, String::new(), String::new(), String::new());
        let opts = TokenizeOptions::default();
        let p = priority_from_config(
            &scored,
            &opts,
            &RuleBasedUrlClassifier,
            &test_relevance_config(),
            &test_urlscore_config(),
        );
        assert!(p > 0.0);
    }

    #[test]
    fn priority_from_config_respects_blocked_patterns() {
        let url = Url::parse("http://example.com/logout").unwrap();
        let scored = ScoredUrl::new(url, String::new(), String::new(), String::new());
        let opts = TokenizeOptions::default();
        let p = priority_from_config(
            &scored,
            &opts,
            &RuleBasedUrlClassifier,
            &test_relevance_config(),
            &test_urlscore_config(),
        );
        assert_eq!(p, -1.0);
    }
}
