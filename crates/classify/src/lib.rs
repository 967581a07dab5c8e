//! Relevance classifiers (spec §4.3).
//!
//! URL relevance is `citysearch_urlscore::is_relevant(priority)` — nothing
//! more to add here. Document relevance is the gate that decides whether a
//! fetched, extracted `Document` gets `relevant = true` and therefore feeds
//! the index/TF-IDF/ranking pipeline and spawns follow-up jobs.

use citysearch_core::config::RelevanceConfig;
use citysearch_core::{Document, FIELDS};
use citysearch_extract::{detect_english_confidence, distinct_languages_detected};
use url::Url;

pub use citysearch_urlscore::is_relevant as is_url_relevant;

fn contains_any(patterns: &[String], haystack: &str) -> bool {
    patterns.iter().any(|p| haystack.contains(p.as_str()))
}

/// True iff the raw HTML or any token field contains a configured spelling
/// variant of the target topic.
fn contains_topic_variant(doc: &Document, cfg: &RelevanceConfig) -> bool {
    if contains_any(&cfg.topic_writing_styles, &doc.html) {
        return true;
    }
    FIELDS.iter().any(|field| {
        doc.field_tokens(field)
            .iter()
            .any(|tok| cfg.topic_writing_styles.iter().any(|v| tok.contains(v.as_str())))
    })
}

/// Best-effort "does this document contain English content" check across
/// title/meta/body, honoring the single- vs multi-language threshold split
/// spec §4.3(2) calls for.
fn has_english_content(doc: &Document, cfg: &RelevanceConfig) -> bool {
    let threshold = if distinct_languages_detected(doc) > 1 {
        cfg.english_probability_threshold_multilang
    } else {
        cfg.english_probability_threshold
    };

    let candidates = [
        doc.title.as_deref(),
        doc.meta_description.as_deref(),
        doc.h1.as_deref(),
        doc.body.as_deref(),
    ];
    candidates
        .iter()
        .filter_map(|t| *t)
        .filter_map(detect_english_confidence)
        .any(|conf| conf >= threshold)
}

/// Decide `Document.relevant` per spec §4.3: a blocked-pattern source URL
/// is never relevant, full stop; the always-keep list only bypasses the
/// language/topic checks (2)-(3), not the blocked-pattern check (1).
pub fn is_document_relevant(url: &Url, doc: &Document, cfg: &RelevanceConfig) -> bool {
    if citysearch_urlscore::contains_blocked_pattern(url, &cfg.blocked_patterns) {
        return false;
    }
    if contains_any(&cfg.always_keep_patterns, url.as_str()) {
        return true;
    }
    has_english_content(doc, cfg) && contains_topic_variant(doc, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use citysearch_core::tokenize::{tokenize, TokenizeOptions};

    fn cfg() -> RelevanceConfig {
        RelevanceConfig {
            english_probability_threshold: 0.5,
            english_probability_threshold_multilang: 0.7,
            topic_writing_styles: vec!["tuebingen".into(), "tubingen".into()],
            topic_canonical_spelling: "tubingen".into(),
            blocked_patterns: vec!["/logout".into()],
            always_keep_patterns: vec!["/always-keep/".into()],
            bonus_patterns: vec![],
            media_extensions: vec![],
            long_word_threshold: 24,
        }
    }

    fn doc_with_body(body: &str) -> Document {
        let opts = TokenizeOptions::default();
        let mut d = Document {
            body: Some(body.to_string()),
            html: body.to_string(),
            ..Default::default()
        };
        d.body_tokens = tokenize(body, &opts);
        d
    }

    #[test]
    fn blocked_url_never_relevant() {
        let url = Url::parse("http://example.com/logout?x=1").unwrap();
        let doc = doc_with_body("Tuebingen is a lovely English city to visit and explore today.");
        assert!(!is_document_relevant(&url, &doc, &cfg()));
    }

    #[test]
    fn always_keep_bypasses_checks() {
        let url = Url::parse("http://example.com/always-keep/x").unwrap();
        let doc = doc_with_body("");
        assert!(is_document_relevant(&url, &doc, &cfg()));
    }

    #[test]
    fn blocked_pattern_overrides_always_keep() {
        let url = Url::parse("http://example.com/always-keep/logout").unwrap();
        let doc = doc_with_body("Tuebingen is a lovely English city to visit and explore today.");
        assert!(!is_document_relevant(&url, &doc, &cfg()));
    }

    #[test]
    fn requires_english_and_topic() {
        let url = Url::parse("http://example.com/page").unwrap();
        let english_no_topic = doc_with_body(
            "This is a long piece of plain English text about nothing in particular at all.",
        );
        assert!(!is_document_relevant(&url, &english_no_topic, &cfg()));

        let both = doc_with_body(
            "Tuebingen is a lovely English city with a long and storied history worth visiting.",
        );
        assert!(is_document_relevant(&url, &both, &cfg()));
    }
}
