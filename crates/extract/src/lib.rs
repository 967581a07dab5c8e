//! Document entity & extractor (spec §4.2): HTML → structured text fields,
//! per-field token lists, and best-effort language detection. Never fails —
//! a parse error or missing field degrades to an empty field, never an
//! `Err`, matching the "deterministic, never fails" contract.

pub mod html;

use citysearch_core::tokenize::{humanize, tokenize, TokenizeOptions};
use citysearch_core::{Document, FIELDS};
use scraper::Html as ScraperHtml;
use url::Url;

pub use html::HarvestedLink;

/// Extract a `Document` (with `id`/`job_id`/`relevant` left at caller-filled
/// defaults) and the set of harvested outbound links from raw HTML.
///
/// `job_id`/`id` are 0 here; the caller (worker, or offline re-extraction)
/// fills them in once the storage layer has assigned identities.
pub fn extract_document(raw_html: &str, url: &Url, opts: &TokenizeOptions) -> (Document, Vec<HarvestedLink>) {
    let parsed = ScraperHtml::parse_document(raw_html);
    let fields = html::extract_fields(&parsed);
    let links = html::extract_links(&parsed, url, 200);

    let mut doc = Document {
        id: 0,
        job_id: 0,
        url: url.to_string(),
        html: raw_html.to_string(),
        relevant: false,
        ..Default::default()
    };

    doc.title = fields.title.as_deref().map(humanize);
    doc.meta_description = fields.meta_description.as_deref().map(humanize);
    doc.meta_keywords = fields.meta_keywords.as_deref().map(humanize);
    doc.meta_author = fields.meta_author.as_deref().map(humanize);
    doc.h1 = fields.h1.as_deref().map(humanize);
    doc.h2 = fields.h2.as_deref().map(humanize);
    doc.h3 = fields.h3.as_deref().map(humanize);
    doc.h4 = fields.h4.as_deref().map(humanize);
    doc.h5 = fields.h5.as_deref().map(humanize);
    doc.h6 = fields.h6.as_deref().map(humanize);
    doc.body = fields.body.as_deref().map(humanize);

    for field in FIELDS {
        let toks = doc
            .field_text(field)
            .map(|t| tokenize(t, opts))
            .unwrap_or_default();
        set_field_tokens(&mut doc, field, toks);
    }

    (doc, links)
}

fn set_field_tokens(doc: &mut Document, field: &str, toks: Vec<String>) {
    match field {
        "title" => doc.title_tokens = toks,
        "meta_description" => doc.meta_description_tokens = toks,
        "meta_keywords" => doc.meta_keywords_tokens = toks,
        "meta_author" => doc.meta_author_tokens = toks,
        "h1" => doc.h1_tokens = toks,
        "h2" => doc.h2_tokens = toks,
        "h3" => doc.h3_tokens = toks,
        "h4" => doc.h4_tokens = toks,
        "h5" => doc.h5_tokens = toks,
        "h6" => doc.h6_tokens = toks,
        "body" => doc.body_tokens = toks,
        other => panic!("unknown field: {other}"),
    }
}

/// Best-effort English-language detection for one raw text field. Returns
/// `None` when the field is empty or too short to classify confidently
/// (mirrors `whatlang`'s own "not reliable below a few characters" caveat).
pub fn detect_english_confidence(text: &str) -> Option<f64> {
    if text.trim().chars().count() < 8 {
        return None;
    }
    let info = whatlang::detect(text)?;
    if info.lang() == whatlang::Lang::Eng {
        Some(info.confidence())
    } else {
        Some(0.0)
    }
}

/// How many of the document's raw text fields whatlang assigns a distinct,
/// non-empty detected language. Used to pick between the single-language
/// and multi-language English-probability thresholds (spec §4.3).
pub fn distinct_languages_detected(doc: &Document) -> usize {
    let texts = [
        doc.title.as_deref(),
        doc.meta_description.as_deref(),
        doc.h1.as_deref(),
        doc.body.as_deref(),
    ];
    let mut langs: Vec<whatlang::Lang> = texts
        .iter()
        .filter_map(|t| *t)
        .filter(|t| t.trim().chars().count() >= 8)
        .filter_map(whatlang::detect)
        .map(|info| info.lang())
        .collect();
    langs.sort_by_key(|l| *l as usize);
    langs.dedup();
    langs.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_document_with_tokens() {
        let html = "<html><head><title>Welcome</title></head><body><p>Hello world, a lovely city to visit.</p></body></html>";
        let url = Url::parse("http://example.com/").unwrap();
        let opts = TokenizeOptions::default();
        let (doc, links) = extract_document(html, &url, &opts);
        assert_eq!(doc.title.as_deref(), Some("Welcome"));
        assert!(doc.body_tokens.iter().any(|t| t.starts_with("love")));
        assert!(links.is_empty());
    }

    #[test]
    fn never_fails_on_malformed_html() {
        let html = "<html><body><p>unterminated";
        let url = Url::parse("http://example.com/").unwrap();
        let (doc, _) = extract_document(html, &url, &TokenizeOptions::default());
        assert!(doc.body.is_some());
    }

    #[test]
    fn detects_english() {
        let conf = detect_english_confidence(
            "This is a long piece of English text about a lovely city and its history.",
        );
        assert!(conf.unwrap_or(0.0) > 0.0);
    }
}
