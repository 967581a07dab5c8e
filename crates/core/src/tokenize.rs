//! Shared text normalization and tokenization pipeline.
//!
//! Every consumer (URL scoring, document extraction, TF-IDF fitting, and
//! query tokenization) must call the same pipeline so that a query token
//! and a document token are comparable.

use std::collections::HashSet;

/// Collapse whitespace runs and strip control characters; the first step
/// applied to any raw DOM text before tokenization.
pub fn humanize(text: &str) -> String {
    let unescaped = html_escape::decode_html_entities(text);
    let mut out = String::with_capacity(unescaped.len());
    let mut last_was_space = false;
    for ch in unescaped.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

fn strip_urls(text: &str) -> String {
    // A plain URL-ish run is dropped wholesale rather than tokenized.
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if word.starts_with("http://") || word.starts_with("https://") || word.starts_with("www.")
        {
            continue;
        }
        out.push_str(word);
        out.push(' ');
    }
    out
}

fn strip_emoji(text: &str) -> String {
    text.chars()
        .filter(|c| {
            let cp = *c as u32;
            !matches!(cp,
                0x1F300..=0x1FAFF | 0x2600..=0x27BF | 0x1F000..=0x1F2FF | 0x2190..=0x21FF)
        })
        .collect()
}

/// Fold German umlauts (and a couple of common mis-encodings of them) to
/// their ASCII equivalents.
fn fold_umlauts(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ä' | 'Ä' => 'a',
            'ö' | 'Ö' => 'o',
            'ü' | 'Ü' => 'u',
            'ß' => 's',
            other => other,
        })
        .collect::<String>()
        .replace("ã¼", "u")
        .replace("Ã¼", "u")
}

fn is_punct_or_symbol(c: char) -> bool {
    use unicode_general_category::{get_general_category, GeneralCategory as GC};
    matches!(
        get_general_category(c),
        GC::ConnectorPunctuation
            | GC::DashPunctuation
            | GC::OpenPunctuation
            | GC::ClosePunctuation
            | GC::InitialPunctuation
            | GC::FinalPunctuation
            | GC::OtherPunctuation
            | GC::MathSymbol
            | GC::CurrencySymbol
            | GC::ModifierSymbol
            | GC::OtherSymbol
            | GC::SpaceSeparator
            | GC::LineSeparator
            | GC::ParagraphSeparator
    )
}

fn strip_punctuation(token: &str) -> String {
    token.chars().filter(|c| !is_punct_or_symbol(*c)).collect()
}

/// A coarse, suffix-stripping approximation of lemmatization. No
/// general-purpose lemmatizer crate is in use anywhere in this workspace's
/// dependency stack, so rather than adding a heavyweight NLP dependency for
/// one step, common English inflectional suffixes are stripped directly.
fn approximate_lemma(token: &str) -> String {
    for suffix in ["ing", "edly", "ed", "ies", "es", "s"] {
        if token.len() > suffix.len() + 2 && token.ends_with(suffix) {
            return token[..token.len() - suffix.len()].to_string();
        }
    }
    token.to_string()
}

fn english_stopwords() -> &'static HashSet<&'static str> {
    static WORDS: std::sync::OnceLock<HashSet<&'static str>> = std::sync::OnceLock::new();
    WORDS.get_or_init(|| {
        const LIST: &[&str] = &[
            "a", "about", "above", "after", "again", "all", "am", "an", "and", "any", "are",
            "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
            "but", "by", "can", "did", "do", "does", "doing", "down", "during", "each", "few",
            "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
            "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is",
            "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor",
            "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours",
            "ourselves", "out", "over", "own", "same", "she", "should", "so", "some", "such",
            "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
            "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
            "very", "was", "we", "were", "what", "when", "where", "which", "while", "who",
            "whom", "why", "will", "with", "you", "your", "yours", "yourself", "yourselves",
        ];
        LIST.iter().copied().collect()
    })
}

/// Configuration knobs the tokenizer needs from `RelevanceConfig` without
/// depending on the whole config crate graph.
pub struct TokenizeOptions {
    pub long_word_threshold: usize,
    /// The canonical spelling every `topic_variant` below collapses onto,
    /// e.g. `"tubingen"`.
    pub topic_canonical: String,
    /// Spelling variants of the target topic word (`RelevanceConfig::
    /// topic_writing_styles`) that should be unified to `topic_canonical`.
    pub topic_variants: Vec<String>,
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self {
            long_word_threshold: 24,
            topic_canonical: String::new(),
            topic_variants: Vec::new(),
        }
    }
}

/// The canonical multi-pass pipeline: unescape/strip URLs/strip emoji,
/// split, lowercase, drop empties, fold umlauts, drop stopwords, drop
/// non-ASCII tokens that aren't detectably English/German, drop
/// punctuation, lemmatize, fold umlauts again, drop overlong tokens, drop
/// punctuation again. Deterministic given the same input and options.
pub fn tokenize(raw: &str, opts: &TokenizeOptions) -> Vec<String> {
    let cleaned = strip_emoji(&strip_urls(&humanize(raw)));

    let mut tokens: Vec<String> = cleaned
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty())
        .map(|w| fold_umlauts(&w))
        .filter(|w| !english_stopwords().contains(w.as_str()))
        .filter(|w| is_ascii_or_detectable(w))
        .map(|w| strip_punctuation(&w))
        .filter(|w| !w.is_empty())
        .map(|w| approximate_lemma(&w))
        .map(|w| fold_umlauts(&w))
        .filter(|w| w.chars().count() > 1 && w.chars().count() < opts.long_word_threshold)
        .map(|w| strip_punctuation(&w))
        .filter(|w| !w.is_empty())
        .collect();

    tokens
        .iter_mut()
        .for_each(|t| unify_spelling(t, &opts.topic_canonical, &opts.topic_variants));
    tokens
}

/// Keep ASCII tokens (including purely numeric ones) outright; for
/// non-ASCII tokens, keep them only if they look like real German or
/// English words rather than noise, via best-effort language detection.
fn is_ascii_or_detectable(word: &str) -> bool {
    if word.is_ascii() {
        return true;
    }
    match whatlang::detect(word) {
        Some(info) => matches!(info.lang(), whatlang::Lang::Eng | whatlang::Lang::Deu),
        None => false,
    }
}

/// Collapse common spelling variants of the target topic word onto one
/// canonical spelling so token matching and TF-IDF treat them as the same
/// term. The variant list itself is configured (`RelevanceConfig::
/// topic_writing_styles`); this is the mandatory last step of `tokenize`,
/// mirroring the original's unconditional `unify_tuebingen` pass.
fn unify_spelling(token: &mut String, canonical: &str, variants: &[String]) {
    if canonical.is_empty() {
        return;
    }
    for variant in variants {
        if !variant.is_empty() && token.contains(variant.as_str()) {
            *token = token.replace(variant.as_str(), canonical);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanize_collapses_whitespace() {
        assert_eq!(humanize("  hello\n\tworld  "), "hello world");
    }

    #[test]
    fn tokenize_drops_stopwords_and_punctuation() {
        let toks = tokenize("The quick, brown fox!", &TokenizeOptions::default());
        assert!(!toks.iter().any(|t| t == "the"));
        assert!(toks.iter().any(|t| t.starts_with("quick")));
    }

    #[test]
    fn tokenize_drops_overlong_tokens() {
        let long = "a".repeat(50);
        let input = format!("short {long} words");
        let toks = tokenize(&input, &TokenizeOptions::default());
        assert!(!toks.iter().any(|t| t.len() >= 24));
    }

    fn topic_opts() -> TokenizeOptions {
        TokenizeOptions {
            long_word_threshold: 24,
            topic_canonical: "tubingen".to_string(),
            topic_variants: vec!["tuebingen".to_string(), "tubingen".to_string()],
        }
    }

    #[test]
    fn tokenize_unifies_topic_spelling_variants() {
        let opts = topic_opts();
        assert_eq!(tokenize("Tuebingen", &opts), tokenize("Tubingen", &opts));
        assert_eq!(tokenize("Tuebingen", &opts), tokenize("Tübingen", &opts));
        assert!(tokenize("Tuebingen", &opts).iter().any(|t| t == "tubingen"));
    }

    #[test]
    fn tokenize_without_topic_config_leaves_variants_distinct() {
        let opts = TokenizeOptions::default();
        assert_ne!(tokenize("Tuebingen", &opts), tokenize("Tubingen", &opts));
    }

    #[test]
    fn tokenize_is_deterministic() {
        let opts = TokenizeOptions::default();
        assert_eq!(
            tokenize("Tübingen is a lovely city", &opts),
            tokenize("Tübingen is a lovely city", &opts)
        );
    }
}
