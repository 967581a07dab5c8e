//! DOM-level extraction: field text and outbound links from parsed HTML.
//!
//! Kept deliberately thin — `scraper` does the actual parsing/selecting;
//! this module only knows which selectors map to which document field and
//! how to harvest a link's anchor/surrounding/title context.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Raw (pre-tokenize, pre-humanize) field text pulled straight out of the DOM.
#[derive(Debug, Default)]
pub struct RawFields {
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
}

/// A link harvested from the document, with its link context.
#[derive(Debug, Clone)]
pub struct HarvestedLink {
    pub url: String,
    pub anchor_text: String,
    pub surrounding_text: String,
}

fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

fn joined_text(doc: &Html, sel: &str) -> Option<String> {
    let s = selector(sel)?;
    let joined = doc
        .select(&s)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(" ");
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn meta_content(doc: &Html, name: &str) -> Option<String> {
    let sel = selector(&format!("meta[name='{name}']"))?;
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty())
}

/// Extract the per-field text that feeds §3/§4.2's full
/// `title, meta_*, h1..h6, body` field set.
pub fn extract_fields(doc: &Html) -> RawFields {
    RawFields {
        title: selector("title")
            .and_then(|s| doc.select(&s).next())
            .map(|el| el.text().collect::<String>())
            .filter(|s| !s.trim().is_empty()),
        meta_description: meta_content(doc, "description"),
        meta_keywords: meta_content(doc, "keywords"),
        meta_author: meta_content(doc, "author"),
        h1: joined_text(doc, "h1"),
        h2: joined_text(doc, "h2"),
        h3: joined_text(doc, "h3"),
        h4: joined_text(doc, "h4"),
        h5: joined_text(doc, "h5"),
        h6: joined_text(doc, "h6"),
        body: selector("body")
            .and_then(|s| doc.select(&s).next())
            .map(|el| el.text().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.trim().is_empty()),
    }
}

/// Harvest outbound `<a href>` links with their anchor text and a window of
/// `context_chars` characters of surrounding body text on each side.
pub fn extract_links(doc: &Html, base_url: &Url, context_chars: usize) -> Vec<HarvestedLink> {
    let Some(sel) = selector("a[href]") else {
        return Vec::new();
    };
    let body_text = selector("body")
        .and_then(|s| doc.select(&s).next())
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    doc.select(&sel)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            if href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
                || href.starts_with("data:")
            {
                return None;
            }
            let resolved = base_url.join(href).ok()?;
            let anchor_text: String = el.text().collect::<String>().trim().to_string();
            let surrounding_text = surrounding_window(&body_text, &anchor_text, context_chars, el);
            Some(HarvestedLink {
                url: resolved.to_string(),
                anchor_text,
                surrounding_text,
            })
        })
        .collect()
}

/// Best-effort: locate the anchor text inside the full body text and take
/// `context_chars` characters on either side. Falls back to the anchor's
/// immediate parent text when the anchor text can't be located (e.g. empty
/// anchor, or the text occurs only as part of the anchor itself).
fn surrounding_window(
    body_text: &str,
    anchor_text: &str,
    context_chars: usize,
    el: ElementRef,
) -> String {
    if !anchor_text.is_empty() {
        if let Some(pos) = body_text.find(anchor_text) {
            let raw_start = pos.saturating_sub(context_chars);
            let raw_end = (pos + anchor_text.len() + context_chars).min(body_text.len());
            let start = (0..=raw_start).rev().find(|&i| body_text.is_char_boundary(i)).unwrap_or(0);
            let end = (raw_end..=body_text.len())
                .find(|&i| body_text.is_char_boundary(i))
                .unwrap_or(body_text.len());
            return body_text[start..end].to_string();
        }
    }
    el.parent()
        .and_then(ElementRef::wrap)
        .map(|p| p.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_body() {
        let html = Html::parse_document(
            "<html><head><title>Hi</title></head><body><h1>Hello</h1><p>World</p></body></html>",
        );
        let fields = extract_fields(&html);
        assert_eq!(fields.title.as_deref(), Some("Hi"));
        assert_eq!(fields.h1.as_deref(), Some("Hello"));
        assert!(fields.body.unwrap().contains("World"));
    }

    #[test]
    fn harvests_links_with_anchor_text() {
        let html = Html::parse_document(
            r#"<html><body><p>see <a href="/x">our page</a> for more</p></body></html>"#,
        );
        let base = Url::parse("http://example.com/").unwrap();
        let links = extract_links(&html, &base, 10);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "http://example.com/x");
        assert_eq!(links[0].anchor_text, "our page");
    }
}
