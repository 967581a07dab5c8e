//! Per-field inverted index builder (spec §4.9, offline): maps each
//! field's tokens to the relevant documents that contain them, so the
//! ranker can shortlist candidates before scoring.

use std::collections::HashMap;

use anyhow::{bail, Result};
use citysearch_core::{Document, FIELDS};
use serde::{Deserialize, Serialize};

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InvertedIndex {
    schema_version: u32,
    /// field -> token -> sorted, deduplicated document ids.
    postings: HashMap<String, HashMap<String, Vec<i64>>>,
    pub indexed_document_ids: Vec<i64>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            postings: HashMap::new(),
            indexed_document_ids: Vec::new(),
        }
    }

    /// Builds a fresh index from every document passed in. Only documents
    /// marked `relevant` carry any weight downstream, but the builder
    /// indexes whatever it's given — callers filter before calling this
    /// (mirrors `stream_relevant_documents` in the storage crate).
    pub fn build(documents: &[Document]) -> Self {
        let mut index = Self::new();
        for doc in documents {
            index.index_document(doc);
        }
        index
    }

    fn index_document(&mut self, doc: &Document) {
        for &field in FIELDS {
            let field_postings = self.postings.entry(field.to_string()).or_default();
            for token in doc.field_tokens(field) {
                let ids = field_postings.entry(token.clone()).or_default();
                if ids.last() != Some(&doc.id) {
                    ids.push(doc.id);
                }
            }
        }
        self.indexed_document_ids.push(doc.id);
    }

    pub fn postings(&self, field: &str, token: &str) -> &[i64] {
        self.postings
            .get(field)
            .and_then(|m| m.get(token))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Union of document ids across all fields that contain `token`.
    pub fn documents_matching(&self, token: &str) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .postings
            .values()
            .filter_map(|m| m.get(token))
            .flatten()
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Union of document ids, within a single field, that contain any of
    /// `tokens` — the per-field `matches[field]` step of the fused ranker.
    pub fn field_matches(&self, field: &str, tokens: &[String]) -> Vec<i64> {
        let Some(field_postings) = self.postings.get(field) else {
            return Vec::new();
        };
        let mut ids: Vec<i64> = tokens
            .iter()
            .filter_map(|t| field_postings.get(t))
            .flatten()
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// The union of documents matching any of `tokens`, across any field.
    /// The candidate shortlist the ranker scores (spec §4.11).
    pub fn candidates(&self, tokens: &[String]) -> Vec<i64> {
        let mut ids: Vec<i64> = tokens
            .iter()
            .flat_map(|t| self.documents_matching(t))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn document_count(&self) -> usize {
        self.indexed_document_ids.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// A reader that encounters an unknown schema version refuses to load
    /// rather than guessing at a layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let index: Self = bincode::deserialize(bytes)?;
        if index.schema_version != SCHEMA_VERSION {
            bail!(
                "inverted index artifact has schema version {}, expected {}",
                index.schema_version,
                SCHEMA_VERSION
            );
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64, title_tokens: Vec<&str>, body_tokens: Vec<&str>) -> Document {
        Document {
            id,
            title_tokens: title_tokens.into_iter().map(String::from).collect(),
            body_tokens: body_tokens.into_iter().map(String::from).collect(),
            relevant: true,
            ..Default::default()
        }
    }

    #[test]
    fn indexes_tokens_per_field() {
        let docs = vec![
            doc(1, vec!["tuebingen", "guide"], vec!["castle"]),
            doc(2, vec!["stuttgart"], vec!["tuebingen", "castle"]),
        ];
        let index = InvertedIndex::build(&docs);
        assert_eq!(index.postings("title", "tuebingen"), &[1]);
        assert_eq!(index.postings("body", "castle"), &[1, 2]);
    }

    #[test]
    fn documents_matching_unions_across_fields() {
        let docs = vec![doc(1, vec!["tuebingen"], vec![]), doc(2, vec![], vec!["tuebingen"])];
        let index = InvertedIndex::build(&docs);
        assert_eq!(index.documents_matching("tuebingen"), vec![1, 2]);
    }

    #[test]
    fn field_matches_is_scoped_to_one_field() {
        let docs = vec![doc(1, vec!["tuebingen"], vec!["stuttgart"])];
        let index = InvertedIndex::build(&docs);
        assert_eq!(index.field_matches("title", &["stuttgart".to_string()]), Vec::<i64>::new());
        assert_eq!(index.field_matches("body", &["stuttgart".to_string()]), vec![1]);
    }

    #[test]
    fn candidates_unions_multiple_tokens() {
        let docs = vec![
            doc(1, vec!["tuebingen"], vec![]),
            doc(2, vec!["stuttgart"], vec![]),
            doc(3, vec!["unrelated"], vec![]),
        ];
        let index = InvertedIndex::build(&docs);
        let cands = index.candidates(&["tuebingen".to_string(), "stuttgart".to_string()]);
        assert_eq!(cands, vec![1, 2]);
    }

    #[test]
    fn repeated_tokens_in_one_document_dedup_postings() {
        let docs = vec![doc(1, vec!["castle", "castle"], vec![])];
        let index = InvertedIndex::build(&docs);
        assert_eq!(index.postings("title", "castle"), &[1]);
    }

    #[test]
    fn roundtrips_through_bytes() {
        let docs = vec![doc(1, vec!["tuebingen"], vec![])];
        let index = InvertedIndex::build(&docs);
        let bytes = index.to_bytes().unwrap();
        let loaded = InvertedIndex::from_bytes(&bytes).unwrap();
        assert_eq!(loaded.postings("title", "tuebingen"), &[1]);
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let mut index = InvertedIndex::new();
        index.schema_version = 999;
        let bytes = bincode::serialize(&index).unwrap();
        assert!(InvertedIndex::from_bytes(&bytes).is_err());
    }
}
