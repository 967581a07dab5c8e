//! Per-field TF-IDF vector space builder (spec §4.10, offline). Fits one
//! vocabulary + IDF table per field over the relevant document corpus,
//! then transforms each document (and, at query time, the query itself)
//! into `SparseVector`s in that space.
//!
//! No TF-IDF crate appears anywhere in the retrieved corpus, so this is
//! hand-rolled the way the rest of the text pipeline is: plain `HashMap`
//! tables and a small amount of arithmetic.

use std::collections::HashMap;

use anyhow::{bail, Result};
use citysearch_core::{Document, SparseVector, TfidfRow, FIELDS};
use serde::{Deserialize, Serialize};

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct FieldVectorizer {
    /// token -> column index in this field's space.
    vocabulary: HashMap<String, u32>,
    /// idf[column index], aligned with `vocabulary`.
    idf: Vec<f64>,
}

impl FieldVectorizer {
    fn fit(token_lists: &[&[String]]) -> Self {
        let mut document_frequency: HashMap<&str, u32> = HashMap::new();
        for tokens in token_lists {
            let mut seen = std::collections::HashSet::new();
            for t in tokens.iter() {
                if seen.insert(t.as_str()) {
                    *document_frequency.entry(t.as_str()).or_insert(0) += 1;
                }
            }
        }
        let n_docs = token_lists.len() as f64;
        let mut vocabulary = HashMap::new();
        let mut idf = Vec::new();
        let mut terms: Vec<&str> = document_frequency.keys().copied().collect();
        terms.sort_unstable();
        for term in terms {
            let df = document_frequency[term] as f64;
            // smoothed idf, never negative or undefined even for df == n_docs.
            let weight = (n_docs / (1.0 + df)).ln() + 1.0;
            vocabulary.insert(term.to_string(), idf.len() as u32);
            idf.push(weight);
        }
        Self { vocabulary, idf }
    }

    fn transform(&self, tokens: &[String]) -> Option<SparseVector> {
        if tokens.is_empty() || self.vocabulary.is_empty() {
            return None;
        }
        let mut term_freq: HashMap<u32, f64> = HashMap::new();
        for t in tokens {
            if let Some(&col) = self.vocabulary.get(t) {
                *term_freq.entry(col).or_insert(0.0) += 1.0;
            }
        }
        if term_freq.is_empty() {
            return None;
        }
        let mut entries: Vec<(u32, f64)> = term_freq
            .into_iter()
            .map(|(col, tf)| (col, tf * self.idf[col as usize]))
            .collect();
        entries.sort_unstable_by_key(|(col, _)| *col);
        let (indices, values): (Vec<u32>, Vec<f64>) = entries.into_iter().unzip();
        Some(SparseVector {
            indices,
            values,
            dim: self.vocabulary.len() as u32,
        })
    }
}

/// A fitted per-field vector space, ready to transform documents or
/// queries into `SparseVector`s.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VectorSpaceModel {
    schema_version: u32,
    fields: HashMap<String, FieldVectorizer>,
}

impl VectorSpaceModel {
    /// Fit one vectorizer per field over the full document corpus.
    pub fn fit(documents: &[Document]) -> Self {
        let mut fields = HashMap::new();
        for &field in FIELDS {
            let token_lists: Vec<&[String]> = documents.iter().map(|d| d.field_tokens(field)).collect();
            fields.insert(field.to_string(), FieldVectorizer::fit(&token_lists));
        }
        Self {
            schema_version: SCHEMA_VERSION,
            fields,
        }
    }

    pub fn transform_document(&self, doc: &Document) -> TfidfRow {
        let mut row = TfidfRow {
            document_id: doc.id,
            ..Default::default()
        };
        for &field in FIELDS {
            let vec = self
                .fields
                .get(field)
                .and_then(|v| v.transform(doc.field_tokens(field)));
            row.set_field(field, vec);
        }
        row
    }

    pub fn fit_transform(documents: &[Document]) -> (Self, Vec<TfidfRow>) {
        let model = Self::fit(documents);
        let rows = documents.iter().map(|d| model.transform_document(d)).collect();
        (model, rows)
    }

    /// Maps query tokens into one field's space, for scoring against that
    /// field's stored document vectors (spec §4.11).
    pub fn transform_query(&self, field: &str, tokens: &[String]) -> Option<SparseVector> {
        self.fields.get(field).and_then(|v| v.transform(tokens))
    }

    pub fn vocabulary_size(&self, field: &str) -> usize {
        self.fields.get(field).map(|v| v.vocabulary.len()).unwrap_or(0)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let model: Self = bincode::deserialize(bytes)?;
        if model.schema_version != SCHEMA_VERSION {
            bail!(
                "vector space model artifact has schema version {}, expected {}",
                model.schema_version,
                SCHEMA_VERSION
            );
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64, title: Vec<&str>, body: Vec<&str>) -> Document {
        Document {
            id,
            title_tokens: title.into_iter().map(String::from).collect(),
            body_tokens: body.into_iter().map(String::from).collect(),
            relevant: true,
            ..Default::default()
        }
    }

    #[test]
    fn fits_vocabulary_per_field() {
        let docs = vec![
            doc(1, vec!["tuebingen", "guide"], vec![]),
            doc(2, vec!["tuebingen"], vec![]),
        ];
        let model = VectorSpaceModel::fit(&docs);
        assert_eq!(model.vocabulary_size("title"), 2);
        assert_eq!(model.vocabulary_size("body"), 0);
    }

    #[test]
    fn rare_terms_get_higher_idf_than_common_terms() {
        let docs = vec![
            doc(1, vec!["tuebingen", "rare"], vec![]),
            doc(2, vec!["tuebingen"], vec![]),
            doc(3, vec!["tuebingen"], vec![]),
        ];
        let model = VectorSpaceModel::fit(&docs);
        let v1 = model.transform_document(&docs[0]);
        let title = v1.title.unwrap();
        let common_idx = model.fields["title"].vocabulary["tuebingen"];
        let rare_idx = model.fields["title"].vocabulary["rare"];
        let common_weight = title.values[title.indices.iter().position(|&i| i == common_idx).unwrap()];
        let rare_weight = title.values[title.indices.iter().position(|&i| i == rare_idx).unwrap()];
        assert!(rare_weight > common_weight);
    }

    #[test]
    fn empty_field_produces_no_vector() {
        let docs = vec![doc(1, vec!["tuebingen"], vec![])];
        let model = VectorSpaceModel::fit(&docs);
        let row = model.transform_document(&docs[0]);
        assert!(row.body.is_none());
    }

    #[test]
    fn query_transforms_into_same_space_as_documents() {
        let docs = vec![doc(1, vec!["tuebingen", "castle"], vec![])];
        let model = VectorSpaceModel::fit(&docs);
        let doc_vec = model.transform_document(&docs[0]).title.unwrap();
        let query_vec = model
            .transform_query("title", &["tuebingen".to_string()])
            .unwrap();
        assert!(doc_vec.cosine(&query_vec) > 0.0);
    }

    #[test]
    fn roundtrips_through_bytes() {
        let docs = vec![doc(1, vec!["tuebingen"], vec![])];
        let (model, _) = VectorSpaceModel::fit_transform(&docs);
        let bytes = model.to_bytes().unwrap();
        let loaded = VectorSpaceModel::from_bytes(&bytes).unwrap();
        assert_eq!(loaded.vocabulary_size("title"), 1);
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let mut model = VectorSpaceModel::default();
        model.schema_version = 999;
        let bytes = bincode::serialize(&model).unwrap();
        assert!(VectorSpaceModel::from_bytes(&bytes).is_err());
    }
}
