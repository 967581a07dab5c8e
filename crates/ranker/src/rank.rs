//! Fused ranking (spec §4.11 steps 2-5): pure scoring math with no I/O, so
//! it can be unit tested without a database or HTTP stack.

use std::collections::HashMap;

use citysearch_core::{TfidfRow, FIELDS};
use citysearch_invindex::InvertedIndex;
use citysearch_vectorspace::VectorSpaceModel;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedDocument {
    pub document_id: i64,
    pub score: f64,
}

/// Score every document that matches at least one query token in at least
/// one field, fusing per-field cosine similarity weighted by
/// `field_weights`. Documents with no matching token and no stored vector
/// in any field never appear in the output (spec §4.11 contract).
pub fn rank(
    query_tokens: &[String],
    index: &InvertedIndex,
    vectorspace: &VectorSpaceModel,
    tfidf_rows: &HashMap<i64, TfidfRow>,
    field_weights: &HashMap<String, f64>,
) -> Vec<RankedDocument> {
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let mut scores: HashMap<i64, f64> = HashMap::new();
    for &field in FIELDS {
        let Some(query_vector) = vectorspace.transform_query(field, query_tokens) else {
            continue;
        };
        let weight = field_weights.get(field).copied().unwrap_or(1.0);
        for doc_id in index.field_matches(field, query_tokens) {
            let Some(row) = tfidf_rows.get(&doc_id) else {
                continue;
            };
            let Some(doc_vector) = row.field(field) else {
                continue;
            };
            let cosine = query_vector.cosine(doc_vector);
            *scores.entry(doc_id).or_insert(0.0) += weight * cosine;
        }
    }

    let mut ranked: Vec<RankedDocument> = scores
        .into_iter()
        .map(|(document_id, score)| RankedDocument { document_id, score })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
    ranked
}

/// Slice out one page of already-sorted results. `page` is 1-indexed, to
/// match the `?page=` query parameter's natural meaning.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page_size == 0 {
        return &[];
    }
    let page = page.max(1);
    let start = (page - 1) * page_size;
    if start >= items.len() {
        return &[];
    }
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use citysearch_core::Document;

    fn doc(id: i64, title: Vec<&str>) -> Document {
        Document {
            id,
            title_tokens: title.into_iter().map(String::from).collect(),
            relevant: true,
            ..Default::default()
        }
    }

    fn weights() -> HashMap<String, f64> {
        let mut w = HashMap::new();
        w.insert("title".to_string(), 10.0);
        w.insert("body".to_string(), 1.0);
        w
    }

    #[test]
    fn ranks_documents_matching_query_first() {
        let docs = vec![
            doc(1, vec!["tuebingen", "castle"]),
            doc(2, vec!["unrelated", "topic"]),
        ];
        let index = InvertedIndex::build(&docs);
        let (vectorspace, rows) = VectorSpaceModel::fit_transform(&docs);
        let tfidf_rows: HashMap<i64, TfidfRow> = rows.into_iter().map(|r| (r.document_id, r)).collect();

        let ranked = rank(
            &["tuebingen".to_string()],
            &index,
            &vectorspace,
            &tfidf_rows,
            &weights(),
        );
        assert_eq!(ranked.first().unwrap().document_id, 1);
        assert!(ranked.iter().all(|r| r.document_id != 2));
    }

    #[test]
    fn empty_query_ranks_nothing() {
        let index = InvertedIndex::new();
        let vectorspace = VectorSpaceModel::default();
        let ranked = rank(&[], &index, &vectorspace, &HashMap::new(), &weights());
        assert!(ranked.is_empty());
    }

    #[test]
    fn ties_break_by_ascending_document_id() {
        let docs = vec![doc(2, vec!["tuebingen"]), doc(1, vec!["tuebingen"])];
        let index = InvertedIndex::build(&docs);
        let (vectorspace, rows) = VectorSpaceModel::fit_transform(&docs);
        let tfidf_rows: HashMap<i64, TfidfRow> = rows.into_iter().map(|r| (r.document_id, r)).collect();
        let ranked = rank(
            &["tuebingen".to_string()],
            &index,
            &vectorspace,
            &tfidf_rows,
            &weights(),
        );
        assert_eq!(ranked[0].document_id, 1);
        assert_eq!(ranked[1].document_id, 2);
    }

    #[test]
    fn paginate_slices_correctly() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(paginate(&items, 1, 2), &[1, 2]);
        assert_eq!(paginate(&items, 2, 2), &[3, 4]);
        assert_eq!(paginate(&items, 3, 2), &[5]);
        assert_eq!(paginate(&items, 4, 2), &[] as &[i32]);
    }
}
