use anyhow::Result;
use citysearch_core::{SparseVector, TfidfRow, FIELDS};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::Storage;

#[derive(FromRow)]
struct TfidfDbRow {
    document_id: i64,
    title: Option<Json<SparseVector>>,
    meta_description: Option<Json<SparseVector>>,
    meta_keywords: Option<Json<SparseVector>>,
    meta_author: Option<Json<SparseVector>>,
    h1: Option<Json<SparseVector>>,
    h2: Option<Json<SparseVector>>,
    h3: Option<Json<SparseVector>>,
    h4: Option<Json<SparseVector>>,
    h5: Option<Json<SparseVector>>,
    h6: Option<Json<SparseVector>>,
    body: Option<Json<SparseVector>>,
}

impl From<TfidfDbRow> for TfidfRow {
    fn from(r: TfidfDbRow) -> Self {
        TfidfRow {
            document_id: r.document_id,
            title: r.title.map(|j| j.0),
            meta_description: r.meta_description.map(|j| j.0),
            meta_keywords: r.meta_keywords.map(|j| j.0),
            meta_author: r.meta_author.map(|j| j.0),
            h1: r.h1.map(|j| j.0),
            h2: r.h2.map(|j| j.0),
            h3: r.h3.map(|j| j.0),
            h4: r.h4.map(|j| j.0),
            h5: r.h5.map(|j| j.0),
            h6: r.h6.map(|j| j.0),
            body: r.body.map(|j| j.0),
        }
    }
}

const TFIDF_COLUMNS: &str =
    "document_id, title, meta_description, meta_keywords, meta_author, h1, h2, h3, h4, h5, h6, body";

impl Storage {
    /// Upsert one document's per-field TF-IDF vectors (§4.10). A `None`
    /// field means that field was empty for this document and has no
    /// stored vector, per spec.
    pub async fn upsert_tfidf_row(&self, row: &TfidfRow) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO tfidfs (document_id, title, meta_description, meta_keywords, meta_author, h1, h2, h3, h4, h5, h6, body)
               VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
               ON CONFLICT (document_id) DO UPDATE SET
                 title = EXCLUDED.title, meta_description = EXCLUDED.meta_description,
                 meta_keywords = EXCLUDED.meta_keywords, meta_author = EXCLUDED.meta_author,
                 h1 = EXCLUDED.h1, h2 = EXCLUDED.h2, h3 = EXCLUDED.h3, h4 = EXCLUDED.h4,
                 h5 = EXCLUDED.h5, h6 = EXCLUDED.h6, body = EXCLUDED.body"#,
        )
        .bind(row.document_id)
        .bind(row.title.clone().map(Json))
        .bind(row.meta_description.clone().map(Json))
        .bind(row.meta_keywords.clone().map(Json))
        .bind(row.meta_author.clone().map(Json))
        .bind(row.h1.clone().map(Json))
        .bind(row.h2.clone().map(Json))
        .bind(row.h3.clone().map(Json))
        .bind(row.h4.clone().map(Json))
        .bind(row.h5.clone().map(Json))
        .bind(row.h6.clone().map(Json))
        .bind(row.body.clone().map(Json))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_tfidf_row(&self, document_id: i64) -> Result<Option<TfidfRow>> {
        let row: Option<TfidfDbRow> = sqlx::query_as(&format!(
            "SELECT {TFIDF_COLUMNS} FROM tfidfs WHERE document_id = $1"
        ))
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get_tfidf_rows(&self, document_ids: &[i64]) -> Result<Vec<TfidfRow>> {
        let rows: Vec<TfidfDbRow> = sqlx::query_as(&format!(
            "SELECT {TFIDF_COLUMNS} FROM tfidfs WHERE document_id = ANY($1)"
        ))
        .bind(document_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// All of a row's non-null fields, for debugging/status only.
    pub fn populated_fields(row: &TfidfRow) -> Vec<&'static str> {
        FIELDS.iter().copied().filter(|f| row.field(f).is_some()).collect()
    }

    pub async fn tfidf_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tfidfs").fetch_one(&self.pool).await?;
        Ok(row.0)
    }
}
