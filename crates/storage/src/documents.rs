use anyhow::Result;
use citysearch_core::Document;
use sqlx::FromRow;

use crate::Storage;

#[derive(FromRow)]
struct DocumentRow {
    id: i64,
    job_id: i64,
    url: String,
    html: String,
    title: Option<String>,
    meta_description: Option<String>,
    meta_keywords: Option<String>,
    meta_author: Option<String>,
    h1: Option<String>,
    h2: Option<String>,
    h3: Option<String>,
    h4: Option<String>,
    h5: Option<String>,
    h6: Option<String>,
    body: Option<String>,
    title_tokens: Vec<String>,
    meta_description_tokens: Vec<String>,
    meta_keywords_tokens: Vec<String>,
    meta_author_tokens: Vec<String>,
    h1_tokens: Vec<String>,
    h2_tokens: Vec<String>,
    h3_tokens: Vec<String>,
    h4_tokens: Vec<String>,
    h5_tokens: Vec<String>,
    h6_tokens: Vec<String>,
    body_tokens: Vec<String>,
    relevant: bool,
}

const DOCUMENT_COLUMNS: &str = "id, job_id, url, html, title, meta_description, meta_keywords, meta_author, h1, h2, h3, h4, h5, h6, body, title_tokens, meta_description_tokens, meta_keywords_tokens, meta_author_tokens, h1_tokens, h2_tokens, h3_tokens, h4_tokens, h5_tokens, h6_tokens, body_tokens, relevant";

impl From<DocumentRow> for Document {
    fn from(r: DocumentRow) -> Self {
        Document {
            id: r.id,
            job_id: r.job_id,
            url: r.url,
            html: r.html,
            title: r.title,
            meta_description: r.meta_description,
            meta_keywords: r.meta_keywords,
            meta_author: r.meta_author,
            h1: r.h1,
            h2: r.h2,
            h3: r.h3,
            h4: r.h4,
            h5: r.h5,
            h6: r.h6,
            body: r.body,
            title_tokens: r.title_tokens,
            meta_description_tokens: r.meta_description_tokens,
            meta_keywords_tokens: r.meta_keywords_tokens,
            meta_author_tokens: r.meta_author_tokens,
            h1_tokens: r.h1_tokens,
            h2_tokens: r.h2_tokens,
            h3_tokens: r.h3_tokens,
            h4_tokens: r.h4_tokens,
            h5_tokens: r.h5_tokens,
            h6_tokens: r.h6_tokens,
            body_tokens: r.body_tokens,
            relevant: r.relevant,
        }
    }
}

impl Storage {
    /// Insert a document for a job that was just successfully fetched.
    /// `ON CONFLICT (job_id) DO NOTHING` makes a repeated ingest for the
    /// same job idempotent-ish per spec §5: "the second insert is either
    /// ignored or produces a duplicate" — we choose "ignored".
    pub async fn insert_document(&self, doc: &Document) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"INSERT INTO documents (
                 job_id, url, html, title, meta_description, meta_keywords, meta_author,
                 h1, h2, h3, h4, h5, h6, body,
                 title_tokens, meta_description_tokens, meta_keywords_tokens, meta_author_tokens,
                 h1_tokens, h2_tokens, h3_tokens, h4_tokens, h5_tokens, h6_tokens, body_tokens,
                 relevant
               ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,$23,$24,$25,$26)
               ON CONFLICT (job_id) DO UPDATE SET relevant = EXCLUDED.relevant
               RETURNING id"#,
        )
        .bind(doc.job_id)
        .bind(&doc.url)
        .bind(&doc.html)
        .bind(&doc.title)
        .bind(&doc.meta_description)
        .bind(&doc.meta_keywords)
        .bind(&doc.meta_author)
        .bind(&doc.h1)
        .bind(&doc.h2)
        .bind(&doc.h3)
        .bind(&doc.h4)
        .bind(&doc.h5)
        .bind(&doc.h6)
        .bind(&doc.body)
        .bind(&doc.title_tokens)
        .bind(&doc.meta_description_tokens)
        .bind(&doc.meta_keywords_tokens)
        .bind(&doc.meta_author_tokens)
        .bind(&doc.h1_tokens)
        .bind(&doc.h2_tokens)
        .bind(&doc.h3_tokens)
        .bind(&doc.h4_tokens)
        .bind(&doc.h5_tokens)
        .bind(&doc.h6_tokens)
        .bind(&doc.body_tokens)
        .bind(doc.relevant)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    pub async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let row: Option<DocumentRow> =
            sqlx::query_as(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get_documents(&self, ids: &[i64]) -> Result<Vec<Document>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The relevant-document stream the index builder and TF-IDF builder
    /// (§4.9/§4.10) iterate over.
    pub async fn stream_relevant_documents(&self) -> Result<Vec<Document>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE relevant = true ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn all_documents(&self) -> Result<Vec<Document>> {
        let rows: Vec<DocumentRow> =
            sqlx::query_as(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Offline re-classification (`update-relevance`, §9 supplemented
    /// feature): flips the stored `relevant` flag without touching
    /// anything else about the document.
    pub async fn update_relevant_flag(&self, document_id: i64, relevant: bool) -> Result<()> {
        sqlx::query("UPDATE documents SET relevant = $1 WHERE id = $2")
            .bind(relevant)
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Directed cross-host edges harvested from every relevant document:
    /// `(source_host, target_host)` for each follow-up job whose parent is
    /// that document and whose resolved host differs from the document's
    /// own (§4.8's "for each harvested link whose host differs..."). Jobs
    /// already carry their owning document (`parent_id`) and resolved host
    /// (`server_id`), so the edge list falls out of a join rather than
    /// needing a separately stored link table.
    pub async fn host_link_edges(&self) -> Result<Vec<(String, String)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"SELECT s_from.name, s_to.name
               FROM documents d
               JOIN jobs doc_job ON doc_job.id = d.job_id
               JOIN servers s_from ON s_from.id = doc_job.server_id
               JOIN jobs link_job ON link_job.parent_id = d.id
               JOIN servers s_to ON s_to.id = link_job.server_id
               WHERE d.relevant = true AND s_from.id != s_to.id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn document_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM documents").fetch_one(&self.pool).await?;
        Ok(row.0)
    }

    pub async fn relevant_document_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM documents WHERE relevant = true")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
