use anyhow::Result;
use citysearch_core::config::AppConfig;
use citysearch_storage::Storage;

pub async fn run(config: AppConfig) -> Result<()> {
    let storage = Storage::new(&config.database.postgres_url).await?;

    match storage.check_connectivity().await {
        Ok(()) => println!("Database: connected"),
        Err(e) => {
            println!("Database: ERROR - {}", e);
            return Ok(());
        }
    }

    storage.run_migrations().await?;

    let jobs = storage.job_count().await?;
    let done_jobs = storage.done_job_count().await?;
    let servers = storage.server_count().await?;
    let documents = storage.document_count().await?;
    let relevant_documents = storage.relevant_document_count().await?;
    let tfidf_rows = storage.tfidf_count().await?;

    println!("\n╔══════════════════════════════════════════════╗");
    println!("║              citysearch status               ║");
    println!("╠══════════════════════════════════════════════╣");
    println!("║ Jobs total:         {:>20}    ║", jobs);
    println!("║ Jobs done:          {:>20}    ║", done_jobs);
    println!("║ Servers:            {:>20}    ║", servers);
    println!("║ Documents:          {:>20}    ║", documents);
    println!("║ Relevant documents: {:>20}    ║", relevant_documents);
    println!("║ TF-IDF rows:        {:>20}    ║", tfidf_rows);
    println!("╚══════════════════════════════════════════════╝\n");

    Ok(())
}
