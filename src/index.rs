//! Report indexing: PDF pages → chunks → SQLite (+ inline embeddings).
//!
//! Re-indexing a report replaces its chunks transactionally, so a report
//! path maps to exactly one set of chunks. Embedding is inline and
//! non-fatal: when the provider is disabled or a batch fails, the chunks
//! stay in the index without vectors and keyword search still works.

use std::path::Path;

use anyhow::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::chunk::chunk_page;
use crate::config::Config;
use crate::db;
use crate::embedding::{vec_to_blob, EmbeddingClient};
use crate::models::Chunk;
use crate::pdf;

pub async fn run_index(config: &Config, pdf_path: &Path) -> Result<()> {
    let pool = db::connect(config).await?;

    let pages = pdf::read_pages(pdf_path)?;
    let total = pages.len();

    let report_id = upsert_report(&pool, pdf_path, total as i64).await?;

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut next_index = 0i64;
    for (i, page) in pages.iter().enumerate() {
        eprintln!("Processing page {} of {}...", i + 1, total);
        let (page_chunks, next) = chunk_page(
            &report_id,
            (i + 1) as i64,
            &page.text,
            config.chunking.max_tokens,
            next_index,
        );
        next_index = next;
        chunks.extend(page_chunks);
    }

    replace_chunks(&pool, &report_id, &chunks).await?;

    let (embedded, pending) = embed_chunks_inline(config, &pool, &chunks).await;

    println!("index {}", pdf_path.display());
    println!("  pages: {}", total);
    println!("  chunks written: {}", chunks.len());
    if config.embedding.is_enabled() {
        println!("  embeddings written: {}", embedded);
        println!("  embeddings pending: {}", pending);
    }
    println!("ok");

    pool.close().await;
    Ok(())
}

async fn upsert_report(pool: &SqlitePool, pdf_path: &Path, page_count: i64) -> Result<String> {
    let path_str = pdf_path.display().to_string();

    let existing_id: Option<String> =
        sqlx::query_scalar("SELECT id FROM reports WHERE path = ?")
            .bind(&path_str)
            .fetch_optional(pool)
            .await?;

    let report_id = existing_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO reports (id, path, page_count, indexed_at) VALUES (?, ?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET
            page_count = excluded.page_count,
            indexed_at = excluded.indexed_at
        "#,
    )
    .bind(&report_id)
    .bind(&path_str)
    .bind(page_count)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(report_id)
}

async fn replace_chunks(pool: &SqlitePool, report_id: &str, chunks: &[Chunk]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM embeddings WHERE chunk_id IN (SELECT id FROM chunks WHERE report_id = ?)",
    )
    .bind(report_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM chunks_fts WHERE report_id = ?")
        .bind(report_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM chunks WHERE report_id = ?")
        .bind(report_id)
        .execute(&mut *tx)
        .await?;

    for chunk in chunks {
        sqlx::query(
            "INSERT INTO chunks (id, report_id, page, chunk_index, text, hash) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&chunk.id)
        .bind(&chunk.report_id)
        .bind(chunk.page)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO chunks_fts (chunk_id, report_id, text) VALUES (?, ?, ?)")
            .bind(&chunk.id)
            .bind(&chunk.report_id)
            .bind(&chunk.text)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Embed chunks in batches; failures leave chunks pending rather than
/// failing the index run. Returns (written, pending) counts.
async fn embed_chunks_inline(
    config: &Config,
    pool: &SqlitePool,
    chunks: &[Chunk],
) -> (u64, u64) {
    if !config.embedding.is_enabled() || chunks.is_empty() {
        return (0, chunks.len() as u64);
    }

    let client = match EmbeddingClient::new(&config.embedding) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("warning: embeddings unavailable: {}", e);
            return (0, chunks.len() as u64);
        }
    };

    let mut written = 0u64;
    let mut pending = 0u64;

    for batch in chunks.chunks(config.embedding.batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        match client.embed_batch(&texts).await {
            Ok(vectors) => {
                for (chunk, vector) in batch.iter().zip(vectors.iter()) {
                    let result = sqlx::query(
                        r#"
                        INSERT INTO embeddings (chunk_id, model, dims, vector, text_hash)
                        VALUES (?, ?, ?, ?, ?)
                        ON CONFLICT(chunk_id) DO UPDATE SET
                            model = excluded.model,
                            dims = excluded.dims,
                            vector = excluded.vector,
                            text_hash = excluded.text_hash
                        "#,
                    )
                    .bind(&chunk.id)
                    .bind(client.model())
                    .bind(client.dims() as i64)
                    .bind(vec_to_blob(vector))
                    .bind(&chunk.hash)
                    .execute(pool)
                    .await;

                    match result {
                        Ok(_) => written += 1,
                        Err(e) => {
                            eprintln!("warning: failed to store embedding: {}", e);
                            pending += 1;
                        }
                    }
                }
            }
            Err(e) => {
                eprintln!("warning: embedding batch failed: {}", e);
                pending += batch.len() as u64;
            }
        }
    }

    (written, pending)
}
