//! Chunk retrieval over the report index.
//!
//! Three modes: `keyword` (FTS5, bm25 ranking), `semantic` (query embedding
//! against stored vectors, cosine ranking), and `hybrid` (weighted merge,
//! `retrieval.hybrid_alpha` toward the semantic score). The final result
//! list keeps at most one chunk per report page, so the retrieved context
//! spans pages instead of repeating one.

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};
use std::collections::{HashMap, HashSet};

use crate::config::Config;
use crate::db;
use crate::embedding::{blob_to_vec, cosine_similarity, EmbeddingClient};

/// One retrieved chunk with its relevance score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChunkHit {
    pub chunk_id: String,
    pub report_id: String,
    pub page: i64,
    pub chunk_index: i64,
    pub text: String,
    pub score: f64,
}

/// Retrieve the top `limit` chunks for a query. An empty query or an empty
/// index returns an empty list, not an error.
pub async fn search_chunks(
    config: &Config,
    pool: &SqlitePool,
    query: &str,
    mode: &str,
    limit: i64,
) -> Result<Vec<ChunkHit>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    match mode {
        "keyword" | "semantic" | "hybrid" => {}
        _ => bail!(
            "Unknown search mode: {}. Use keyword, semantic, or hybrid.",
            mode
        ),
    }

    if (mode == "semantic" || mode == "hybrid") && !config.embedding.is_enabled() {
        bail!(
            "Mode '{}' requires embeddings. Set [embedding] provider in config.",
            mode
        );
    }

    let candidate_k = config.retrieval.candidate_k;

    let keyword_hits = if mode == "keyword" || mode == "hybrid" {
        fetch_keyword_hits(pool, query, candidate_k).await?
    } else {
        Vec::new()
    };

    let vector_hits = if mode == "semantic" || mode == "hybrid" {
        fetch_vector_hits(config, pool, query, candidate_k).await?
    } else {
        Vec::new()
    };

    if keyword_hits.is_empty() && vector_hits.is_empty() {
        return Ok(Vec::new());
    }

    let merged = match mode {
        "keyword" => keyword_hits,
        "semantic" => vector_hits,
        _ => merge_hybrid(keyword_hits, vector_hits, config.retrieval.hybrid_alpha),
    };

    Ok(dedup_by_page(merged, limit))
}

async fn fetch_keyword_hits(
    pool: &SqlitePool,
    query: &str,
    candidate_k: i64,
) -> Result<Vec<ChunkHit>> {
    // Quote the query so FTS5 treats it as a phrase of plain terms rather
    // than match syntax.
    let fts_query = format!("\"{}\"", query.replace('"', "\"\""));

    let rows = sqlx::query(
        r#"
        SELECT c.id, c.report_id, c.page, c.chunk_index, c.text, bm25(chunks_fts) AS rank
        FROM chunks_fts
        JOIN chunks c ON c.id = chunks_fts.chunk_id
        WHERE chunks_fts MATCH ?
        ORDER BY rank
        LIMIT ?
        "#,
    )
    .bind(&fts_query)
    .bind(candidate_k)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let rank: f64 = row.get("rank");
            ChunkHit {
                chunk_id: row.get("id"),
                report_id: row.get("report_id"),
                page: row.get("page"),
                chunk_index: row.get("chunk_index"),
                text: row.get("text"),
                // bm25 ranks lower-is-better; flip so higher is better.
                score: -rank,
            }
        })
        .collect())
}

async fn fetch_vector_hits(
    config: &Config,
    pool: &SqlitePool,
    query: &str,
    candidate_k: i64,
) -> Result<Vec<ChunkHit>> {
    let client = EmbeddingClient::new(&config.embedding)?;
    let query_vec = client.embed_query(query).await?;

    let rows = sqlx::query(
        r#"
        SELECT e.chunk_id, e.vector, c.report_id, c.page, c.chunk_index, c.text
        FROM embeddings e
        JOIN chunks c ON c.id = e.chunk_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut hits: Vec<ChunkHit> = rows
        .iter()
        .map(|row| {
            let blob: Vec<u8> = row.get("vector");
            let vector = blob_to_vec(&blob);
            ChunkHit {
                chunk_id: row.get("chunk_id"),
                report_id: row.get("report_id"),
                page: row.get("page"),
                chunk_index: row.get("chunk_index"),
                text: row.get("text"),
                score: cosine_similarity(&query_vec, &vector) as f64,
            }
        })
        .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(candidate_k as usize);
    Ok(hits)
}

/// Min-max normalize each channel, then weight: `(1-alpha)·kw + alpha·vec`.
fn merge_hybrid(keyword: Vec<ChunkHit>, vector: Vec<ChunkHit>, alpha: f64) -> Vec<ChunkHit> {
    let kw_scores = normalized_scores(&keyword);
    let vec_scores = normalized_scores(&vector);

    let mut merged: HashMap<String, ChunkHit> = HashMap::new();
    for hit in keyword.into_iter().chain(vector.into_iter()) {
        merged.entry(hit.chunk_id.clone()).or_insert(hit);
    }

    let mut hits: Vec<ChunkHit> = merged
        .into_values()
        .map(|mut hit| {
            let k = kw_scores.get(&hit.chunk_id).copied().unwrap_or(0.0);
            let v = vec_scores.get(&hit.chunk_id).copied().unwrap_or(0.0);
            hit.score = (1.0 - alpha) * k + alpha * v;
            hit
        })
        .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits
}

fn normalized_scores(hits: &[ChunkHit]) -> HashMap<String, f64> {
    if hits.is_empty() {
        return HashMap::new();
    }
    let min = hits.iter().map(|h| h.score).fold(f64::INFINITY, f64::min);
    let max = hits
        .iter()
        .map(|h| h.score)
        .fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    hits.iter()
        .map(|h| {
            let norm = if range > f64::EPSILON {
                (h.score - min) / range
            } else {
                1.0
            };
            (h.chunk_id.clone(), norm)
        })
        .collect()
}

/// Keep the best-scored chunk per (report, page), preserving score order,
/// up to `limit` results.
fn dedup_by_page(hits: Vec<ChunkHit>, limit: i64) -> Vec<ChunkHit> {
    let mut sorted = hits;
    sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen: HashSet<(String, i64)> = HashSet::new();
    let mut out = Vec::new();
    for hit in sorted {
        if seen.insert((hit.report_id.clone(), hit.page)) {
            out.push(hit);
            if out.len() as i64 >= limit {
                break;
            }
        }
    }
    out
}

/// CLI entry point for `rods search`.
pub async fn run_search(
    config: &Config,
    query: &str,
    mode: &str,
    limit: Option<i64>,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let limit = limit.unwrap_or(config.retrieval.chunks);

    let hits = search_chunks(config, &pool, query, mode, limit).await?;
    pool.close().await;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for hit in &hits {
        println!(
            "[page {} · chunk {}] score {:.4}",
            hit.page, hit.chunk_index, hit.score
        );
        let snippet: String = hit.text.chars().take(200).collect();
        println!("{}", snippet);
        println!();
    }
    Ok(())
}
