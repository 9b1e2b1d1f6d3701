//! Paragraph-boundary chunker for report page text.
//!
//! Splits one page's extracted text into [`Chunk`]s that respect a
//! configurable `max_tokens` limit, breaking on paragraph boundaries
//! (`\n\n`) so a chunk stays within one report section where possible.
//! Oversized paragraphs are hard-split at newline or space boundaries.
//!
//! Each chunk carries its page number and a SHA-256 hash of its text for
//! embedding-staleness detection.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Split one page's text into chunks with contiguous indices starting at
/// `start_index`. Returns the chunks and the next free index, so a caller
/// chunking page after page keeps report-wide indices contiguous.
pub fn chunk_page(
    report_id: &str,
    page: i64,
    text: &str,
    max_tokens: usize,
    start_index: i64,
) -> (Vec<Chunk>, i64) {
    let max_chars = max_tokens * CHARS_PER_TOKEN;
    let mut chunks = Vec::new();
    let mut index = start_index;

    let mut buf = String::new();
    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        // Would this paragraph push the buffer past the limit?
        let projected = if buf.is_empty() {
            trimmed.len()
        } else {
            buf.len() + 2 + trimmed.len()
        };
        if projected > max_chars && !buf.is_empty() {
            chunks.push(build_chunk(report_id, page, index, &buf));
            index += 1;
            buf.clear();
        }

        if trimmed.len() > max_chars {
            if !buf.is_empty() {
                chunks.push(build_chunk(report_id, page, index, &buf));
                index += 1;
                buf.clear();
            }
            // Hard split, preferring newline then space boundaries.
            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let limit = remaining.len().min(max_chars);
                let split_at = if limit < remaining.len() {
                    remaining[..limit]
                        .rfind('\n')
                        .or_else(|| remaining[..limit].rfind(' '))
                        .map(|pos| pos + 1)
                        .unwrap_or(limit)
                } else {
                    limit
                };
                chunks.push(build_chunk(report_id, page, index, remaining[..split_at].trim()));
                index += 1;
                remaining = &remaining[split_at..];
            }
        } else {
            if !buf.is_empty() {
                buf.push_str("\n\n");
            }
            buf.push_str(trimmed);
        }
    }

    if !buf.is_empty() {
        chunks.push(build_chunk(report_id, page, index, &buf));
        index += 1;
    }

    (chunks, index)
}

fn build_chunk(report_id: &str, page: i64, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        report_id: report_id.to_string(),
        page,
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}
