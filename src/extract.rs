//! Table extraction command: PDF in, `<base>_tables.json` out.
//!
//! Reads the report's pages, groups their tables by date and title, and
//! writes the resulting document as pretty-printed JSON alongside the input.
//! The JSON is written once, at the end of a successful run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::ReportTables;
use crate::pdf;
use crate::tables;

/// Extract and persist a report's tables. Returns the output path and the
/// document, for callers (the MCP server) that report counts.
pub fn create_retrieval_data(pdf_path: &Path) -> Result<(PathBuf, ReportTables)> {
    let pages = pdf::read_pages(pdf_path)?;
    let doc = tables::extract_tables(pages);

    let output = tables_output_path(pdf_path);
    let json = serde_json::to_string_pretty(&doc)?;
    fs::write(&output, json)
        .with_context(|| format!("failed to write {}", output.display()))?;

    Ok((output, doc))
}

/// Output convention: `<input-base-name>_tables.json` alongside the input.
pub fn tables_output_path(pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    pdf_path.with_file_name(format!("{}_tables.json", stem))
}

/// CLI entry point for `rods extract`.
pub fn run_extract(pdf_path: &Path) -> Result<()> {
    let (output, doc) = create_retrieval_data(pdf_path)?;

    println!("extract {}", pdf_path.display());
    println!("  dates: {}", doc.date_count());
    println!("  row groups: {}", doc.group_count());
    println!("  wrote: {}", output.display());
    println!("ok");
    Ok(())
}
