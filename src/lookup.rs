//! Table lookup against a previously extracted `_tables.json` document.
//!
//! A missing file is an error surfaced before any processing; a title key
//! absent from every date is an empty result, not an error.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::models::{ReportTables, RowGroup};

/// Load a persisted document and collect the row groups stored under
/// `table_id` across every date, in date insertion order.
pub fn lookup_tables(data_file: &Path, table_id: &str) -> Result<Vec<Vec<RowGroup>>> {
    if !data_file.exists() {
        bail!("table data file not found: {}", data_file.display());
    }

    let content = fs::read_to_string(data_file)
        .with_context(|| format!("failed to read {}", data_file.display()))?;
    let doc: ReportTables = serde_json::from_str(&content)
        .with_context(|| format!("invalid table data in {}", data_file.display()))?;

    Ok(doc.lookup(table_id))
}

/// CLI entry point for `rods lookup`.
pub fn run_lookup(data_file: &Path, table_id: &str, as_json: bool) -> Result<()> {
    let matches = lookup_tables(data_file, table_id)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    if matches.is_empty() {
        println!("No tables found for '{}'.", table_id);
        return Ok(());
    }

    println!("lookup {} in {}", table_id, data_file.display());
    for (i, groups) in matches.iter().enumerate() {
        println!("--- match {} ({} row groups) ---", i + 1, groups.len());
        for group in groups {
            for row in group {
                let cells: Vec<&str> = row
                    .iter()
                    .map(|c| c.as_deref().unwrap_or(""))
                    .collect();
                println!("  {}", cells.join(" | "));
            }
            println!();
        }
    }
    Ok(())
}
