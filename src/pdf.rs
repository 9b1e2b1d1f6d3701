//! PDF page reading and table detection.
//!
//! Produces the per-page input the table grouper consumes: each page's plain
//! text (via `pdf-extract`) plus the raw tables detected on it. Detection
//! works on the extracted text layout: ELD report tables render as runs of
//! consecutive lines whose fields are separated by multi-space gutters, so a
//! line with two or more gutter-separated cells is a table row and a
//! non-tabular line ends the current table. Cells the layout leaves empty
//! (a row indented past the first column) come back as `None`.

use std::path::Path;

use anyhow::{bail, Result};

use crate::models::{PdfPage, RawTable};

/// Minimum run of spaces treated as a column gutter.
const MIN_GUTTER: usize = 2;

/// Read every page of a PDF: extracted text plus detected tables,
/// in page order.
pub fn read_pages(path: &Path) -> Result<Vec<PdfPage>> {
    if !path.exists() {
        bail!("input PDF does not exist: {}", path.display());
    }

    let page_texts = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| anyhow::anyhow!("failed to extract text from {}: {}", path.display(), e))?;

    Ok(page_texts
        .into_iter()
        .map(|text| {
            let tables = detect_tables(&text);
            PdfPage { text, tables }
        })
        .collect())
}

/// Detect tables in one page's extracted text.
///
/// Consecutive tabular lines form one table; any other line closes it.
pub fn detect_tables(text: &str) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut current: RawTable = Vec::new();

    for line in text.lines() {
        match split_row(line) {
            Some(row) => current.push(row),
            None => {
                if !current.is_empty() {
                    tables.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        tables.push(current);
    }

    tables
}

/// Split a line at multi-space gutters into cells.
///
/// Returns `None` for lines that are not tabular (blank, or fewer than two
/// cells). A line starting with a gutter yields a leading `None` cell — the
/// shape of a continuation row whose first column is empty.
fn split_row(line: &str) -> Option<Vec<Option<String>>> {
    if line.trim().is_empty() {
        return None;
    }

    let mut cells: Vec<Option<String>> = Vec::new();
    let mut field = String::new();
    let mut spaces = 0usize;
    let mut leading = true;

    for ch in line.chars() {
        if ch == ' ' {
            spaces += 1;
            continue;
        }
        if spaces >= MIN_GUTTER {
            if leading {
                cells.push(None);
            } else {
                cells.push(Some(std::mem::take(&mut field)));
            }
        } else if spaces > 0 && !leading {
            field.push(' ');
        }
        spaces = 0;
        leading = false;
        field.push(ch);
    }
    if !field.is_empty() {
        cells.push(Some(field));
    }

    if cells.len() >= 2 {
        Some(cells)
    } else {
        None
    }
}
