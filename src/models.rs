//! Core data models used throughout rods-harness.
//!
//! These types represent the raw per-page detections that flow into the
//! table grouper and the nested report document it produces.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One raw 2D table as detected on a PDF page: rows of optional cells.
/// `None` marks a cell the detector could not fill. Read-only input.
pub type RawTable = Vec<Vec<Option<String>>>;

/// One physical table's rows after filtering, stored as a unit under a
/// (date key, title key) pair.
pub type RowGroup = Vec<Vec<Option<String>>>;

/// One page of a report: the page's plain extracted text plus every raw
/// table detected on it, in detection order.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub text: String,
    pub tables: Vec<RawTable>,
}

/// The nested report document: date key → title key → row groups.
///
/// Both mapping levels preserve insertion order, so the serialized JSON
/// object lists dates (and titles within a date) in the order they were
/// first encountered in the report. Built incrementally through
/// [`ReportTables::push_group`]; existing entries are never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportTables {
    groups: IndexMap<String, IndexMap<String, Vec<RowGroup>>>,
}

impl ReportTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row group under the given date and title keys, creating
    /// the date- and title-level entries on first use.
    pub fn push_group(&mut self, date_key: &str, title_key: &str, group: RowGroup) {
        self.groups
            .entry(date_key.to_string())
            .or_default()
            .entry(title_key.to_string())
            .or_default()
            .push(group);
    }

    /// All row groups stored under `title_key`, one entry per date that
    /// contains the key, in date insertion order. Empty when no date has it.
    pub fn lookup(&self, title_key: &str) -> Vec<Vec<RowGroup>> {
        self.groups
            .values()
            .filter_map(|titles| titles.get(title_key).cloned())
            .collect()
    }

    /// Date keys in insertion order.
    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn date_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of stored row groups across all dates and titles.
    pub fn group_count(&self) -> usize {
        self.groups
            .values()
            .flat_map(|titles| titles.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Titles stored under a date, in insertion order.
    pub fn titles_for(&self, date_key: &str) -> Option<&IndexMap<String, Vec<RowGroup>>> {
        self.groups.get(date_key)
    }
}

/// A chunk of one page's text, stored in the report chunk index.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub report_id: String,
    pub page: i64,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}
