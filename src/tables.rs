//! Table grouping for ELD Hours-of-Service report pages.
//!
//! Walks the raw tables detected on each page of a report and accumulates
//! them into a [`ReportTables`] document keyed by log date and table title.
//! A table whose first cell contains the `Date of RODS` header phrase starts
//! a new day and is stored verbatim under the `header` title; a table with a
//! blank first cell continues the previously titled table on an earlier
//! page; anything else starts a new titled group with its header row
//! dropped. Pages for an unidentified driver profile are forced under a
//! dedicated date key.
//!
//! The walk is single-pass and synchronous. The only carried state is the
//! current (date key, title key) pair, threaded explicitly through
//! [`GroupState`]. A malformed table is logged with its raw content and
//! skipped; it never aborts the rest of the document.

use anyhow::{bail, Result};

use crate::models::{PdfPage, RawTable, ReportTables, RowGroup};

/// Date key used until the first header table overrides it.
pub const DEFAULT_DATE_KEY: &str = "2023-10-01";

/// Date key forced for pages of an unidentified driver profile.
pub const UNIDENTIFIED_DATE_KEY: &str = "unidentified_driver";

/// Title key for header tables.
pub const HEADER_TITLE_KEY: &str = "header";

/// Phrase (lowercased) marking a header table's first cell.
const HEADER_MARKER: &str = "date of rods";

/// Phrase (lowercased) marking an unidentified-driver page.
const UNIDENTIFIED_MARKER: &str = "unidentified driver profile";

/// Maximum underscore-delimited segments kept in a title key.
const MAX_TITLE_SEGMENTS: usize = 11;

/// Carried grouping state: which day and which titled table the walk is
/// currently inside. `title_key` is `None` until the first titled table.
#[derive(Debug, Clone)]
struct GroupState {
    date_key: String,
    title_key: Option<String>,
}

impl Default for GroupState {
    fn default() -> Self {
        Self {
            date_key: DEFAULT_DATE_KEY.to_string(),
            title_key: None,
        }
    }
}

/// Group every table of every page into a [`ReportTables`] document.
///
/// Pages are consumed in order; tables within a page in detection order.
/// Empty tables are skipped. A PDF with no tables yields an empty document,
/// which is not an error.
pub fn extract_tables<I>(pages: I) -> ReportTables
where
    I: IntoIterator<Item = PdfPage>,
{
    let mut doc = ReportTables::new();
    let mut state = GroupState::default();

    for (page_idx, page) in pages.into_iter().enumerate() {
        let page_text = page.text.to_lowercase();
        for table in &page.tables {
            if table.is_empty() {
                continue;
            }
            if let Err(err) = group_table(&mut doc, &mut state, &page_text, table) {
                eprintln!(
                    "warning: skipping table on page {}: {}",
                    page_idx + 1,
                    err
                );
                eprintln!("  table content: {:?}", table);
            }
        }
    }

    doc
}

/// Classify one table and append its filtered rows to the document.
///
/// Key transitions, in order:
/// 1. blank first cell → continuation of the current titled table, all rows kept;
/// 2. first cell contains the header marker → title becomes `header`, the date
///    key becomes row 1 column 0 verbatim, all rows kept;
/// 3. otherwise → title is the normalized first cell, row 0 dropped;
/// 4. after the per-table keys are set, an unidentified-driver page overrides
///    the date key for this and every later table on the page.
fn group_table(
    doc: &mut ReportTables,
    state: &mut GroupState,
    page_text: &str,
    table: &RawTable,
) -> Result<()> {
    let first_row = &table[0];
    if first_row.is_empty() {
        bail!("first row has no cells");
    }

    let first_cell = first_row[0]
        .as_deref()
        .map(str::trim)
        .filter(|cell| !cell.is_empty());

    let rows: &[Vec<Option<String>>] = match first_cell {
        // Blank first cell: the table continues the previous titled table.
        // Both keys are reused and no header row is stripped.
        None => &table[..],
        Some(cell) => {
            let candidate = cell.to_lowercase();
            if candidate.contains(HEADER_MARKER) {
                state.title_key = Some(HEADER_TITLE_KEY.to_string());
                let date = table
                    .get(1)
                    .and_then(|row| row.first())
                    .and_then(|cell| cell.clone());
                match date {
                    Some(date) => state.date_key = date,
                    None => bail!("header table has no date cell at row 1, column 0"),
                }
                &table[..]
            } else {
                state.title_key = Some(normalize_title_key(&candidate));
                &table[1..]
            }
        }
    };

    if page_text.contains(UNIDENTIFIED_MARKER) {
        state.date_key = UNIDENTIFIED_DATE_KEY.to_string();
    }

    let title_key = match &state.title_key {
        Some(key) => key.clone(),
        None => bail!("continuation table with no active title"),
    };

    // Filter into a fresh Vec; all-blank tables store an empty group.
    let group: RowGroup = rows
        .iter()
        .filter(|row| !row_is_blank(row))
        .cloned()
        .collect();

    doc.push_group(&state.date_key, &title_key, group);
    Ok(())
}

/// Normalize a table's first cell into a title key: lowercase, spaces to
/// underscores, at most eleven underscore-delimited segments, then strip
/// every character outside `[a-z0-9_]`.
pub fn normalize_title_key(raw: &str) -> String {
    let underscored = raw.to_lowercase().replace(' ', "_");
    let truncated = underscored
        .split('_')
        .take(MAX_TITLE_SEGMENTS)
        .collect::<Vec<_>>()
        .join("_");
    truncated
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

/// True when every cell is `None` or whitespace-only.
fn row_is_blank(row: &[Option<String>]) -> bool {
    row.iter()
        .all(|cell| cell.as_deref().map_or(true, |s| s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    fn page(text: &str, tables: Vec<RawTable>) -> PdfPage {
        PdfPage {
            text: text.to_string(),
            tables,
        }
    }

    fn header_table(date: &str) -> RawTable {
        vec![
            vec![cell("Date of RODS"), cell("")],
            vec![cell(date), cell("")],
        ]
    }

    #[test]
    fn header_table_sets_date_and_stores_verbatim() {
        let doc = extract_tables(vec![page("", vec![header_table("2024-03-01")])]);

        let groups = doc.lookup(HEADER_TITLE_KEY);
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0],
            vec![vec![
                vec![cell("Date of RODS"), cell("")],
                vec![cell("2024-03-01"), cell("")],
            ]]
        );
        assert_eq!(doc.dates().collect::<Vec<_>>(), vec!["2024-03-01"]);
    }

    #[test]
    fn header_marker_is_case_insensitive() {
        let tbl = vec![
            vec![cell("DATE OF RODS (UTC)"), None],
            vec![cell("2024-07-15"), None],
        ];
        let doc = extract_tables(vec![page("", vec![tbl])]);
        assert_eq!(doc.dates().collect::<Vec<_>>(), vec!["2024-07-15"]);
        assert_eq!(doc.lookup(HEADER_TITLE_KEY).len(), 1);
    }

    #[test]
    fn titled_table_drops_header_row_and_blank_rows() {
        let tbl = vec![
            vec![cell("Comments Remarks"), cell("X")],
            vec![None, cell("row1")],
            vec![cell(""), cell("")],
        ];
        let doc = extract_tables(vec![page("", vec![tbl])]);

        let groups = doc.lookup("comments_remarks");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0], vec![vec![vec![None, cell("row1")]]]);
    }

    #[test]
    fn continuation_reuses_keys_and_keeps_all_rows() {
        let titled = vec![
            vec![cell("Duty Status"), cell("Time")],
            vec![cell("Driving"), cell("08:00")],
        ];
        // Continuation on the next page: blank first cell, no header strip.
        let continued = vec![
            vec![None, cell("09:00")],
            vec![cell(""), cell("10:00")],
        ];
        let doc = extract_tables(vec![
            page("", vec![header_table("2024-03-01"), titled]),
            page("", vec![continued]),
        ]);

        let groups = doc.lookup("duty_status");
        assert_eq!(groups.len(), 1);
        // Two row groups under the same date/title: the titled table and its
        // continuation, the latter with both rows intact.
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][0], vec![vec![cell("Driving"), cell("08:00")]]);
        assert_eq!(
            groups[0][1],
            vec![
                vec![None, cell("09:00")],
                vec![cell(""), cell("10:00")],
            ]
        );
    }

    #[test]
    fn continuation_never_creates_a_new_title() {
        let titled = vec![
            vec![cell("Login Logout"), cell("A")],
            vec![cell("x"), cell("y")],
        ];
        let continued = vec![vec![cell("  "), cell("z")]];
        let doc = extract_tables(vec![page("", vec![titled, continued])]);

        assert_eq!(doc.lookup("login_logout")[0].len(), 2);
        // A single date with a single title.
        assert_eq!(doc.titles_for(DEFAULT_DATE_KEY).unwrap().len(), 1);
    }

    #[test]
    fn unidentified_driver_page_forces_sentinel_date() {
        let tbl = vec![
            vec![cell("Unidentified Records"), cell("A")],
            vec![cell("r1"), cell("r2")],
        ];
        let doc = extract_tables(vec![page(
            "ELD report — Unidentified Driver Profile, page 7",
            vec![tbl],
        )]);

        assert_eq!(
            doc.dates().collect::<Vec<_>>(),
            vec![UNIDENTIFIED_DATE_KEY]
        );
        assert_eq!(doc.lookup("unidentified_records").len(), 1);
    }

    #[test]
    fn unidentified_override_applies_after_header_date() {
        // A header table on an unidentified-driver page still stores under
        // the sentinel date: the text override runs after key assignment.
        let doc = extract_tables(vec![page(
            "unidentified driver profile",
            vec![header_table("2024-03-01")],
        )]);
        assert_eq!(
            doc.dates().collect::<Vec<_>>(),
            vec![UNIDENTIFIED_DATE_KEY]
        );
    }

    #[test]
    fn consecutive_blank_rows_are_all_filtered() {
        let tbl = vec![
            vec![cell("Malfunctions"), cell("Code")],
            vec![cell(""), cell("")],
            vec![None, None],
            vec![cell("  "), None],
            vec![cell("P"), cell("power")],
        ];
        let doc = extract_tables(vec![page("", vec![tbl])]);
        let groups = doc.lookup("malfunctions");
        assert_eq!(groups[0], vec![vec![vec![cell("P"), cell("power")]]]);
    }

    #[test]
    fn all_blank_table_stores_empty_group() {
        let tbl = vec![
            vec![cell("Certification"), cell("")],
            vec![cell(""), cell("")],
        ];
        let doc = extract_tables(vec![page("", vec![tbl])]);
        let groups = doc.lookup("certification");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0], vec![Vec::<Vec<Option<String>>>::new()]);
    }

    #[test]
    fn empty_tables_are_skipped() {
        let doc = extract_tables(vec![page("", vec![vec![]])]);
        assert!(doc.is_empty());
    }

    #[test]
    fn malformed_header_table_is_skipped_and_walk_continues() {
        // Header marker but no second row: logged and skipped; the next
        // table on the page is still processed.
        let broken = vec![vec![cell("Date of RODS"), cell("")]];
        let ok = vec![
            vec![cell("Engine Hours"), cell("h")],
            vec![cell("1"), cell("2")],
        ];
        let doc = extract_tables(vec![page("", vec![broken, ok])]);

        assert!(doc.lookup(HEADER_TITLE_KEY).is_empty());
        assert_eq!(doc.lookup("engine_hours").len(), 1);
    }

    #[test]
    fn continuation_before_any_title_is_skipped() {
        let orphan = vec![vec![None, cell("x")]];
        let doc = extract_tables(vec![page("", vec![orphan])]);
        assert!(doc.is_empty());
    }

    #[test]
    fn first_row_without_cells_is_skipped() {
        let broken: RawTable = vec![vec![], vec![cell("a"), cell("b")]];
        let doc = extract_tables(vec![page("", vec![broken])]);
        assert!(doc.is_empty());
    }

    #[test]
    fn pages_without_tables_leave_state_unchanged() {
        let titled = vec![
            vec![cell("Odometer"), cell("km")],
            vec![cell("100"), cell("200")],
        ];
        let continued = vec![vec![None, cell("300")]];
        let doc = extract_tables(vec![
            page("", vec![header_table("2024-05-05"), titled]),
            page("nothing tabular here", vec![]),
            page("", vec![continued]),
        ]);

        // The continuation two pages later still lands under the same keys.
        let groups = doc.lookup("odometer");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(doc.dates().collect::<Vec<_>>(), vec!["2024-05-05"]);
    }

    #[test]
    fn extraction_is_deterministic() {
        let pages = || {
            vec![
                page(
                    "",
                    vec![
                        header_table("2024-03-01"),
                        vec![
                            vec![cell("Duty Status"), cell("Time")],
                            vec![cell("ON"), cell("06:00")],
                        ],
                    ],
                ),
                page("unidentified driver profile", vec![header_table("x")]),
            ]
        };
        let a = extract_tables(pages());
        let b = extract_tables(pages());
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn lookup_returns_one_entry_per_matching_date() {
        let doc = extract_tables(vec![
            page("", vec![header_table("2024-03-01")]),
            page(
                "",
                vec![
                    vec![
                        vec![cell("Date of RODS"), cell("")],
                        vec![cell("2024-03-02"), cell("")],
                    ],
                    vec![
                        vec![cell("Comments"), cell("c")],
                        vec![cell("v"), cell("w")],
                    ],
                ],
            ),
        ]);

        // "header" exists under both dates, "comments" under one.
        assert_eq!(doc.lookup(HEADER_TITLE_KEY).len(), 2);
        assert_eq!(doc.lookup("comments").len(), 1);
        assert!(doc.lookup("never_produced").is_empty());
    }

    #[test]
    fn normalize_strips_to_lowercase_ascii() {
        for raw in [
            "Comments Remarks",
            "Login/Logout Report",
            "Données de l'ELD",
            "  CO-DRIVER  ",
            "a b c d e f g h i j k l m n",
        ] {
            let key = normalize_title_key(raw);
            assert!(
                key.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
                "bad char in {:?}",
                key
            );
            assert!(key.split('_').count() <= 11, "too many segments: {:?}", key);
        }
    }

    #[test]
    fn normalize_examples() {
        assert_eq!(normalize_title_key("Comments Remarks"), "comments_remarks");
        assert_eq!(
            normalize_title_key("login/logout report"),
            "loginlogout_report"
        );
        assert_eq!(
            normalize_title_key("one two three four five six seven eight nine ten eleven twelve"),
            "one_two_three_four_five_six_seven_eight_nine_ten_eleven"
        );
        assert_eq!(normalize_title_key("Odometer (km)"), "odometer_km");
    }

    #[test]
    fn serde_roundtrip_preserves_date_order() {
        let doc = extract_tables(vec![
            page("", vec![header_table("2024-03-02")]),
            page("", vec![header_table("2024-03-01")]),
        ]);
        let json = serde_json::to_string(&doc).unwrap();
        let back: ReportTables = serde_json::from_str(&json).unwrap();
        assert_eq!(
            back.dates().collect::<Vec<_>>(),
            vec!["2024-03-02", "2024-03-01"]
        );
        assert_eq!(back, doc);
    }
}
