pub mod document;
pub mod sanitize;

use std::cmp::Ordering;
use std::collections::HashSet;

use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::table::{Cell, Table};
use document::PriorityDocument;

pub const COMPANY_COLUMN: &str = "Company";
pub const YEAR_COLUMN: &str = "Year";

pub const OUTPUT_COLUMNS: [&str; 4] = [
    "Company Name",
    "Priority Type",
    "Priority Initiative Name",
    "Priority Initiative Description",
];

/// Category keys offered for extraction and the label each one exports as.
pub const CATEGORY_LABELS: [(&str, &str); 5] = [
    ("business", "Business Priorities"),
    ("R&D", "R&D Priorities"),
    ("sustainability", "Sustainability Priorities"),
    ("talent", "Talent Priorities"),
    ("technology", "Technology Priorities"),
];

/// Label for a category key. Keys outside the fixed set label as themselves.
pub fn category_label(key: &str) -> &str {
    CATEGORY_LABELS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, label)| *label)
        .unwrap_or(key)
}

pub fn is_known_category(key: &str) -> bool {
    CATEGORY_LABELS.iter().any(|(k, _)| *k == key)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedRecord {
    #[serde(rename = "Company Name")]
    pub company_name: String,
    #[serde(rename = "Priority Type")]
    pub priority_type: String,
    #[serde(rename = "Priority Initiative Name")]
    pub initiative_name: String,
    #[serde(rename = "Priority Initiative Description")]
    pub initiative_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractWarning {
    /// `Company` or `Year` is missing, so every row was processed.
    NoDeduplication { missing: Vec<&'static str> },
}

impl std::fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractWarning::NoDeduplication { missing } => write!(
                f,
                "column(s) {} not present; every row was processed without keeping only the latest year per company",
                missing.join(" and ")
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<ExtractedRecord>,
    pub warnings: Vec<ExtractWarning>,
    pub rows_processed: usize,
    pub rows_superseded: usize,
    pub empty_documents: usize,
}

impl Extraction {
    /// The four fixed output columns, present even with no records.
    pub fn to_table(&self) -> Table {
        Table::with_rows(
            OUTPUT_COLUMNS,
            self.records.iter().map(|r| {
                vec![
                    Cell::text(r.company_name.as_str()),
                    Cell::text(r.priority_type.as_str()),
                    Cell::text(r.initiative_name.as_str()),
                    Cell::text(r.initiative_description.as_str()),
                ]
            }),
        )
    }
}

/// Flatten the selected categories of `priority_column` into one record
/// per initiative.
///
/// When `Company` and `Year` are both present only the latest row per
/// company is read. `progress` advances once per input row.
pub fn extract(
    table: &Table,
    priority_column: &str,
    selected_keys: &[String],
    progress: &ProgressBar,
) -> Result<Extraction> {
    let priority_idx = table.require_column(priority_column)?;
    let documents: Vec<PriorityDocument> = table
        .rows()
        .iter()
        .map(|row| PriorityDocument::parse(&row[priority_idx]))
        .collect();

    let company_idx = table.column_index(COMPANY_COLUMN);
    let year_idx = table.column_index(YEAR_COLUMN);

    let mut out = Extraction {
        empty_documents: documents.iter().filter(|d| d.is_empty()).count(),
        ..Default::default()
    };

    let (order, dedupe) = match (company_idx, year_idx) {
        (Some(c), Some(y)) => (latest_first_order(table, c, y), true),
        _ => {
            let missing: Vec<&'static str> = [(COMPANY_COLUMN, company_idx), (YEAR_COLUMN, year_idx)]
                .into_iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name)
                .collect();
            warn!(?missing, "deduplication disabled");
            out.warnings.push(ExtractWarning::NoDeduplication { missing });
            ((0..table.len()).collect(), false)
        }
    };

    progress.set_length(order.len() as u64);
    let mut seen: HashSet<String> = HashSet::new();

    for idx in order {
        progress.inc(1);
        let row = &table.rows()[idx];
        let company = company_idx.map(|c| row[c].to_string()).unwrap_or_default();

        if dedupe && !seen.insert(company.clone()) {
            out.rows_superseded += 1;
            continue;
        }
        out.rows_processed += 1;

        let document = &documents[idx];
        for key in selected_keys {
            let label = category_label(key);
            for initiative in document.initiatives(key) {
                out.records.push(ExtractedRecord {
                    company_name: company.clone(),
                    priority_type: label.to_string(),
                    initiative_name: initiative.name(),
                    initiative_description: initiative
                        .description()
                        .map(sanitize::sanitize)
                        .unwrap_or_default(),
                });
            }
        }
    }
    progress.finish_and_clear();

    info!(
        records = out.records.len(),
        rows_processed = out.rows_processed,
        rows_superseded = out.rows_superseded,
        empty_documents = out.empty_documents,
        "extraction finished"
    );
    Ok(out)
}

/// Row indices stably sorted by company ascending then year descending,
/// nulls last on each key.
fn latest_first_order(table: &Table, company: usize, year: usize) -> Vec<usize> {
    let rows = table.rows();
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        nulls_last(&rows[a][company], &rows[b][company], Cell::sort_cmp)
            .then_with(|| nulls_last(&rows[a][year], &rows[b][year], latest_year_first))
    });
    order
}

fn nulls_last(a: &Cell, b: &Cell, cmp: impl Fn(&Cell, &Cell) -> Ordering) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => cmp(a, b),
    }
}

/// Numeric years, highest first, then any non-numeric text in reverse
/// lexical order.
fn latest_year_first(a: &Cell, b: &Cell) -> Ordering {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.sort_cmp(a),
    }
}
