//! Cleanup for job-posting exports ("hiring deliverable").

use itertools::Itertools;
use tracing::info;

use crate::error::Result;
use crate::table::{Cell, Table};

/// Source column → exported header, in output order.
pub const COLUMN_RENAMES: [(&str, &str); 13] = [
    ("mvp_company_name", "Company Name"),
    ("translated_job_title", "Job Title"),
    ("msa", "Location"),
    ("publication_date", "Posted Date"),
    ("url", "URL"),
    ("core_skills", "Core Skills"),
    ("soft_skills", "Soft Skills"),
    ("job_role_list", "Job Role"),
    ("digital_products", "Digital Products"),
    ("business_function", "Business Function"),
    ("functional_workload", "Functional Workload"),
    ("education", "Education"),
    ("synon_location", "Synon Location"),
];

/// Unwrap list-style strings, drop duplicate rows, then keep and rename
/// the thirteen reporting columns.
pub fn clean(table: &Table) -> Result<Table> {
    let sources: Vec<&str> = COLUMN_RENAMES.iter().map(|(src, _)| *src).collect();
    // fail on missing columns before touching any data
    for src in &sources {
        table.require_column(src)?;
    }

    let mut cleaned = table.clone();
    cleaned.map_cells(|cell| {
        if let Cell::Text(s) = cell {
            *s = unwrap_list_text(s);
        }
    });

    let before = cleaned.len();
    let unique: Vec<Vec<Cell>> = cleaned
        .rows()
        .iter()
        .unique_by(|row| row_key(row))
        .cloned()
        .collect();
    let deduped = Table::with_rows(cleaned.columns().to_vec(), unique);

    let mut out = deduped.select(&sources)?;
    out.rename_columns(COLUMN_RENAMES.iter().map(|(_, dst)| *dst));

    info!(
        rows_in = before,
        rows_out = out.len(),
        duplicates = before - out.len(),
        "hiring table cleaned"
    );
    Ok(out)
}

fn unwrap_list_text(s: &str) -> String {
    s.replace("\"]", "").replace("[\"", "").replace("[]", "-")
}

fn row_key(row: &[Cell]) -> Vec<Option<String>> {
    row.iter()
        .map(|c| (!c.is_null()).then(|| c.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_columns() -> Vec<&'static str> {
        let mut cols: Vec<&str> = COLUMN_RENAMES.iter().map(|(s, _)| *s).collect();
        cols.insert(1, "internal_id");
        cols
    }

    fn row(company: &str, skills: &str) -> Vec<Cell> {
        source_columns()
            .into_iter()
            .map(|c| match c {
                "mvp_company_name" => Cell::text(company),
                "core_skills" => Cell::text(skills),
                "internal_id" => Cell::text("ignored"),
                _ => Cell::Null,
            })
            .collect()
    }

    #[test]
    fn renames_and_orders_columns() {
        let t = Table::with_rows(source_columns(), [row("Acme", "Rust")]);
        let out = clean(&t).unwrap();
        let expected: Vec<&str> = COLUMN_RENAMES.iter().map(|(_, d)| *d).collect();
        assert_eq!(out.columns(), expected.as_slice());
        assert_eq!(out.rows()[0][0], Cell::text("Acme"));
        assert_eq!(out.rows()[0][5], Cell::text("Rust"));
    }

    #[test]
    fn unwraps_list_strings() {
        assert_eq!(unwrap_list_text(r#"["Rust", "SQL"]"#), r#"Rust", "SQL"#);
        assert_eq!(unwrap_list_text("[]"), "-");
        assert_eq!(unwrap_list_text("plain"), "plain");
    }

    #[test]
    fn drops_duplicates_after_cleanup() {
        let t = Table::with_rows(
            source_columns(),
            [
                row("Acme", r#"["Rust"]"#),
                row("Acme", "Rust"),
                row("Beta", "[]"),
            ],
        );
        let out = clean(&t).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows()[1][5], Cell::text("-"));
    }

    #[test]
    fn missing_column_is_reported() {
        let t = Table::with_rows(["mvp_company_name"], [vec![Cell::text("Acme")]]);
        let err = clean(&t).unwrap_err();
        assert!(err.to_string().contains("translated_job_title"));
    }
}
