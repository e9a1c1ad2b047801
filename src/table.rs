use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

/// One cell of an uploaded or produced table.
///
/// Empty text and `Null` are the same value as far as the tool is
/// concerned: delimited text and spreadsheets cannot tell them apart.
#[derive(Debug, Clone)]
pub enum Cell {
    Null,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(n) => n.is_nan(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view, parsing text that holds a number (CSV cells are
    /// loaded as text).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if !n.is_nan() => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
            _ => None,
        }
    }

    /// Ordering used when sorting rows: numbers (numerically) before
    /// text (lexically). Nulls are the caller's concern.
    pub fn sort_cmp(&self, other: &Cell) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_null() && b.is_null() => true,
            (Cell::Text(a), Cell::Text(b)) => a == b,
            (Cell::Number(a), Cell::Number(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) if n.is_nan() => Ok(()),
            // integral floats print without a trailing ".0" (years, counts)
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// Named, order-preserving columns over rows of equal width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Table {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table, padding short rows with nulls and cutting long ones.
    pub fn with_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: impl IntoIterator<Item = Vec<Cell>>,
    ) -> Self {
        let mut table = Table::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| Error::ColumnNotFound {
            column: name.to_string(),
            available: self.columns.clone(),
        })
    }

    /// Project onto `names`, in the order given. Every name must exist.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|n| self.require_column(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Table {
            columns: names.iter().map(|n| n.as_ref().to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    pub fn rename_columns<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) {
        for (slot, name) in self.columns.iter_mut().zip(names) {
            *slot = name.into();
        }
    }

    pub fn map_cells<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Cell),
    {
        for cell in self.rows.iter_mut().flatten() {
            f(cell);
        }
    }

    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn column_summaries(&self) -> Vec<ColumnSummary> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut non_null = 0;
                let mut numbers = 0;
                for row in &self.rows {
                    let cell = &row[i];
                    if cell.is_null() {
                        continue;
                    }
                    non_null += 1;
                    if cell.as_number().is_some() {
                        numbers += 1;
                    }
                }
                let kind = match (non_null, numbers) {
                    (0, _) => ValueKind::Empty,
                    (n, m) if n == m => ValueKind::Number,
                    (_, 0) => ValueKind::Text,
                    _ => ValueKind::Mixed,
                };
                ColumnSummary {
                    name: name.clone(),
                    non_null,
                    kind,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Empty,
    Number,
    Text,
    Mixed,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Empty => "empty",
            ValueKind::Number => "number",
            ValueKind::Text => "text",
            ValueKind::Mixed => "mixed",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub non_null: usize,
    pub kind: ValueKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_equals_null() {
        assert_eq!(Cell::text(""), Cell::Null);
        assert_ne!(Cell::text("a"), Cell::Null);
        assert_ne!(Cell::text("1"), Cell::Number(1.0));
    }

    #[test]
    fn integral_numbers_display_without_fraction() {
        assert_eq!(Cell::Number(2022.0).to_string(), "2022");
        assert_eq!(Cell::Number(1.5).to_string(), "1.5");
        assert_eq!(Cell::Null.to_string(), "");
    }

    #[test]
    fn sort_cmp_is_numeric_for_numeric_text() {
        assert_eq!(Cell::text("999").sort_cmp(&Cell::text("2022")), Ordering::Less);
        assert_eq!(Cell::text("b").sort_cmp(&Cell::text("a")), Ordering::Greater);
        assert_eq!(Cell::Number(2021.0).sort_cmp(&Cell::text("2021")), Ordering::Equal);
    }

    #[test]
    fn sort_cmp_puts_numbers_before_text() {
        let (nine, ten, odd) = (Cell::text("9"), Cell::text("10"), Cell::text("5a"));
        assert_eq!(nine.sort_cmp(&ten), Ordering::Less);
        assert_eq!(ten.sort_cmp(&odd), Ordering::Less);
        assert_eq!(nine.sort_cmp(&odd), Ordering::Less);
        assert_eq!(odd.sort_cmp(&nine), Ordering::Greater);

        let mut cells = vec![odd.clone(), ten.clone(), Cell::text("abc"), nine.clone()];
        cells.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(cells, vec![nine, ten, odd, Cell::text("abc")]);
    }

    #[test]
    fn push_row_pads_and_truncates() {
        let mut t = Table::new(["a", "b"]);
        t.push_row(vec![Cell::text("x")]);
        t.push_row(vec!["1".into(), "2".into(), "3".into()]);
        assert_eq!(t.rows()[0], vec![Cell::text("x"), Cell::Null]);
        assert_eq!(t.rows()[1].len(), 2);
    }

    #[test]
    fn select_reorders_and_validates() {
        let t = Table::with_rows(["a", "b"], [vec!["1".into(), "2".into()]]);
        let s = t.select(&["b", "a"]).unwrap();
        assert_eq!(s.columns(), ["b", "a"]);
        assert_eq!(s.rows()[0], vec![Cell::text("2"), Cell::text("1")]);

        let err = t.select(&["c"]).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { ref column, .. } if column == "c"));
    }

    #[test]
    fn summaries_classify_columns() {
        let t = Table::with_rows(
            ["name", "year", "blank", "mixed"],
            [
                vec!["Acme".into(), "2022".into(), Cell::Null, "x".into()],
                vec!["Beta".into(), Cell::Number(2021.0), Cell::text(""), "3".into()],
            ],
        );
        let kinds: Vec<_> = t.column_summaries().into_iter().map(|s| (s.non_null, s.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (2, ValueKind::Text),
                (2, ValueKind::Number),
                (0, ValueKind::Empty),
                (2, ValueKind::Mixed),
            ]
        );
    }
}
