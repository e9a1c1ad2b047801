//! Reads uploaded files into a [`Table`].
//!
//! Delimited text keeps every field as text (numeric columns are compared
//! numerically later). Workbooks keep the cell types calamine reports, with
//! dates rendered as ISO text.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{DataType, Reader, Xls, Xlsx};
use chrono::{Duration, NaiveDate};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::table::{Cell, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xls,
    Xlsx,
    Json,
}

impl SourceFormat {
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xls" => Ok(SourceFormat::Xls),
            "xlsx" => Ok(SourceFormat::Xlsx),
            "json" => Ok(SourceFormat::Json),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }

    pub fn is_workbook(self) -> bool {
        matches!(self, SourceFormat::Xls | SourceFormat::Xlsx)
    }

    fn name(self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Xls => "xls",
            SourceFormat::Xlsx => "xlsx",
            SourceFormat::Json => "json",
        }
    }
}

/// An uploaded file: its bytes and the format declared by its extension.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub format: SourceFormat,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn read(path: &Path) -> Result<Self> {
        let format = SourceFormat::from_path(path)?;
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        debug!(%name, bytes = bytes.len(), "read upload");
        Ok(Upload {
            name,
            format,
            bytes,
        })
    }

    pub fn sheet_names(&self) -> Result<Vec<String>> {
        sheet_names(&self.bytes, self.format)
    }

    pub fn load(&self, sheet: Option<&str>) -> Result<Table> {
        let table = load(&self.bytes, self.format, sheet)?;
        info!(
            file = %self.name,
            rows = table.len(),
            columns = table.columns().len(),
            "loaded table"
        );
        Ok(table)
    }
}

/// Sheet names of a workbook; empty for single-table formats.
pub fn sheet_names(bytes: &[u8], format: SourceFormat) -> Result<Vec<String>> {
    match format {
        SourceFormat::Xlsx => Ok(open::<Xlsx<_>>(bytes, format)?.sheet_names().to_vec()),
        SourceFormat::Xls => Ok(open::<Xls<_>>(bytes, format)?.sheet_names().to_vec()),
        SourceFormat::Csv | SourceFormat::Json => Ok(Vec::new()),
    }
}

/// Parse `bytes` as `format`.
///
/// A workbook with several sheets needs `sheet`; with exactly one sheet it
/// may be omitted. `sheet` is ignored for single-table formats.
pub fn load(bytes: &[u8], format: SourceFormat, sheet: Option<&str>) -> Result<Table> {
    match format {
        SourceFormat::Csv => read_csv(bytes),
        SourceFormat::Json => read_json_records(bytes),
        SourceFormat::Xlsx => read_workbook(open::<Xlsx<_>>(bytes, format)?, format, sheet),
        SourceFormat::Xls => read_workbook(open::<Xls<_>>(bytes, format)?, format, sheet),
    }
}

fn read_csv(bytes: &[u8]) -> Result<Table> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::parse("csv", e))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(Error::parse("csv", "no columns to parse from file"));
    }

    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record.map_err(|e| Error::parse("csv", e))?;
        table.push_row(record.iter().map(Cell::text).collect());
    }
    Ok(table)
}

fn read_json_records(bytes: &[u8]) -> Result<Table> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| Error::parse("json", e))?;
    let Value::Array(items) = value else {
        return Err(Error::parse("json", "expected an array of row objects"));
    };

    let mut objects = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) => objects.push(map),
            _ => return Err(Error::parse("json", "expected an array of row objects")),
        }
    }

    let mut columns: Vec<String> = Vec::new();
    for key in objects.iter().flat_map(|o| o.keys()) {
        if !columns.contains(key) {
            columns.push(key.clone());
        }
    }

    let rows: Vec<Vec<Cell>> = objects
        .iter()
        .map(|o| {
            columns
                .iter()
                .map(|c| match o.get(c) {
                    None | Some(Value::Null) => Cell::Null,
                    Some(Value::String(s)) => Cell::text(s.as_str()),
                    Some(Value::Number(n)) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Null),
                    Some(other) => Cell::text(other.to_string()),
                })
                .collect()
        })
        .collect();
    Ok(Table::with_rows(columns, rows))
}

fn open<'a, R>(bytes: &'a [u8], format: SourceFormat) -> Result<R>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: std::fmt::Display,
{
    R::new(Cursor::new(bytes)).map_err(|e| Error::parse(format.name(), e))
}

fn read_workbook<'a, R>(mut workbook: R, format: SourceFormat, sheet: Option<&str>) -> Result<Table>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: std::fmt::Display,
{
    let mut names = workbook.sheet_names().to_vec();
    let sheet = match sheet {
        Some(wanted) if names.iter().any(|n| n == wanted) => wanted.to_string(),
        Some(wanted) => {
            return Err(Error::SheetNotFound {
                sheet: wanted.to_string(),
                available: names,
            })
        }
        None if names.is_empty() => {
            return Err(Error::parse(format.name(), "workbook contains no sheets"))
        }
        None if names.len() == 1 => names.remove(0),
        None => return Err(Error::SheetSelectionRequired(names)),
    };

    let range = workbook
        .worksheet_range(&sheet)
        .ok_or_else(|| Error::parse(format.name(), format!("cannot read sheet {sheet:?}")))?
        .map_err(|e| Error::parse(format.name(), e))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(Error::parse(format.name(), format!("sheet {sheet:?} is empty")));
    };
    let mut table = Table::new(header.iter().map(|c| workbook_cell(c).to_string()));
    for row in rows {
        table.push_row(row.iter().map(workbook_cell).collect());
    }
    debug!(%sheet, rows = table.len(), "read worksheet");
    Ok(table)
}

fn workbook_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::Empty | DataType::Error(_) => Cell::Null,
        DataType::String(s) => Cell::text(s.as_str()),
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Float(f) => Cell::Number(*f),
        DataType::Bool(b) => Cell::text(if *b { "True" } else { "False" }),
        DataType::DateTime(serial) => excel_serial_to_text(*serial)
            .map(Cell::Text)
            .unwrap_or(Cell::Number(*serial)),
        other => Cell::text(other.to_string()),
    }
}

/// Excel serial day number (1900 system) to `YYYY-MM-DD[ HH:MM:SS]`.
fn excel_serial_to_text(serial: f64) -> Option<String> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    let at = epoch.checked_add_signed(Duration::seconds(seconds))?;
    if seconds % 86_400 == 0 {
        Some(at.format("%Y-%m-%d").to_string())
    } else {
        Some(at.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}
