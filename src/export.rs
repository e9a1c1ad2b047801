use std::path::Path;

use clap::ValueEnum;
use rust_xlsxwriter::{Format, Workbook};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};
use crate::table::{Cell, Table};

pub const XLSX_SHEET: &str = "Data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Json => "application/json",
        }
    }

    /// Format implied by an output path's extension, if it names one.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" => Some(ExportFormat::Xlsx),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn serialize(self, table: &Table) -> Result<Vec<u8>> {
        match self {
            ExportFormat::Csv => to_csv(table),
            ExportFormat::Xlsx => to_xlsx(table),
            ExportFormat::Json => to_json(table),
        }
    }
}

/// Comma-delimited UTF-8 with a header row and no index column.
pub fn to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(table.columns())
        .map_err(|e| Error::export("csv", e))?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|c| c.to_string()))
            .map_err(|e| Error::export("csv", e))?;
    }
    writer.into_inner().map_err(|e| Error::export("csv", e))
}

/// A workbook with one sheet named `Data`, header row in bold.
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name(XLSX_SHEET)
        .map_err(|e| Error::export("xlsx", e))?;

    let header_format = Format::new().set_bold();
    for (col, name) in table.columns().iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, name, &header_format)
            .map_err(|e| Error::export("xlsx", e))?;
    }

    for (i, row) in table.rows().iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                c if c.is_null() => {}
                Cell::Number(n) => {
                    sheet.write_number(r, col, *n).map_err(|e| Error::export("xlsx", e))?;
                }
                other => {
                    sheet
                        .write_string(r, col, other.to_string())
                        .map_err(|e| Error::export("xlsx", e))?;
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(|e| Error::export("xlsx", e))
}

/// An array of row objects keyed by column name, in column order.
pub fn to_json(table: &Table) -> Result<Vec<u8>> {
    let records: Vec<Value> = table
        .rows()
        .iter()
        .map(|row| {
            let object: Map<String, Value> = table
                .columns()
                .iter()
                .zip(row)
                .map(|(name, cell)| (name.clone(), json_value(cell)))
                .collect();
            Value::Object(object)
        })
        .collect();
    serde_json::to_vec(&records).map_err(|e| Error::export("json", e))
}

fn json_value(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Text(s) => Value::String(s.clone()),
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Value::from(*n as i64),
        Cell::Number(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{self, SourceFormat};

    fn records() -> Table {
        Table::with_rows(
            crate::priority::OUTPUT_COLUMNS,
            [
                vec![
                    Cell::text("Acme, Inc"),
                    Cell::text("Business Priorities"),
                    Cell::text("Expand \"global\""),
                    Cell::text("Grow fast"),
                ],
                vec![
                    Cell::text("Beta"),
                    Cell::text("R&D Priorities"),
                    Cell::text(""),
                    Cell::text("Line one\nline two"),
                ],
                vec![
                    Cell::text("Ünïcode Co"),
                    Cell::text("Talent Priorities"),
                    Cell::text("2024"),
                    Cell::text(""),
                ],
            ],
        )
    }

    #[test]
    fn csv_round_trip() {
        let t = records();
        let bytes = to_csv(&t).unwrap();
        assert!(bytes.starts_with(b"Company Name,Priority Type,"));
        assert_eq!(loader::load(&bytes, SourceFormat::Csv, None).unwrap(), t);
    }

    #[test]
    fn xlsx_round_trip() {
        let t = records();
        let bytes = to_xlsx(&t).unwrap();
        assert_eq!(loader::sheet_names(&bytes, SourceFormat::Xlsx).unwrap(), vec![XLSX_SHEET]);
        assert_eq!(loader::load(&bytes, SourceFormat::Xlsx, None).unwrap(), t);
    }

    #[test]
    fn json_round_trip() {
        let t = records();
        let bytes = to_json(&t).unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed[0]["Company Name"], "Acme, Inc");
        assert_eq!(loader::load(&bytes, SourceFormat::Json, None).unwrap(), t);
    }

    #[test]
    fn empty_table_keeps_header() {
        let t = Table::new(crate::priority::OUTPUT_COLUMNS);
        let csv = to_csv(&t).unwrap();
        assert_eq!(
            String::from_utf8(csv.clone()).unwrap(),
            "Company Name,Priority Type,Priority Initiative Name,Priority Initiative Description\n"
        );
        assert_eq!(loader::load(&csv, SourceFormat::Csv, None).unwrap(), t);
        assert_eq!(loader::load(&to_xlsx(&t).unwrap(), SourceFormat::Xlsx, None).unwrap(), t);
        assert_eq!(to_json(&t).unwrap(), b"[]");
    }

    #[test]
    fn numbers_export_as_numbers() {
        let t = Table::with_rows(["Year", "Score"], [vec![Cell::Number(2022.0), Cell::Number(0.5)]]);
        assert_eq!(to_json(&t).unwrap(), br#"[{"Year":2022,"Score":0.5}]"#);
        assert_eq!(String::from_utf8(to_csv(&t).unwrap()).unwrap(), "Year,Score\n2022,0.5\n");
    }

    #[test]
    fn format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out.XLSX")), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::from_path(Path::new("out")), None);
        assert_eq!(ExportFormat::Json.mime_type(), "application/json");
    }
}
