use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported file type {0:?} (expected csv, xls, xlsx or json)")]
    UnsupportedFormat(String),

    #[error("could not parse {format} input: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("workbook has {} sheets, pick one with --sheet: {}", .0.len(), .0.join(", "))]
    SheetSelectionRequired(Vec<String>),

    #[error("sheet {sheet:?} not found (available: {})", .available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("column {column:?} not found (available: {})", .available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    #[error("could not write {format} output: {message}")]
    Export {
        format: &'static str,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(format: &'static str, err: impl std::fmt::Display) -> Self {
        Error::Parse {
            format,
            message: err.to_string(),
        }
    }

    pub(crate) fn export(format: &'static str, err: impl std::fmt::Display) -> Self {
        Error::Export {
            format,
            message: err.to_string(),
        }
    }
}
