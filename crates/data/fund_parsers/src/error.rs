use grid_reader::{GridError, SheetSelector};
use models::CanonicalColumn;
use std::path::PathBuf;
use thiserror::Error;

/// A source file was read but does not have the shape its issuer promises.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("{}: required sheet {sheet} is missing", path.display())]
    MissingSheet { path: PathBuf, sheet: SheetSelector },

    #[error("{}: no {field} at row {row}, column {col}", path.display())]
    MissingCell {
        path: PathBuf,
        field: &'static str,
        row: usize,
        col: usize,
    },

    #[error("{}: {field} '{value}' is not a number", path.display())]
    InvalidValue {
        path: PathBuf,
        field: &'static str,
        value: String,
    },

    #[error("no source column maps to '{column}' (found: {})", found.join(", "))]
    MissingColumn {
        column: CanonicalColumn,
        found: Vec<String>,
    },

    #[error(
        "{}: expected a label containing '{expected}' at row {row}, column {col}, found '{found}'",
        path.display()
    )]
    LabelMismatch {
        path: PathBuf,
        row: usize,
        col: usize,
        expected: String,
        found: String,
    },

    #[error("no ISIN found in file name '{file_name}'")]
    MissingIsin { file_name: String },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Read(#[from] GridError),

    #[error("unsupported issuer: {0}")]
    UnsupportedIssuer(String),

    #[error("issuer '{issuer}' expects {expected} source file(s), got {got}")]
    SourceCount {
        issuer: String,
        expected: usize,
        got: usize,
    },
}

/// Maps a read failure on a sheet the issuer layout requires.
///
/// A sheet that does not exist is a layout problem, not an I/O one.
pub(crate) fn required_sheet(err: GridError) -> LoadError {
    match err {
        GridError::SheetNotFound { path, sheet } => FormatError::MissingSheet { path, sheet }.into(),
        other => LoadError::Read(other),
    }
}
