//! # Grid Reader
//!
//! Turns a source file into a grid of typed cells: a path, a sheet selector
//! and a count of leading rows to skip go in, rows of [`Cell`]s come out.
//!
//! Two on-disk formats are supported by [`FsGridReader`]:
//!
//! - workbooks (xlsx, xlsm, xls, xlsb, ods) through `calamine`
//! - delimited text with a configurable delimiter and text encoding through
//!   `csv` and `encoding_rs` (issuer exports are often `;`-delimited Latin-1)
//!
//! [`MemoryGridReader`] serves pre-built grids and is what parser tests use.

mod delimited;
mod memory;
mod workbook;

pub use memory::MemoryGridReader;
pub use models::{Cell, Grid, Table};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open workbook {}: {source}", path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("malformed delimited text in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("sheet {sheet} not found in {}", path.display())]
    SheetNotFound { path: PathBuf, sheet: SheetSelector },

    #[error("sheet selector {sheet} is not supported for {}", path.display())]
    UnsupportedSelector { path: PathBuf, sheet: SheetSelector },

    #[error("unknown text encoding '{0}'")]
    UnknownEncoding(String),

    #[error("delimiter {0:?} is not a single ASCII character")]
    InvalidDelimiter(char),
}

impl GridError {
    pub fn is_sheet_not_found(&self) -> bool {
        matches!(self, GridError::SheetNotFound { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    /// Zero-based sheet position.
    Index(usize),
    Name(String),
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(idx) => write!(f, "#{}", idx),
            SheetSelector::Name(name) => write!(f, "'{}'", name),
        }
    }
}

impl From<usize> for SheetSelector {
    fn from(idx: usize) -> Self {
        SheetSelector::Index(idx)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimitedFormat {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Any WHATWG encoding label (`utf-8`, `latin1`, `windows-1252`, ...).
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_delimiter() -> char {
    ','
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

impl DelimitedFormat {
    pub fn new(delimiter: char, encoding: impl Into<String>) -> Self {
        Self {
            delimiter,
            encoding: encoding.into(),
        }
    }

    pub(crate) fn delimiter_byte(&self) -> Result<u8, GridError> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(GridError::InvalidDelimiter(self.delimiter))
        }
    }
}

impl Default for DelimitedFormat {
    fn default() -> Self {
        Self::new(default_delimiter(), default_encoding())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum SourceFormat {
    Workbook,
    Delimited(DelimitedFormat),
}

/// Reads a sheet of a source file as a grid of cells.
pub trait GridReader: Send + Sync {
    /// Rows of `sheet` after dropping the first `skip_rows` rows.
    fn read_grid(
        &self,
        path: &Path,
        format: &SourceFormat,
        sheet: &SheetSelector,
        skip_rows: usize,
    ) -> Result<Grid, GridError>;

    /// Like [`GridReader::read_grid`], with the first remaining row taken as
    /// the header.
    fn read_table(
        &self,
        path: &Path,
        format: &SourceFormat,
        sheet: &SheetSelector,
        skip_rows: usize,
    ) -> Result<Table, GridError> {
        Ok(Table::from_grid(self.read_grid(path, format, sheet, skip_rows)?))
    }
}

/// Reads workbooks and delimited files from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsGridReader;

impl GridReader for FsGridReader {
    fn read_grid(
        &self,
        path: &Path,
        format: &SourceFormat,
        sheet: &SheetSelector,
        skip_rows: usize,
    ) -> Result<Grid, GridError> {
        let grid = match format {
            SourceFormat::Workbook => workbook::read_grid(path, sheet)?,
            SourceFormat::Delimited(delimited) => {
                delimited::read_grid(path, delimited, sheet, skip_rows)?
            }
        };

        // Delimited text skips physical lines before parsing; workbooks skip rows here.
        let grid: Grid = match format {
            SourceFormat::Workbook => grid.into_iter().skip(skip_rows).collect(),
            SourceFormat::Delimited(_) => grid,
        };

        tracing::debug!(
            path = %path.display(),
            sheet = %sheet,
            skip_rows,
            rows = grid.len(),
            "read grid"
        );

        Ok(grid)
    }
}
