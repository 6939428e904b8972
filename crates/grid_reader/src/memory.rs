use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::{Grid, GridError, GridReader, SheetSelector, SourceFormat};

/// Serves grids registered up front, keyed by path and sheet position.
///
/// Sheets are also reachable by the names `Sheet1`, `Sheet2`, ... The source
/// format is ignored; rows are skipped the same way for every format.
#[derive(Debug, Clone, Default)]
pub struct MemoryGridReader {
    sources: HashMap<PathBuf, Vec<Grid>>,
}

impl MemoryGridReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheets(mut self, path: impl Into<PathBuf>, sheets: Vec<Grid>) -> Self {
        self.insert(path, sheets);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, sheets: Vec<Grid>) {
        self.sources.insert(path.into(), sheets);
    }
}

impl GridReader for MemoryGridReader {
    fn read_grid(
        &self,
        path: &Path,
        _format: &SourceFormat,
        sheet: &SheetSelector,
        skip_rows: usize,
    ) -> Result<Grid, GridError> {
        let sheets = self.sources.get(path).ok_or_else(|| GridError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such in-memory source"),
        })?;

        let idx = match sheet {
            SheetSelector::Index(idx) => Some(*idx),
            SheetSelector::Name(name) => name
                .strip_prefix("Sheet")
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| n.checked_sub(1)),
        };

        let grid = idx
            .and_then(|i| sheets.get(i))
            .ok_or_else(|| GridError::SheetNotFound {
                path: path.to_path_buf(),
                sheet: sheet.clone(),
            })?;

        Ok(grid.iter().skip(skip_rows).cloned().collect())
    }
}
