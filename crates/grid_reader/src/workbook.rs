use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Duration, NaiveDate};
use std::path::Path;

use crate::{Cell, Grid, GridError, SheetSelector};

pub(crate) fn read_grid(path: &Path, sheet: &SheetSelector) -> Result<Grid, GridError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| GridError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;

    let range = match sheet {
        SheetSelector::Index(idx) => workbook.worksheet_range_at(*idx),
        SheetSelector::Name(name) => {
            if workbook.sheet_names().iter().any(|n| n == name) {
                Some(workbook.worksheet_range(name))
            } else {
                None
            }
        }
    };

    let range = range
        .ok_or_else(|| GridError::SheetNotFound {
            path: path.to_path_buf(),
            sheet: sheet.clone(),
        })?
        .map_err(|source| GridError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(range_to_grid(&range))
}

/// Absolute sheet coordinates from A1 to the end of the used range, so
/// leading blank rows still count when rows are skipped.
fn range_to_grid(range: &Range<Data>) -> Grid {
    let Some((last_row, last_col)) = range.end() else {
        return Vec::new();
    };

    (0..=last_row)
        .map(|r| {
            (0..=last_col)
                .map(|c| range.get_value((r, c)).map(data_to_cell).unwrap_or(Cell::Empty))
                .collect()
        })
        .collect()
}

#[allow(unreachable_patterns)]
fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_text(dt.as_f64())
            .map(Cell::Text)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        // #N/A, #DIV/0! and friends carry no value
        Data::Error(_) => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

/// Excel serial date using the 1899-12-30 base.
fn excel_serial_to_text(v: f64) -> Option<String> {
    if !v.is_finite() {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let secs = (v * 86_400.0).round() as i64;
    let dt = base.checked_add_signed(Duration::try_seconds(secs)?)?;

    if secs % 86_400 == 0 {
        Some(dt.format("%Y-%m-%d").to_string())
    } else {
        Some(dt.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}
