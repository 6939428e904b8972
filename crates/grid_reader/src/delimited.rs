use encoding_rs::Encoding;
use std::path::Path;

use crate::{Cell, DelimitedFormat, Grid, GridError, SheetSelector};

/// Tokens read as "no value", like the usual data-frame readers do.
const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub(crate) fn read_grid(
    path: &Path,
    format: &DelimitedFormat,
    sheet: &SheetSelector,
    skip_rows: usize,
) -> Result<Grid, GridError> {
    // A delimited file is a single, unnamed sheet.
    match sheet {
        SheetSelector::Index(0) => {}
        SheetSelector::Index(_) => {
            return Err(GridError::SheetNotFound {
                path: path.to_path_buf(),
                sheet: sheet.clone(),
            })
        }
        SheetSelector::Name(_) => {
            return Err(GridError::UnsupportedSelector {
                path: path.to_path_buf(),
                sheet: sheet.clone(),
            })
        }
    }

    let delimiter = format.delimiter_byte()?;
    let bytes = std::fs::read(path).map_err(|source| GridError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let text = decode_text(&bytes, &format.encoding)?;

    parse_delimited(&text, delimiter, skip_rows).map_err(|source| GridError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Decodes raw bytes with the encoding named by `label`.
///
/// A byte order mark, when present, wins over the label.
pub(crate) fn decode_text(bytes: &[u8], label: &str) -> Result<String, GridError> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| GridError::UnknownEncoding(label.to_string()))?;

    let (decoded, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::warn!(
            encoding = used.name(),
            "malformed byte sequences replaced while decoding"
        );
    }
    Ok(decoded.into_owned())
}

fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(i) => rest = &rest[i + 1..],
            None => return "",
        }
    }
    rest
}

fn parse_delimited(text: &str, delimiter: u8, skip_rows: usize) -> Result<Grid, csv::Error> {
    let body = skip_lines(text, skip_rows);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Vec<Cell> = record.iter().map(field_to_cell).collect();

        // blank lines never become rows (nor the header)
        if row.iter().all(Cell::is_missing) {
            continue;
        }
        grid.push(row);
    }

    Ok(grid)
}

fn field_to_cell(raw: &str) -> Cell {
    let s = raw.trim();
    if s.is_empty() || NA_TOKENS.contains(&s) {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}
