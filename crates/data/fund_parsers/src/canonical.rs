//! Renames an issuer table onto the seven canonical columns and coerces the
//! weight column to numbers.

use models::{CanonicalColumn, Cell, Holding, Table};
use std::collections::BTreeMap;

use crate::FormatError;

/// Source header (as printed by the issuer) → canonical column.
pub type ColumnMap = BTreeMap<String, CanonicalColumn>;

#[derive(Debug, Clone, PartialEq)]
pub struct Canonicalized {
    pub holdings: Vec<Holding>,
    /// Weight cells that ended up null.
    pub coerced_weights: usize,
}

/// Column position of every canonical column inside the source table.
struct Positions([usize; 7]);

impl Positions {
    fn resolve(table: &Table, columns: &ColumnMap) -> Result<Self, FormatError> {
        let mut found: BTreeMap<CanonicalColumn, usize> = BTreeMap::new();
        // first source column in table order wins when two map to the same target
        for (idx, header) in table.columns.iter().enumerate() {
            if let Some(canonical) = columns.get(header.trim()) {
                found.entry(*canonical).or_insert(idx);
            }
        }

        let mut positions = [0; 7];
        for (slot, column) in CanonicalColumn::ALL.into_iter().enumerate() {
            positions[slot] = *found.get(&column).ok_or_else(|| FormatError::MissingColumn {
                column,
                found: table.columns.clone(),
            })?;
        }
        Ok(Positions(positions))
    }

    fn of(&self, column: CanonicalColumn) -> usize {
        // discriminants follow CanonicalColumn::ALL
        self.0[column as usize]
    }
}

pub fn canonicalize(table: &Table, columns: &ColumnMap) -> Result<Canonicalized, FormatError> {
    let pos = Positions::resolve(table, columns)?;
    let text = |row: &[Cell], column| row.get(pos.of(column)).and_then(Cell::as_text);

    let mut holdings = Vec::with_capacity(table.height());
    let mut coerced_weights = 0;

    for row in &table.rows {
        let weight_cell = row.get(pos.of(CanonicalColumn::Weight));
        let weight = weight_cell.and_then(coerce_weight);
        if weight.is_none() {
            coerced_weights += 1;
            tracing::debug!(value = ?weight_cell, "weight coerced to null");
        }

        holdings.push(Holding {
            ticker: text(row, CanonicalColumn::Ticker).unwrap_or_default(),
            name: text(row, CanonicalColumn::Name).unwrap_or_default(),
            sector: text(row, CanonicalColumn::Sector),
            asset_class: text(row, CanonicalColumn::AssetClass),
            weight,
            location: text(row, CanonicalColumn::Location),
            currency: text(row, CanonicalColumn::Currency),
        });
    }

    Ok(Canonicalized {
        holdings,
        coerced_weights,
    })
}

/// Weight as a 0-100 percentage, `None` when the cell holds no number.
pub fn coerce_weight(cell: &Cell) -> Option<f64> {
    coerce_number(cell)
}

/// Numeric value of a cell, reading text with locale-tolerant rules.
pub fn coerce_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(f) => f.is_finite().then_some(*f),
        Cell::Text(s) => parse_decimal(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

/// Parses decimals written as `3,25%`, `1.234,5`, `1,234.5` or `1 234`.
///
/// When both `,` and `.` appear the last one is the decimal mark. A lone mark
/// is decimal; a mark that repeats is a thousands separator.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed);
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let commas = compact.matches(',').count();
    let dots = compact.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) => compact,
        (1, 0) => compact.replace(',', "."),
        (_, 0) => compact.replace(',', ""),
        (0, 1) => compact,
        (0, _) => compact.replace('.', ""),
        _ => {
            let last_comma = compact.rfind(',')?;
            let last_dot = compact.rfind('.')?;
            let (decimal, thousands) = if last_comma > last_dot {
                (',', '.')
            } else {
                ('.', ',')
            };
            if compact.matches(decimal).count() > 1 {
                return None;
            }
            compact.replace(thousands, "").replace(decimal, ".")
        }
    };

    normalized.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Whole count such as `1.234` or `1,234` (separators are always thousands).
pub fn parse_count(cell: &Cell) -> Option<u64> {
    match cell {
        Cell::Number(f) if f.is_finite() && *f >= 0.0 && f.fract() == 0.0 => Some(*f as u64),
        Cell::Text(s) => {
            let digits: String = s
                .chars()
                .filter(|c| !(c.is_whitespace() || matches!(c, ',' | '.' | '\'')))
                .collect();
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            digits.parse().ok()
        }
        _ => None,
    }
}
