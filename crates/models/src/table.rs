use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A single typed value read from a workbook sheet or a delimited file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// True for empty cells and for text that is blank once trimmed.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(f) => f.is_nan(),
            Cell::Bool(_) => false,
        }
    }

    /// Trimmed textual rendering, `None` when the cell is missing.
    ///
    /// Integral numbers are rendered without a fractional part so that
    /// numeric identifiers read back the way they were typed.
    pub fn as_text(&self) -> Option<String> {
        if self.is_missing() {
            return None;
        }
        match self {
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(f) => Some(format_number(*f)),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Empty => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(f) if f.is_finite() => Some(*f),
            _ => None,
        }
    }
}

pub(crate) fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Rows of cells exactly as read, before any header is identified.
pub type Grid = Vec<Vec<Cell>>;

/// A header row plus body rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Builds a table treating the first non-blank grid row as the header.
    ///
    /// Blank header cells become `Unnamed: <index>`, body rows with no value
    /// at all are dropped, and every row is sized to the widest row. Trailing
    /// blank cells (a trailing delimiter, an unused spreadsheet column) do not
    /// widen the table.
    pub fn from_grid(grid: Grid) -> Self {
        let mut rows = grid
            .into_iter()
            .skip_while(|row| row.iter().all(Cell::is_missing));
        let Some(header) = rows.next() else {
            return Table::default();
        };

        let body: Vec<Vec<Cell>> = rows
            .filter(|row| row.iter().any(|c| !c.is_missing()))
            .collect();

        let width = body
            .iter()
            .map(|row| filled_len(row))
            .chain(std::iter::once(filled_len(&header)))
            .max()
            .unwrap_or(0);

        let mut columns: Vec<String> = header
            .iter()
            .take(width)
            .enumerate()
            .map(|(idx, cell)| cell.as_text().unwrap_or_else(|| unnamed(idx)))
            .collect();
        while columns.len() < width {
            columns.push(unnamed(columns.len()));
        }

        let rows = body
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();

        Table { columns, rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.columns.iter().position(|c| c.trim() == name)
    }

    /// Body cell at `(row, col)`; row 0 is the first row under the header.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Keeps the columns at the given positions, clipped to the table width.
    pub fn select_columns(&self, range: Range<usize>) -> Table {
        let end = range.end.min(self.width());
        let start = range.start.min(end);
        Table {
            columns: self.columns[start..end].to_vec(),
            rows: self.rows.iter().map(|r| r[start..end].to_vec()).collect(),
        }
    }

    pub fn drop_leading_columns(&self, n: usize) -> Table {
        self.select_columns(n..self.width())
    }

    /// Removes every row that has a missing value in any column.
    /// Returns the number of rows removed.
    pub fn drop_incomplete_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.iter().all(|c| !c.is_missing()));
        before - self.rows.len()
    }
}

/// Length up to and including the last non-missing cell.
fn filled_len(row: &[Cell]) -> usize {
    row.iter().rposition(|c| !c.is_missing()).map_or(0, |i| i + 1)
}

fn unnamed(idx: usize) -> String {
    format!("Unnamed: {}", idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    #[test]
    fn test_from_grid_pads_and_names_columns() {
        let grid = vec![
            vec![t("Ticker"), Cell::Empty],
            vec![t("AAPL"), Cell::Number(4.5), t("extra")],
            vec![Cell::Empty, t("  ")],
            vec![t("MSFT")],
        ];

        let table = Table::from_grid(grid);

        assert_eq!(table.columns, vec!["Ticker", "Unnamed: 1", "Unnamed: 2"]);
        assert_eq!(table.height(), 2);
        assert_eq!(table.cell(1, 0), Some(&t("MSFT")));
        assert_eq!(table.cell(1, 2), Some(&Cell::Empty));
    }

    #[test]
    fn test_trailing_blank_cells_do_not_add_columns() {
        let grid = vec![
            vec![t("a"), t("b"), Cell::Empty],
            vec![t("1"), t("2"), Cell::Empty, t(" ")],
        ];

        let table = Table::from_grid(grid);
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows[0], vec![t("1"), t("2")]);
    }

    #[test]
    fn test_leading_blank_rows_are_not_the_header() {
        let grid = vec![vec![Cell::Empty], vec![t(" ")], vec![t("a")], vec![t("1")]];
        let table = Table::from_grid(grid);
        assert_eq!(table.columns, vec!["a"]);
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn test_from_empty_grid() {
        let table = Table::from_grid(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.width(), 0);
    }

    #[test]
    fn test_select_columns_clips_to_width() {
        let table = Table::from_grid(vec![
            vec![t("a"), t("b"), t("c")],
            vec![t("1"), t("2"), t("3")],
        ]);

        let picked = table.select_columns(1..5);
        assert_eq!(picked.columns, vec!["b", "c"]);
        assert_eq!(picked.rows[0], vec![t("2"), t("3")]);

        let none = table.select_columns(7..9);
        assert_eq!(none.width(), 0);
        assert_eq!(none.height(), 1);
    }

    #[test]
    fn test_drop_incomplete_rows() {
        let mut table = Table::from_grid(vec![
            vec![t("a"), t("b")],
            vec![t("1"), t("2")],
            vec![t("1"), Cell::Empty],
            vec![t(" "), t("2")],
        ]);

        assert_eq!(table.drop_incomplete_rows(), 2);
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn test_cell_text_rendering() {
        assert_eq!(Cell::Number(1234.0).as_text().as_deref(), Some("1234"));
        assert_eq!(Cell::Number(3.25).as_text().as_deref(), Some("3.25"));
        assert_eq!(t("  US ").as_text().as_deref(), Some("US"));
        assert_eq!(t("   ").as_text(), None);
        assert_eq!(Cell::Empty.as_text(), None);
    }

    #[test]
    fn test_cell_serializes_untagged() {
        let row = vec![Cell::Empty, Cell::Number(1.5), t("x"), Cell::Bool(true)];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[null,1.5,"x",true]"#);

        let back: Vec<Cell> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }
}
