use grid_reader::{GridReader, SheetSelector, SourceFormat};
use models::{Cell, FundMetadata, FundSnapshot, History, LoadDiagnostics, Table};
use std::path::{Path, PathBuf};

use super::{expect_sources, log_loaded, IssuerParser};
use crate::canonical::{canonicalize, coerce_number, parse_count, ColumnMap};
use crate::error::required_sheet;
use crate::filename::{display_name, extract_identity};
use crate::registry::{CellAnchor, ParserSpec, WorkbookLayout};
use crate::{FormatError, LoadError, MissingIsinPolicy};

/// Single workbook: an info sheet carrying metadata above the holdings table,
/// plus a NAV history sheet.
pub struct WorkbookParser<'a> {
    name: &'a str,
    layout: &'a WorkbookLayout,
    columns: &'a ColumnMap,
    missing_isin: MissingIsinPolicy,
    source_count: usize,
}

impl<'a> WorkbookParser<'a> {
    pub fn new(name: &'a str, layout: &'a WorkbookLayout, spec: &'a ParserSpec) -> Self {
        Self {
            name,
            layout,
            columns: &spec.columns,
            missing_isin: spec.missing_isin,
            source_count: spec.layout.source_count(),
        }
    }

    fn check_labels(&self, path: &Path, info: &Table) -> Result<(), FormatError> {
        for check in &self.layout.label_checks {
            let found = info
                .cell(check.row, check.col)
                .and_then(Cell::as_text)
                .unwrap_or_default();
            if !found.to_lowercase().contains(&check.contains.to_lowercase()) {
                return Err(FormatError::LabelMismatch {
                    path: path.to_path_buf(),
                    row: check.row,
                    col: check.col,
                    expected: check.contains.clone(),
                    found,
                });
            }
        }
        Ok(())
    }

    fn read_metadata(
        &self,
        path: &Path,
        info: &Table,
        curr_value: f64,
        diagnostics: &mut LoadDiagnostics,
    ) -> Result<FundMetadata, LoadError> {
        let anchor = self.layout.fund_name;
        let fund_name = info
            .cell(anchor.row, anchor.col)
            .and_then(Cell::as_text)
            .ok_or_else(|| FormatError::MissingCell {
                path: path.to_path_buf(),
                field: "fund name",
                row: anchor.row,
                col: anchor.col,
            })?;

        let mut metadata = FundMetadata::new(fund_name, curr_value);
        metadata.inception_date = optional_field(
            info,
            self.layout.inception_date,
            "inception date",
            Cell::as_text,
            diagnostics,
        );
        metadata.num_securities = optional_field(
            info,
            self.layout.num_securities,
            "security count",
            parse_count,
            diagnostics,
        );

        // the workbook itself carries no ISIN; the file name may
        let file_name = display_name(path);
        metadata.isin = extract_identity(path)
            .resolve(&file_name, self.missing_isin)?
            .isin;

        Ok(metadata)
    }

    fn read_nav(&self, reader: &dyn GridReader, path: &Path) -> Result<(f64, History), LoadError> {
        let nav = reader
            .read_table(
                path,
                &SourceFormat::Workbook,
                &SheetSelector::Index(self.layout.nav_sheet),
                0,
            )
            .map_err(required_sheet)?;

        let anchor = self.layout.nav_value;
        let cell = nav
            .cell(anchor.row, anchor.col)
            .filter(|c| !c.is_missing())
            .ok_or_else(|| FormatError::MissingCell {
                path: path.to_path_buf(),
                field: "current value",
                row: anchor.row,
                col: anchor.col,
            })?;

        let curr_value = coerce_number(cell).ok_or_else(|| FormatError::InvalidValue {
            path: path.to_path_buf(),
            field: "current value",
            value: cell.as_text().unwrap_or_default(),
        })?;

        Ok((curr_value, History::Table(nav)))
    }
}

/// Reads an optional metadata cell. Absent or unreadable values are counted,
/// never raised.
fn optional_field<T>(
    info: &Table,
    anchor: Option<CellAnchor>,
    field: &str,
    parse: impl Fn(&Cell) -> Option<T>,
    diagnostics: &mut LoadDiagnostics,
) -> Option<T> {
    let anchor = anchor?;
    let value = info.cell(anchor.row, anchor.col).and_then(parse);
    if value.is_none() {
        diagnostics.coerced_fields += 1;
        diagnostics.warn(format!(
            "no usable {} at row {}, column {}",
            field, anchor.row, anchor.col
        ));
    }
    value
}

impl IssuerParser for WorkbookParser<'_> {
    fn name(&self) -> &str {
        self.name
    }

    fn load(
        &self,
        reader: &dyn GridReader,
        sources: &[PathBuf],
    ) -> Result<FundSnapshot, LoadError> {
        expect_sources(self.name, self.source_count, sources)?;
        let path = sources[0].as_path();
        let mut diagnostics = LoadDiagnostics::default();

        // One read of the info sheet serves both the metadata block (header on
        // the first row) and the holdings table (header after the skip).
        let grid = reader
            .read_grid(
                path,
                &SourceFormat::Workbook,
                &SheetSelector::Index(self.layout.info_sheet),
                0,
            )
            .map_err(required_sheet)?;
        let holdings_table = Table::from_grid(
            grid.iter()
                .skip(self.layout.holdings_skip_rows)
                .cloned()
                .collect(),
        );
        let info = Table::from_grid(grid);

        self.check_labels(path, &info)?;
        let (curr_value, history) = self.read_nav(reader, path)?;
        let metadata = self.read_metadata(path, &info, curr_value, &mut diagnostics)?;

        let canonical = canonicalize(&holdings_table, self.columns)?;
        diagnostics.coerced_weights = canonical.coerced_weights;

        let snapshot = FundSnapshot::new(self.name, metadata, canonical.holdings, history)
            .with_sources(sources.to_vec())
            .with_diagnostics(diagnostics);
        log_loaded(&snapshot);
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use crate::registry::{LabelCheck, Registry, SourceLayout};
    use crate::{FormatError, LoadError, MissingIsinPolicy};
    use grid_reader::{Grid, MemoryGridReader};
    use models::{Cell, History};
    use std::path::PathBuf;

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    fn n(f: f64) -> Cell {
        Cell::Number(f)
    }

    fn info_sheet(count: Cell) -> Grid {
        vec![
            vec![t("Dati del fondo"), Cell::Empty],
            vec![t("iShares Core MSCI World UCITS ETF"), Cell::Empty],
            vec![t("Data di lancio"), t("25/09/2009")],
            vec![t("Valuta del fondo"), t("USD")],
            vec![t("Numero di titoli"), count],
            vec![t("Fonte"), t("BlackRock")],
            vec![t("Note"), t("-")],
            vec![
                t("Ticker dell'emittente"),
                t("Nome"),
                t("Settore"),
                t("Asset Class"),
                t("Valore di mercato"),
                t("Ponderazione (%)"),
                t("Area Geografica"),
                t("Valuta di mercato"),
            ],
            vec![
                t("AAPL"),
                t("APPLE INC"),
                t("IT"),
                t("Azionario"),
                n(1000.0),
                n(4.75),
                t("Stati Uniti"),
                t("USD"),
            ],
            vec![
                t("MSFT"),
                t("MICROSOFT CORP"),
                t("IT"),
                t("Azionario"),
                n(900.0),
                t("4,10"),
                t("Stati Uniti"),
                t("USD"),
            ],
            vec![
                t("EUR"),
                t("EUR CASH"),
                t("Liquidità"),
                t("Liquidità"),
                n(5.0),
                t("-"),
                t("Europa"),
                t("EUR"),
            ],
        ]
    }

    fn nav_sheet(value: Cell) -> Grid {
        vec![
            vec![t("Data"), t("Valuta"), t("NAV")],
            vec![t("28/giu/2024"), t("USD"), value],
            vec![t("27/giu/2024"), t("USD"), n(97.5)],
        ]
    }

    fn reader(path: &str, sheets: Vec<Grid>) -> MemoryGridReader {
        MemoryGridReader::new().with_sheets(path, sheets)
    }

    fn standard(path: &str) -> MemoryGridReader {
        reader(
            path,
            vec![
                info_sheet(t("1.432")),
                vec![vec![t("Distribuzioni")]],
                nav_sheet(n(98.12)),
            ],
        )
    }

    #[test]
    fn test_loads_metadata_holdings_and_history() {
        let path = "iShares_Core_MSCI_World_IE00B4L5Y983.xlsx";
        let snapshot = Registry::builtin()
            .load(&standard(path), "ishares", &[PathBuf::from(path)])
            .unwrap();

        let meta = snapshot.metadata();
        assert_eq!(meta.fund_name, "iShares Core MSCI World UCITS ETF");
        assert_eq!(meta.inception_date.as_deref(), Some("25/09/2009"));
        assert_eq!(meta.num_securities, Some(1432));
        assert_eq!(meta.curr_value, 98.12);
        assert_eq!(meta.isin.as_deref(), Some("IE00B4L5Y983"));

        let holdings = snapshot.holdings();
        assert_eq!(holdings.len(), 3);
        assert_eq!(holdings[0].ticker, "AAPL");
        assert_eq!(holdings[0].asset_class.as_deref(), Some("Azionario"));
        assert_eq!(holdings[1].weight, Some(4.10));
        assert_eq!(holdings[2].weight, None);

        match snapshot.history() {
            History::Table(nav) => assert_eq!(nav.height(), 2),
            other => panic!("unexpected history: {other:?}"),
        }

        assert_eq!(snapshot.diagnostics().coerced_weights, 1);
        assert_eq!(snapshot.diagnostics().coerced_fields, 0);
        assert_eq!(snapshot.issuer(), "ishares");
        assert_eq!(snapshot.sources(), &[PathBuf::from(path)]);
    }

    #[test]
    fn test_missing_nav_sheet_is_a_format_error() {
        let path = "fund.xlsx";
        let reader = reader(path, vec![info_sheet(n(1432.0)), vec![]]);

        let err = Registry::builtin()
            .load(&reader, "ishares", &[PathBuf::from(path)])
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Format(FormatError::MissingSheet { .. })
        ));
    }

    #[test]
    fn test_non_numeric_nav() {
        let path = "fund.xlsx";
        let reader = reader(
            path,
            vec![info_sheet(n(1432.0)), vec![], nav_sheet(t("n.d."))],
        );

        let err = Registry::builtin()
            .load(&reader, "ishares", &[PathBuf::from(path)])
            .unwrap_err();
        match err {
            LoadError::Format(FormatError::InvalidValue { value, .. }) => assert_eq!(value, "n.d."),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_fund_name_is_missing_cell() {
        let path = "fund.xlsx";
        let mut info = info_sheet(n(1432.0));
        info[1][0] = t("  ");
        // keep the row non-blank so coordinates stay put
        info[1][1] = t("x");
        let reader = reader(path, vec![info, vec![], nav_sheet(n(1.0))]);

        let err = Registry::builtin()
            .load(&reader, "ishares", &[PathBuf::from(path)])
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Format(FormatError::MissingCell { field: "fund name", .. })
        ));
    }

    #[test]
    fn test_unreadable_count_is_soft() {
        let path = "fund.xlsx";
        let reader = reader(
            path,
            vec![info_sheet(t("circa mille")), vec![], nav_sheet(n(98.12))],
        );

        let snapshot = Registry::builtin()
            .load(&reader, "ishares", &[PathBuf::from(path)])
            .unwrap();
        assert_eq!(snapshot.metadata().num_securities, None);
        assert_eq!(snapshot.metadata().isin, None);
        assert_eq!(snapshot.diagnostics().coerced_fields, 1);
        assert!(!snapshot.diagnostics().is_clean());
    }

    #[test]
    fn test_label_check_detects_drift() {
        let mut registry = Registry::builtin();
        let mut spec = registry.spec("ishares").unwrap().clone();
        if let SourceLayout::Workbook(layout) = &mut spec.layout {
            layout.label_checks.push(LabelCheck {
                row: 1,
                col: 0,
                contains: "DATA DI LANCIO".to_string(),
            });
            layout.label_checks.push(LabelCheck {
                row: 3,
                col: 0,
                contains: "numero di azioni".to_string(),
            });
        }
        registry.insert("ishares", spec);

        let path = "fund.xlsx";
        let err = registry
            .load(&standard(path), "ishares", &[PathBuf::from(path)])
            .unwrap_err();
        match err {
            LoadError::Format(FormatError::LabelMismatch { row, found, .. }) => {
                assert_eq!(row, 3);
                assert_eq!(found, "Numero di titoli");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_required_isin_policy() {
        let mut registry = Registry::builtin();
        let mut spec = registry.spec("ishares").unwrap().clone();
        spec.missing_isin = MissingIsinPolicy::Required;
        registry.insert("ishares", spec);

        let path = "fund.xlsx";
        let err = registry
            .load(&standard(path), "ishares", &[PathBuf::from(path)])
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Format(FormatError::MissingIsin { .. })
        ));
    }

    #[test]
    fn test_wrong_source_count() {
        let err = Registry::builtin()
            .load(
                &MemoryGridReader::new(),
                "ishares",
                &[PathBuf::from("a.xlsx"), PathBuf::from("b.xlsx")],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::SourceCount { expected: 1, got: 2, .. }
        ));
    }
}
