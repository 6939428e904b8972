use grid_reader::{GridReader, SheetSelector, SourceFormat};
use models::{Cell, FundMetadata, FundSnapshot, History, LoadDiagnostics, Table};
use std::path::{Path, PathBuf};

use super::{expect_sources, log_loaded, IssuerParser};
use crate::canonical::{canonicalize, coerce_number, ColumnMap};
use crate::error::required_sheet;
use crate::filename::{display_name, extract_identity, UNKNOWN_FUND};
use crate::registry::{DelimitedSection, ParserSpec, SplitDelimitedLayout};
use crate::{FormatError, LoadError, MissingIsinPolicy};

/// Holdings and NAV history shipped as two delimited files, `[holdings, nav]`.
/// Fund name and ISIN come from the NAV file's name.
pub struct SplitDelimitedParser<'a> {
    name: &'a str,
    layout: &'a SplitDelimitedLayout,
    columns: &'a ColumnMap,
    missing_isin: MissingIsinPolicy,
    source_count: usize,
}

impl<'a> SplitDelimitedParser<'a> {
    pub fn new(name: &'a str, layout: &'a SplitDelimitedLayout, spec: &'a ParserSpec) -> Self {
        Self {
            name,
            layout,
            columns: &spec.columns,
            missing_isin: spec.missing_isin,
            source_count: spec.layout.source_count(),
        }
    }

    fn read_section(
        reader: &dyn GridReader,
        path: &Path,
        section: &DelimitedSection,
    ) -> Result<Table, LoadError> {
        reader
            .read_table(
                path,
                &SourceFormat::Delimited(section.format.clone()),
                &SheetSelector::Index(0),
                section.skip_rows,
            )
            .map_err(required_sheet)
    }

    /// Latest NAV: the first row with both kept columns filled.
    fn read_nav(&self, reader: &dyn GridReader, path: &Path) -> Result<f64, LoadError> {
        let table = Self::read_section(reader, path, &self.layout.nav)?;
        let [date_col, value_col] = self.layout.nav_columns;

        let filled = |row: &[Cell], col: usize| row.get(col).is_some_and(|c| !c.is_missing());
        let cell = table
            .rows
            .iter()
            .find(|row| filled(row.as_slice(), date_col) && filled(row.as_slice(), value_col))
            .and_then(|row| row.get(value_col))
            .ok_or_else(|| FormatError::MissingCell {
                path: path.to_path_buf(),
                field: "current value",
                row: 0,
                col: value_col,
            })?;

        let value = coerce_number(cell).ok_or_else(|| FormatError::InvalidValue {
            path: path.to_path_buf(),
            field: "current value",
            value: cell.as_text().unwrap_or_default(),
        })?;
        Ok(value)
    }
}

impl IssuerParser for SplitDelimitedParser<'_> {
    fn name(&self) -> &str {
        self.name
    }

    fn load(
        &self,
        reader: &dyn GridReader,
        sources: &[PathBuf],
    ) -> Result<FundSnapshot, LoadError> {
        expect_sources(self.name, self.source_count, sources)?;
        let (holdings_path, nav_path) = (sources[0].as_path(), sources[1].as_path());
        let mut diagnostics = LoadDiagnostics::default();

        let curr_value = self.read_nav(reader, nav_path)?;

        let nav_name = display_name(nav_path);
        let identity = extract_identity(nav_path).resolve(&nav_name, self.missing_isin)?;
        if identity.fund_name == UNKNOWN_FUND {
            diagnostics.warn(format!("no fund name in file name '{}'", nav_name));
        }
        let mut metadata = FundMetadata::new(identity.fund_name, curr_value);
        metadata.isin = identity.isin;

        let mut table = Self::read_section(reader, holdings_path, &self.layout.holdings)?
            .drop_leading_columns(self.layout.holdings_drop_leading_columns);
        diagnostics.dropped_rows = table.drop_incomplete_rows();
        if diagnostics.dropped_rows > 0 {
            tracing::debug!(
                path = %holdings_path.display(),
                dropped = diagnostics.dropped_rows,
                "dropped holdings rows with missing values"
            );
        }

        let canonical = canonicalize(&table, self.columns)?;
        diagnostics.coerced_weights = canonical.coerced_weights;

        let snapshot = FundSnapshot::new(
            self.name,
            metadata,
            canonical.holdings,
            History::Nav(curr_value),
        )
        .with_sources(sources.to_vec())
        .with_diagnostics(diagnostics);
        log_loaded(&snapshot);
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use crate::registry::{Registry, SourceLayout};
    use crate::{FormatError, LoadError, MissingIsinPolicy, UNKNOWN_FUND};
    use grid_reader::{FsGridReader, MemoryGridReader};
    use models::{Cell, FundSnapshot, History};
    use std::fs;
    use std::path::{Path, PathBuf};

    fn preamble(lines: usize) -> String {
        (1..=lines).map(|i| format!("Intestazione {}\n", i)).collect()
    }

    fn write_holdings(dir: &Path) -> PathBuf {
        let mut text = preamble(19);
        text.push_str(";Codice ISIN;Nome;Settore;Peso;Paese;Asset class;Valuta\n");
        text.push_str("1;US0378331005;APPLE INC;IT;4,75%;Stati Uniti;Azioni;USD\n");
        text.push_str("2;US5949181045;MICROSOFT CORP;IT; 4,10 % ;Stati Uniti;Azioni;USD\n");
        text.push_str("3;JP3633400001;TOYOTA MOTOR;;0,90%;Giappone;Azioni;JPY\n");
        text.push_str(";;;;;;;\n");
        text.push_str("4;CASH_EUR;Liquidità;Liquidità;n.d.;Europa;Liquidità;EUR\n");

        let path = dir.join("Holdings_20240628.csv");
        fs::write(&path, text).unwrap();
        path
    }

    fn write_nav(dir: &Path, file_name: &str) -> PathBuf {
        let mut bytes = preamble(26).into_bytes();
        // "Società" in Latin-1
        bytes.extend_from_slice(b"Codice;Data;NAV;Societ\xe0\n");
        bytes.extend_from_slice(b"LU1681043599;;312,00;A\n");
        bytes.extend_from_slice(b"LU1681043599;28/06/2024;312,45;A\n");
        bytes.extend_from_slice(b"LU1681043599;27/06/2024;311,02;A\n");

        let path = dir.join(file_name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_loads_amundi_export_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let holdings = write_holdings(dir.path());
        let nav = write_nav(dir.path(), "NAV_Amundi_MSCI_World_LU1681043599.csv");

        let snapshot = Registry::builtin()
            .load(&FsGridReader, "amundi", &[holdings, nav])
            .unwrap();

        let meta = snapshot.metadata();
        assert_eq!(meta.fund_name, "Amundi_MSCI_World");
        assert_eq!(meta.isin.as_deref(), Some("LU1681043599"));
        assert_eq!(meta.curr_value, 312.45);
        assert_eq!(snapshot.history(), &History::Nav(312.45));

        // the Toyota row has no sector
        let holdings = snapshot.holdings();
        assert_eq!(holdings.len(), 3);
        assert_eq!(holdings[0].ticker, "US0378331005");
        assert_eq!(holdings[0].weight, Some(4.75));
        assert_eq!(holdings[1].weight, Some(4.10));
        assert_eq!(holdings[2].name, "Liquidità");
        assert_eq!(holdings[2].weight, None);

        let diagnostics = snapshot.diagnostics();
        assert_eq!(diagnostics.dropped_rows, 1);
        assert_eq!(diagnostics.coerced_weights, 1);
    }

    #[test]
    fn test_nav_without_isin_gets_sentinel_name() {
        let dir = tempfile::tempdir().unwrap();
        let holdings = write_holdings(dir.path());
        let nav = write_nav(dir.path(), "nav_export.csv");

        let snapshot = Registry::builtin()
            .load(&FsGridReader, "amundi", &[holdings.clone(), nav.clone()])
            .unwrap();
        assert_eq!(snapshot.fund_name(), UNKNOWN_FUND);
        assert_eq!(snapshot.metadata().isin, None);
        assert_eq!(snapshot.diagnostics().warnings.len(), 1);

        let mut registry = Registry::builtin();
        let mut spec = registry.spec("amundi").unwrap().clone();
        spec.missing_isin = MissingIsinPolicy::Required;
        registry.insert("amundi", spec);

        let err = registry
            .load(&FsGridReader, "amundi", &[holdings, nav])
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Format(FormatError::MissingIsin { .. })
        ));
    }

    fn memory_nav(rows: Vec<Vec<Cell>>) -> MemoryGridReader {
        let mut grid = vec![vec![
            Cell::text("Codice"),
            Cell::text("Data"),
            Cell::text("NAV"),
        ]];
        grid.extend(rows);
        MemoryGridReader::new()
            .with_sheets("holdings.csv", vec![vec![]])
            .with_sheets("NAV_X_LU1681043599.csv", vec![grid])
    }

    fn load(reader: &MemoryGridReader) -> Result<FundSnapshot, LoadError> {
        // in-memory grids are not preceded by a preamble
        let mut registry = Registry::builtin();
        let mut spec = registry.spec("amundi").unwrap().clone();
        if let SourceLayout::SplitDelimited(layout) = &mut spec.layout {
            layout.nav.skip_rows = 0;
            layout.holdings.skip_rows = 0;
        }
        registry.insert("amundi", spec);
        registry.load(
            reader,
            "amundi",
            &[
                PathBuf::from("holdings.csv"),
                PathBuf::from("NAV_X_LU1681043599.csv"),
            ],
        )
    }

    #[test]
    fn test_nav_without_complete_rows() {
        let reader = memory_nav(vec![vec![Cell::text("LU1681043599"), Cell::Empty, Cell::text("1")]]);
        let err = load(&reader).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Format(FormatError::MissingCell { col: 2, .. })
        ));
    }

    #[test]
    fn test_nav_not_numeric() {
        let reader = memory_nav(vec![vec![
            Cell::text("LU1681043599"),
            Cell::text("28/06/2024"),
            Cell::text("sospeso"),
        ]]);
        let err = load(&reader).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Format(FormatError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_empty_holdings_file_lacks_columns() {
        let reader = memory_nav(vec![vec![
            Cell::text("LU1681043599"),
            Cell::text("28/06/2024"),
            Cell::Number(100.0),
        ]]);
        let err = load(&reader).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Format(FormatError::MissingColumn { .. })
        ));
    }
}
