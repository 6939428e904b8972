//! Issuer layouts as data.
//!
//! Every supported issuer is a [`ParserSpec`]: the shape of its export files,
//! its column names and its ISIN policy. Adding an issuer means adding an
//! entry (in code or in the JSON settings file), not a new code path.

use grid_reader::{DelimitedFormat, GridReader};
use models::{CanonicalColumn, FundSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::canonical::ColumnMap;
use crate::issuers::{IssuerParser, SplitDelimitedParser, WorkbookParser};
use crate::{LoadError, MissingIsinPolicy};

pub const ISHARES: &str = "ishares";
pub const AMUNDI: &str = "amundi";

/// Zero-based `(row, col)` inside a table body; row 0 is the first row under
/// the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellAnchor {
    pub row: usize,
    pub col: usize,
}

impl CellAnchor {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A label that must appear (case-insensitively) at a fixed cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCheck {
    pub row: usize,
    pub col: usize,
    pub contains: String,
}

/// One workbook holding metadata, holdings and NAV history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkbookLayout {
    #[serde(default)]
    pub info_sheet: usize,
    #[serde(default = "default_holdings_skip_rows")]
    pub holdings_skip_rows: usize,
    #[serde(default = "default_fund_name")]
    pub fund_name: CellAnchor,
    /// `null` disables the field.
    #[serde(default = "default_inception_date")]
    pub inception_date: Option<CellAnchor>,
    #[serde(default = "default_num_securities")]
    pub num_securities: Option<CellAnchor>,
    #[serde(default = "default_nav_sheet")]
    pub nav_sheet: usize,
    #[serde(default = "default_nav_value")]
    pub nav_value: CellAnchor,
    #[serde(default)]
    pub label_checks: Vec<LabelCheck>,
}

fn default_holdings_skip_rows() -> usize {
    7
}

fn default_fund_name() -> CellAnchor {
    CellAnchor::new(0, 0)
}

fn default_inception_date() -> Option<CellAnchor> {
    Some(CellAnchor::new(1, 1))
}

fn default_num_securities() -> Option<CellAnchor> {
    Some(CellAnchor::new(3, 1))
}

fn default_nav_sheet() -> usize {
    2
}

fn default_nav_value() -> CellAnchor {
    CellAnchor::new(0, 2)
}

impl Default for WorkbookLayout {
    fn default() -> Self {
        Self {
            info_sheet: 0,
            holdings_skip_rows: default_holdings_skip_rows(),
            fund_name: default_fund_name(),
            inception_date: default_inception_date(),
            num_securities: default_num_securities(),
            nav_sheet: default_nav_sheet(),
            nav_value: default_nav_value(),
            label_checks: Vec::new(),
        }
    }
}

/// A delimited file with a preamble of `skip_rows` lines before its header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimitedSection {
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(flatten)]
    pub format: DelimitedFormat,
}

/// Holdings and NAV published as two separate delimited files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitDelimitedLayout {
    pub holdings: DelimitedSection,
    #[serde(default = "default_leading_columns")]
    pub holdings_drop_leading_columns: usize,
    pub nav: DelimitedSection,
    /// `[date, value]` column positions in the NAV table.
    #[serde(default = "default_nav_columns")]
    pub nav_columns: [usize; 2],
}

fn default_leading_columns() -> usize {
    1
}

fn default_nav_columns() -> [usize; 2] {
    [1, 2]
}

impl Default for SplitDelimitedLayout {
    fn default() -> Self {
        Self {
            holdings: DelimitedSection {
                skip_rows: 19,
                format: DelimitedFormat::new(';', "utf-8"),
            },
            holdings_drop_leading_columns: default_leading_columns(),
            nav: DelimitedSection {
                skip_rows: 26,
                format: DelimitedFormat::new(';', "latin1"),
            },
            nav_columns: default_nav_columns(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLayout {
    Workbook(WorkbookLayout),
    SplitDelimited(SplitDelimitedLayout),
}

impl SourceLayout {
    /// Number of files one load takes.
    pub fn source_count(&self) -> usize {
        match self {
            SourceLayout::Workbook(_) => 1,
            SourceLayout::SplitDelimited(_) => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserSpec {
    pub institution: String,
    pub layout: SourceLayout,
    pub columns: ColumnMap,
    #[serde(default)]
    pub missing_isin: MissingIsinPolicy,
}

fn column_map(pairs: &[(&str, CanonicalColumn)]) -> ColumnMap {
    pairs
        .iter()
        .map(|(source, canonical)| (source.to_string(), *canonical))
        .collect()
}

pub fn ishares_spec() -> ParserSpec {
    ParserSpec {
        institution: "iShares".to_string(),
        layout: SourceLayout::Workbook(WorkbookLayout::default()),
        columns: column_map(&[
            ("Ticker dell'emittente", CanonicalColumn::Ticker),
            ("Nome", CanonicalColumn::Name),
            ("Settore", CanonicalColumn::Sector),
            ("Ponderazione (%)", CanonicalColumn::Weight),
            ("Area Geografica", CanonicalColumn::Location),
            ("Asset Class", CanonicalColumn::AssetClass),
            ("Valuta di mercato", CanonicalColumn::Currency),
        ]),
        missing_isin: MissingIsinPolicy::Sentinel,
    }
}

pub fn amundi_spec() -> ParserSpec {
    ParserSpec {
        institution: "Amundi".to_string(),
        layout: SourceLayout::SplitDelimited(SplitDelimitedLayout::default()),
        columns: column_map(&[
            ("Codice ISIN", CanonicalColumn::Ticker),
            ("Nome", CanonicalColumn::Name),
            ("Settore", CanonicalColumn::Sector),
            ("Peso", CanonicalColumn::Weight),
            ("Paese", CanonicalColumn::Location),
            ("Asset class", CanonicalColumn::AssetClass),
            ("Valuta", CanonicalColumn::Currency),
        ]),
        missing_isin: MissingIsinPolicy::Sentinel,
    }
}

/// Shape of the issuer settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub issuers: BTreeMap<String, ParserSpec>,
}

/// Issuer tag (lower case) → parser spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    issuers: BTreeMap<String, ParserSpec>,
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.insert(ISHARES, ishares_spec());
        registry.insert(AMUNDI, amundi_spec());
        registry
    }

    pub fn insert(&mut self, tag: &str, spec: ParserSpec) -> Option<ParserSpec> {
        self.issuers.insert(normalize_tag(tag), spec)
    }

    /// Adds the file's issuers, replacing built-ins that share a tag.
    pub fn merge(&mut self, file: RegistryFile) {
        for (tag, spec) in file.issuers {
            if self.insert(&tag, spec).is_some() {
                tracing::debug!(issuer = %tag, "issuer spec overridden");
            }
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.issuers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.issuers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issuers.is_empty()
    }

    pub fn spec(&self, tag: &str) -> Result<&ParserSpec, LoadError> {
        self.issuers
            .get(&normalize_tag(tag))
            .ok_or_else(|| LoadError::UnsupportedIssuer(tag.to_string()))
    }

    /// Picks the parser implementation for an issuer.
    pub fn parser(&self, tag: &str) -> Result<Box<dyn IssuerParser + '_>, LoadError> {
        let key = normalize_tag(tag);
        let (name, spec) = self
            .issuers
            .get_key_value(&key)
            .ok_or_else(|| LoadError::UnsupportedIssuer(tag.to_string()))?;

        let parser: Box<dyn IssuerParser + '_> = match &spec.layout {
            SourceLayout::Workbook(layout) => Box::new(WorkbookParser::new(name, layout, spec)),
            SourceLayout::SplitDelimited(layout) => {
                Box::new(SplitDelimitedParser::new(name, layout, spec))
            }
        };
        Ok(parser)
    }

    pub fn load(
        &self,
        reader: &dyn GridReader,
        tag: &str,
        sources: &[PathBuf],
    ) -> Result<FundSnapshot, LoadError> {
        self.parser(tag)?.load(reader, sources)
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}
