mod table;

pub use table::{Cell, Grid, Table};

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The seven columns every canonical holdings table exposes, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalColumn {
    Ticker,
    Name,
    Sector,
    #[serde(rename = "Asset_Class")]
    AssetClass,
    Weight,
    Location,
    Currency,
}

impl CanonicalColumn {
    pub const ALL: [CanonicalColumn; 7] = [
        CanonicalColumn::Ticker,
        CanonicalColumn::Name,
        CanonicalColumn::Sector,
        CanonicalColumn::AssetClass,
        CanonicalColumn::Weight,
        CanonicalColumn::Location,
        CanonicalColumn::Currency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalColumn::Ticker => "Ticker",
            CanonicalColumn::Name => "Name",
            CanonicalColumn::Sector => "Sector",
            CanonicalColumn::AssetClass => "Asset_Class",
            CanonicalColumn::Weight => "Weight",
            CanonicalColumn::Location => "Location",
            CanonicalColumn::Currency => "Currency",
        }
    }
}

impl fmt::Display for CanonicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownColumn(pub String);

impl fmt::Display for UnknownColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a canonical holdings column", self.0)
    }
}

impl std::error::Error for UnknownColumn {}

impl FromStr for CanonicalColumn {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalColumn::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

/// One row of a canonical holdings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Sector")]
    pub sector: Option<String>,
    #[serde(rename = "Asset_Class")]
    pub asset_class: Option<String>,
    /// Percentage on a 0-100 scale; `None` when the source cell did not coerce.
    #[serde(rename = "Weight")]
    pub weight: Option<f64>,
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "Currency")]
    pub currency: Option<String>,
}

impl Holding {
    /// Value of any canonical column as text, `None` when null.
    pub fn field(&self, column: CanonicalColumn) -> Option<Cow<'_, str>> {
        match column {
            CanonicalColumn::Ticker => Some(Cow::Borrowed(self.ticker.as_str())),
            CanonicalColumn::Name => Some(Cow::Borrowed(self.name.as_str())),
            CanonicalColumn::Sector => self.sector.as_deref().map(Cow::Borrowed),
            CanonicalColumn::AssetClass => self.asset_class.as_deref().map(Cow::Borrowed),
            CanonicalColumn::Weight => self.weight.map(|w| Cow::Owned(table::format_number(w))),
            CanonicalColumn::Location => self.location.as_deref().map(Cow::Borrowed),
            CanonicalColumn::Currency => self.currency.as_deref().map(Cow::Borrowed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundMetadata {
    pub fund_name: String,
    /// Net asset value or the issuer's equivalent.
    pub curr_value: f64,
    pub inception_date: Option<String>,
    pub num_securities: Option<u64>,
    pub isin: Option<String>,
}

impl FundMetadata {
    pub fn new(fund_name: impl Into<String>, curr_value: f64) -> Self {
        Self {
            fund_name: fund_name.into(),
            curr_value,
            inception_date: None,
            num_securities: None,
            isin: None,
        }
    }
}

/// Price history as the issuer publishes it; not unified across issuers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum History {
    Nav(f64),
    Table(Table),
}

/// Soft failures absorbed while loading one fund.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadDiagnostics {
    /// Weight cells that failed numeric coercion and became null.
    pub coerced_weights: usize,
    /// Optional metadata cells that failed coercion.
    pub coerced_fields: usize,
    /// Rows discarded by the issuer's missing-value policy.
    pub dropped_rows: usize,
    pub warnings: Vec<String>,
}

impl LoadDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.coerced_weights == 0 && self.coerced_fields == 0 && self.warnings.is_empty()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Canonical data for one fund at one point in time.
///
/// Built once per load and never modified afterwards: there are no mutable
/// accessors, and analytics only ever borrow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundSnapshot {
    issuer: String,
    sources: Vec<PathBuf>,
    metadata: FundMetadata,
    holdings: Vec<Holding>,
    history: History,
    diagnostics: LoadDiagnostics,
}

impl FundSnapshot {
    pub fn new(
        issuer: impl Into<String>,
        metadata: FundMetadata,
        holdings: Vec<Holding>,
        history: History,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            sources: Vec::new(),
            metadata,
            holdings,
            history,
            diagnostics: LoadDiagnostics::default(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: LoadDiagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn metadata(&self) -> &FundMetadata {
        &self.metadata
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn diagnostics(&self) -> &LoadDiagnostics {
        &self.diagnostics
    }

    pub fn fund_name(&self) -> &str {
        &self.metadata.fund_name
    }

    /// Sum of all non-null weights.
    pub fn total_weight(&self) -> f64 {
        self.holdings.iter().filter_map(|h| h.weight).sum()
    }
}
