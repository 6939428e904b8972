//! # Fund Parsers
//!
//! Loads issuer holdings disclosures into canonical [`FundSnapshot`]s.
//!
//! An issuer is described by a [`ParserSpec`] in a [`Registry`]: which
//! [`SourceLayout`] its exports use, how its column headers map onto the
//! seven canonical columns, and whether an ISIN must be present. Two layouts
//! exist:
//!
//! - [`SourceLayout::Workbook`]: one workbook with an info sheet (metadata at
//!   fixed cells, holdings table below) and a NAV sheet. Built-in: `ishares`.
//! - [`SourceLayout::SplitDelimited`]: a holdings file and a NAV file, both
//!   delimited text; identity comes from the NAV file name. Built-in: `amundi`.
//!
//! ```no_run
//! use fund_parsers::{load_batch, LoadRequest, Registry};
//! use grid_reader::FsGridReader;
//!
//! let registry = Registry::builtin();
//! let results = load_batch(
//!     &registry,
//!     &FsGridReader,
//!     &[LoadRequest::new("ishares", vec!["IWDA_holdings.xlsx".into()])],
//! );
//! for result in results {
//!     match result {
//!         Ok(snapshot) => println!("{}: {} holdings", snapshot.fund_name(), snapshot.holdings().len()),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

pub mod canonical;
mod error;
pub mod filename;
pub mod issuers;
pub mod registry;

pub use canonical::{canonicalize, coerce_weight, parse_decimal, Canonicalized, ColumnMap};
pub use error::{FormatError, LoadError};
pub use filename::{
    extract_identity, FilenameIdentity, MissingIsinPolicy, ResolvedIdentity, UNKNOWN_FUND,
};
pub use issuers::IssuerParser;
pub use registry::{ParserSpec, Registry, RegistryFile, SourceLayout};

use grid_reader::GridReader;
use models::FundSnapshot;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One fund to load: an issuer tag and its source files in layout order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequest {
    pub issuer: String,
    pub sources: Vec<PathBuf>,
}

impl LoadRequest {
    pub fn new(issuer: impl Into<String>, sources: Vec<PathBuf>) -> Self {
        Self {
            issuer: issuer.into(),
            sources,
        }
    }
}

/// Loads a single fund.
pub fn load_snapshot(
    registry: &Registry,
    reader: &dyn GridReader,
    request: &LoadRequest,
) -> Result<FundSnapshot, LoadError> {
    registry.load(reader, &request.issuer, &request.sources)
}

/// Loads independent funds in parallel. Results come back in request order,
/// one per request.
pub fn load_batch(
    registry: &Registry,
    reader: &dyn GridReader,
    requests: &[LoadRequest],
) -> Vec<Result<FundSnapshot, LoadError>> {
    tracing::debug!(funds = requests.len(), "loading batch");
    requests
        .par_iter()
        .map(|request| load_snapshot(registry, reader, request))
        .collect()
}
