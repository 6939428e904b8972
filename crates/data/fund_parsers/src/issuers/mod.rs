//! One parser per source layout. Issuers differ only in the [`ParserSpec`]
//! they hand to these.
//!
//! [`ParserSpec`]: crate::ParserSpec

mod split_delimited;
mod workbook;

pub use split_delimited::SplitDelimitedParser;
pub use workbook::WorkbookParser;

use grid_reader::GridReader;
use models::FundSnapshot;
use std::path::PathBuf;

use crate::LoadError;

/// Loads one fund from its issuer's export files.
pub trait IssuerParser {
    /// Issuer tag this parser was built for.
    fn name(&self) -> &str;

    /// Parses metadata, holdings and history. Either every part is read or
    /// the load fails; there is no partial snapshot.
    fn load(&self, reader: &dyn GridReader, sources: &[PathBuf])
        -> Result<FundSnapshot, LoadError>;
}

fn expect_sources(issuer: &str, expected: usize, sources: &[PathBuf]) -> Result<(), LoadError> {
    if sources.len() == expected {
        Ok(())
    } else {
        Err(LoadError::SourceCount {
            issuer: issuer.to_string(),
            expected,
            got: sources.len(),
        })
    }
}

fn log_loaded(snapshot: &FundSnapshot) {
    let diagnostics = snapshot.diagnostics();
    tracing::info!(
        issuer = snapshot.issuer(),
        fund = snapshot.fund_name(),
        curr_value = snapshot.metadata().curr_value,
        holdings = snapshot.holdings().len(),
        coerced_weights = diagnostics.coerced_weights,
        "fund loaded"
    );

    if !diagnostics.is_clean() {
        tracing::warn!(
            issuer = snapshot.issuer(),
            fund = snapshot.fund_name(),
            coerced_weights = diagnostics.coerced_weights,
            coerced_fields = diagnostics.coerced_fields,
            warnings = ?diagnostics.warnings,
            "values coerced to null while loading"
        );
    }
}
