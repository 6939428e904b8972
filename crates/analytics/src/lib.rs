//! Exposure and overlap figures over loaded [`FundSnapshot`]s.
//!
//! Every function borrows its snapshots and returns plain values; nothing
//! here mutates a snapshot or fails on empty input.
//!
//! [`FundSnapshot`]: models::FundSnapshot

pub mod exposure;
pub mod overlap;
pub mod summary;

pub use exposure::{exposure_by, Exposure};
pub use overlap::{overlap_pct, weighted_overlap, weighted_overlap_with, DuplicateKeyPolicy};
pub use summary::{overlap_charts, FundSummary, OverlapMode, OverlapReport, PieChart, Presenter};

#[cfg(test)]
pub(crate) mod fixtures {
    use models::{FundMetadata, FundSnapshot, History, Holding};

    pub fn holding(ticker: &str, location: Option<&str>, weight: Option<f64>) -> Holding {
        Holding {
            ticker: ticker.to_string(),
            name: format!("{ticker} Corp"),
            sector: Some("Information Technology".to_string()),
            asset_class: Some("Equity".to_string()),
            weight,
            location: location.map(str::to_string),
            currency: Some("USD".to_string()),
        }
    }

    pub fn fund(name: &str, holdings: Vec<Holding>) -> FundSnapshot {
        FundSnapshot::new(
            "test",
            FundMetadata::new(name, 100.0),
            holdings,
            History::Nav(100.0),
        )
    }
}
