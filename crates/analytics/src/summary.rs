//! Serialisable records for reporting snapshots and overlaps.

use models::{FundSnapshot, History};
use serde::{Deserialize, Serialize};

use crate::overlap::{overlap_pct, weighted_overlap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundSummary {
    pub issuer: String,
    pub fund_name: String,
    pub isin: Option<String>,
    pub inception_date: Option<String>,
    pub num_securities: Option<u64>,
    pub curr_value: f64,
    pub holdings: usize,
    pub total_weight: f64,
    /// Rows in the NAV history, 1 when only the latest value is published.
    pub history_rows: usize,
    pub coerced_weights: usize,
}

impl From<&FundSnapshot> for FundSummary {
    fn from(snapshot: &FundSnapshot) -> Self {
        let meta = snapshot.metadata();
        Self {
            issuer: snapshot.issuer().to_string(),
            fund_name: meta.fund_name.clone(),
            isin: meta.isin.clone(),
            inception_date: meta.inception_date.clone(),
            num_securities: meta.num_securities,
            curr_value: meta.curr_value,
            holdings: snapshot.holdings().len(),
            total_weight: snapshot.total_weight(),
            history_rows: match snapshot.history() {
                History::Nav(_) => 1,
                History::Table(table) => table.height(),
            },
            coerced_weights: snapshot.diagnostics().coerced_weights,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMode {
    /// Share of distinct keys.
    #[default]
    Count,
    /// Share of portfolio weight.
    Weighted,
}

pub const PIE_LABELS: [&str; 2] = ["Overlap", "Unique"];

/// Two-slice pie of one fund: the part shared with `other_fund` and the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChart {
    pub title_fund: String,
    pub other_fund: String,
    pub values: [f64; 2],
    pub labels: [String; 2],
    /// Index of the slice drawn pulled out.
    pub emphasized: Option<usize>,
}

impl PieChart {
    pub fn overlap(title_fund: &str, other_fund: &str, overlap: f64) -> Self {
        Self {
            title_fund: title_fund.to_string(),
            other_fund: other_fund.to_string(),
            values: [overlap, 100.0 - overlap],
            labels: PIE_LABELS.map(String::from),
            emphasized: Some(0),
        }
    }

    pub fn overlap_value(&self) -> f64 {
        self.values[0]
    }
}

/// Overlap in both directions, plus one chart per direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapReport {
    pub key: String,
    pub mode: OverlapMode,
    /// Part of the first fund held by the second.
    pub first_in_second: f64,
    /// Part of the second fund held by the first.
    pub second_in_first: f64,
    pub charts: [PieChart; 2],
}

impl OverlapReport {
    pub fn render(&self, presenter: &dyn Presenter) {
        for chart in &self.charts {
            presenter.render(chart);
        }
    }
}

/// Draws a chart somewhere. Nothing comes back.
pub trait Presenter {
    fn render(&self, chart: &PieChart);
}

pub fn overlap_charts(
    a: &FundSnapshot,
    b: &FundSnapshot,
    key_column: &str,
    mode: OverlapMode,
) -> OverlapReport {
    let (first_in_second, second_in_first) = match mode {
        OverlapMode::Count => (
            overlap_pct(a, b, key_column),
            overlap_pct(b, a, key_column),
        ),
        OverlapMode::Weighted => weighted_overlap(a, b, key_column, "Weight"),
    };

    OverlapReport {
        key: key_column.to_string(),
        mode,
        first_in_second,
        second_in_first,
        charts: [
            PieChart::overlap(a.fund_name(), b.fund_name(), first_in_second),
            PieChart::overlap(b.fund_name(), a.fund_name(), second_in_first),
        ],
    }
}
