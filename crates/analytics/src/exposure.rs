use models::{CanonicalColumn, FundSnapshot, Holding};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Total weight of one group of holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    /// `None` collects holdings with no value in the grouping column.
    pub group: Option<String>,
    pub weight: f64,
}

/// Sums holding weights per distinct value of `group_column`.
///
/// Null weights count as 0. An unknown column gives an empty result. Rows
/// are sorted by weight, heaviest first, then by group with `None` last.
pub fn exposure_by(snapshot: &FundSnapshot, group_column: &str) -> Vec<Exposure> {
    match group_column.parse::<CanonicalColumn>() {
        Ok(column) => exposure_by_column(snapshot.holdings(), column),
        Err(e) => {
            tracing::debug!(fund = snapshot.fund_name(), "{e}; no exposure");
            Vec::new()
        }
    }
}

pub fn exposure_by_column(holdings: &[Holding], column: CanonicalColumn) -> Vec<Exposure> {
    let mut totals: BTreeMap<Option<String>, f64> = BTreeMap::new();
    for holding in holdings {
        let group = holding.field(column).map(|g| g.into_owned());
        *totals.entry(group).or_insert(0.0) += holding.weight.unwrap_or(0.0);
    }

    let mut exposures: Vec<Exposure> = totals
        .into_iter()
        .map(|(group, weight)| Exposure { group, weight })
        .collect();
    exposures.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then_with(|| nulls_last(&a.group, &b.group))
    });
    exposures
}

fn nulls_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
