//! How much of one fund is also held by another.

use models::{CanonicalColumn, FundSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How repeated keys are matched in [`weighted_overlap_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// Every row of one side pairs with every row of the other sharing its
    /// key, as a relational inner join does.
    #[default]
    Join,
    /// Weights are summed per key on both sides before matching.
    SumByKey,
}

/// Key of every holding row, `None` for null or blank keys.
///
/// A column that is not canonical falls back to row positions.
fn row_keys(snapshot: &FundSnapshot, key_column: &str) -> Vec<Option<String>> {
    let holdings = snapshot.holdings();
    match key_column.parse::<CanonicalColumn>() {
        Ok(column) => holdings
            .iter()
            .map(|h| {
                h.field(column)
                    .map(|k| k.into_owned())
                    .filter(|k| !k.is_empty())
            })
            .collect(),
        Err(_) => {
            tracing::debug!(key_column, "not a holdings column; matching by row position");
            (0..holdings.len()).map(|i| Some(i.to_string())).collect()
        }
    }
}

fn distinct_keys(snapshot: &FundSnapshot, key_column: &str) -> HashSet<String> {
    row_keys(snapshot, key_column).into_iter().flatten().collect()
}

/// Share of `a`'s distinct keys also present in `b`, in percent.
///
/// Not symmetric. Null and blank keys are never counted, so an `a` without
/// keys overlaps nothing: a non-empty fund whose keys are all blank gives 0
/// even against itself.
pub fn overlap_pct(a: &FundSnapshot, b: &FundSnapshot, key_column: &str) -> f64 {
    let keys_a = distinct_keys(a, key_column);
    if keys_a.is_empty() {
        return 0.0;
    }
    let keys_b = distinct_keys(b, key_column);

    let shared = keys_a.iter().filter(|k| keys_b.contains(*k)).count();
    shared as f64 / keys_a.len() as f64 * 100.0
}

/// Weight of each fund held in common with the other, `(pct_a, pct_b)`.
pub fn weighted_overlap(
    a: &FundSnapshot,
    b: &FundSnapshot,
    key_column: &str,
    weight_column: &str,
) -> (f64, f64) {
    weighted_overlap_with(a, b, key_column, weight_column, DuplicateKeyPolicy::default())
}

/// [`weighted_overlap`] with an explicit policy for repeated keys.
///
/// Each side is the matched weight over that side's total weight, clamped to
/// `[0, 100]`. Null weights count as 0; a side with zero total gives 0. Only
/// the `Weight` column is numeric, so any other weight column gives `(0, 0)`.
pub fn weighted_overlap_with(
    a: &FundSnapshot,
    b: &FundSnapshot,
    key_column: &str,
    weight_column: &str,
    policy: DuplicateKeyPolicy,
) -> (f64, f64) {
    if weight_column.parse::<CanonicalColumn>() != Ok(CanonicalColumn::Weight) {
        tracing::debug!(weight_column, "weight column is not numeric");
        return (0.0, 0.0);
    }

    let mut rows_a = keyed_weights(a, key_column);
    let mut rows_b = keyed_weights(b, key_column);
    if policy == DuplicateKeyPolicy::SumByKey {
        rows_a = sum_by_key(rows_a);
        rows_b = sum_by_key(rows_b);
    }

    let counts_a = key_counts(&rows_a);
    let counts_b = key_counts(&rows_b);

    (
        matched_share(&rows_a, &counts_b),
        matched_share(&rows_b, &counts_a),
    )
}

fn keyed_weights(snapshot: &FundSnapshot, key_column: &str) -> Vec<(Option<String>, f64)> {
    row_keys(snapshot, key_column)
        .into_iter()
        .zip(snapshot.holdings())
        .map(|(key, h)| (key, h.weight.unwrap_or(0.0)))
        .collect()
}

/// One row per key, in first-seen order. Null-key rows are kept apart.
fn sum_by_key(rows: Vec<(Option<String>, f64)>) -> Vec<(Option<String>, f64)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<(Option<String>, f64)> = Vec::with_capacity(rows.len());
    for (key, weight) in rows {
        match key {
            Some(k) => match index.get(&k) {
                Some(&i) => out[i].1 += weight,
                None => {
                    index.insert(k.clone(), out.len());
                    out.push((Some(k), weight));
                }
            },
            None => out.push((None, weight)),
        }
    }
    out
}

fn key_counts(rows: &[(Option<String>, f64)]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for key in rows.iter().filter_map(|(k, _)| k.as_deref()) {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Joined weight of `rows` over their total, in percent.
///
/// A total that is zero or overflows gives 0.
fn matched_share(rows: &[(Option<String>, f64)], other: &HashMap<&str, usize>) -> f64 {
    let total: f64 = rows.iter().map(|(_, w)| w).sum();
    if total == 0.0 || !total.is_finite() {
        return 0.0;
    }

    let joined: f64 = rows
        .iter()
        .filter_map(|(k, w)| {
            let matches = other.get(k.as_deref()?)?;
            Some(w * *matches as f64)
        })
        .sum();

    let share = joined / total * 100.0;
    if share.is_nan() {
        return 0.0;
    }
    share.clamp(0.0, 100.0)
}
