//! Reusable feature transforms: per-group lag columns, consecutive
//! growth deltas and (grouped) quantiles.
//!
//! RULES:
//!   - Transforms are pure over the rows they receive; no I/O.
//!   - Insufficient history yields None, never a default value.
//!   - Re-running a transform with the same parameters reproduces the
//!     same columns (idempotent), so stages may call them defensively.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

/// For each group (by `group_key`, ordered by `sort_key`), write the
/// value of `get` from 1..=`num_lags` periods prior into the row via
/// `set_lag(row, lag, value)`. Rows earlier than `lag` positions into
/// their group receive None for that lag.
pub fn create_lag_features<R, K, S>(
    rows: &mut [R],
    group_key: impl Fn(&R) -> K,
    sort_key: impl Fn(&R) -> S,
    get: impl Fn(&R) -> f64,
    set_lag: impl Fn(&mut R, usize, Option<f64>),
    num_lags: usize,
) where
    K: Eq + Hash,
    S: Ord,
{
    let mut groups: HashMap<K, Vec<usize>> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        groups.entry(group_key(row)).or_default().push(i);
    }

    for indices in groups.values_mut() {
        indices.sort_by(|&a, &b| sort_key(&rows[a]).cmp(&sort_key(&rows[b])));
        let series: Vec<f64> = indices.iter().map(|&i| get(&rows[i])).collect();
        for (pos, &i) in indices.iter().enumerate() {
            for lag in 1..=num_lags {
                let value = pos.checked_sub(lag).map(|p| series[p]);
                set_lag(&mut rows[i], lag, value);
            }
        }
    }
}

/// For each consecutive lag pair (0,1)..(`num_periods`-1,`num_periods`),
/// write delta = earlier-lag value minus later-lag value into the row
/// via `set_delta(row, pair, value)`. Lag 0 means the unlagged column.
/// Either missing lag yields None for that pair.
pub fn create_growth_cols<R>(
    rows: &mut [R],
    get_lag: impl Fn(&R, usize) -> Option<f64>,
    set_delta: impl Fn(&mut R, usize, Option<f64>),
    num_periods: usize,
) {
    for row in rows.iter_mut() {
        for pair in 0..num_periods {
            let delta = match (get_lag(row, pair), get_lag(row, pair + 1)) {
                (Some(earlier), Some(later)) => Some(earlier - later),
                _ => None,
            };
            set_delta(row, pair, delta);
        }
    }
}

/// Quantile with linear interpolation between closest ranks.
/// A single value returns itself; an empty slice returns None, which
/// downstream predicates treat as "no match".
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        Some(sorted[lo])
    } else {
        Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Per-group quantile over (key, value) pairs. Groups are never empty
/// by construction; keys absent from the result simply had no values,
/// and predicates referencing them evaluate false.
pub fn grouped_quantile<K>(
    pairs: impl IntoIterator<Item = (K, f64)>,
    q: f64,
) -> HashMap<K, f64>
where
    K: Eq + Hash,
{
    let mut groups: HashMap<K, Vec<f64>> = HashMap::new();
    for (key, value) in pairs {
        groups.entry(key).or_default().push(value);
    }
    groups
        .into_iter()
        .filter_map(|(key, values)| quantile(&values, q).map(|t| (key, t)))
        .collect()
}
