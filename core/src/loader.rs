//! Scoring-population builder: master features for the target period,
//! restricted to the top-risk fraction of the scored population.

use crate::{
    config::ScoringConfig,
    error::{LabelError, LabelResult},
    features,
    model::ScoringFrame,
    store::TableStore,
    types::ClientId,
};
use std::collections::HashMap;

/// Number of monthly take-rate lags regenerated from history.
pub const TAKE_RATE_LAGS: usize = 6;

/// Build the scoring frame for the configured period.
///
/// Guarantees exactly one row per selected client; clients below the
/// risk threshold never appear downstream. Ties at the threshold are
/// included (>=, not >).
pub fn build_scoring_frame(
    store: &TableStore,
    config: &ScoringConfig,
) -> LabelResult<ScoringFrame> {
    let period = config.target_period;

    let mut history = store.master_history()?;

    // Upstream feature jobs may have left stale take-rate lags on the
    // master table; clear them and regenerate the full set from
    // history, per client, ordered by period.
    for row in history.iter_mut() {
        row.take_rate_lag = [None; TAKE_RATE_LAGS];
    }
    features::create_lag_features(
        &mut history,
        |r| r.client_id.clone(),
        |r| r.period,
        |r| r.take_rate,
        |r, lag, v| r.take_rate_lag[lag - 1] = v,
        TAKE_RATE_LAGS,
    );

    let predictions = store.predictions_for_period(period)?;
    let scores: Vec<f64> = predictions.iter().map(|(_, s)| *s).collect();
    let threshold = features::quantile(&scores, 1.0 - config.top_risk_fraction)
        .ok_or(LabelError::EmptyPopulation { period })?;

    // Select at-or-above-threshold clients, keeping the first score
    // seen per client (the prediction table may hold duplicates).
    let mut selected: HashMap<ClientId, f64> = HashMap::new();
    for (client_id, score) in predictions {
        if score >= threshold {
            selected.entry(client_id).or_insert(score);
        }
    }

    let rows: Vec<_> = history
        .into_iter()
        .filter(|r| r.period == period)
        .filter_map(|mut row| {
            selected.get(&row.client_id).map(|score| {
                row.risk_score = Some(*score);
                row.archetype = None;
                row
            })
        })
        .collect();

    log::info!(
        "period={period} loader: {} clients selected (threshold={threshold:.4}, fraction={})",
        rows.len(),
        config.top_risk_fraction,
    );

    Ok(ScoringFrame { period, rows })
}
