//! Chain-level rollup: collapse the labeled frame into one dominant
//! archetype per merchant chain by total captured revenue.

use crate::model::{Archetype, ChainRollup, ScoringFrame};
use crate::types::ChainId;
use std::collections::HashMap;

/// Group by (chain, archetype), sum revenue, keep per chain the
/// archetype with the largest total. Exact revenue ties are broken by
/// lexicographic archetype name so the output is deterministic.
pub fn dominant_archetypes(frame: &ScoringFrame) -> Vec<ChainRollup> {
    let mut totals: HashMap<(ChainId, Archetype), f64> = HashMap::new();
    for row in &frame.rows {
        if let Some(archetype) = row.archetype {
            *totals
                .entry((row.chain_id.clone(), archetype))
                .or_insert(0.0) += row.revenue;
        }
    }

    let mut best: HashMap<ChainId, (Archetype, f64)> = HashMap::new();
    for ((chain_id, archetype), revenue) in totals {
        let entry = best.entry(chain_id).or_insert((archetype, revenue));
        if revenue > entry.1
            || (revenue == entry.1 && archetype.as_str() < entry.0.as_str())
        {
            *entry = (archetype, revenue);
        }
    }

    let mut rollup: Vec<ChainRollup> = best
        .into_iter()
        .map(|(chain_id, (archetype, revenue))| ChainRollup {
            chain_id,
            archetype,
            revenue,
        })
        .collect();
    rollup.sort_by(|a, b| a.chain_id.cmp(&b.chain_id));
    rollup
}
