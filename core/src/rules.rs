//! The nine archetype rule evaluators.
//!
//! RULES:
//!   - A rule only labels rows whose archetype is still unset. The
//!     single exception is Insatisfeito, which may overwrite a
//!     Bercario label because dissatisfaction is the stronger signal.
//!   - Group-relative thresholds (p10/p40/p60/p90, medians) are
//!     computed per run from the frame itself; an empty peer group
//!     produces no threshold and the predicate evaluates false.

use crate::{
    config::ScoringConfig,
    error::LabelResult,
    features,
    joiners,
    model::{Archetype, ClientRow, GdcKey, ScoringFrame},
    rule::LabelRule,
    store::TableStore,
};
use std::collections::HashMap;

/// Consecutive take-rate delta pairs derived once per run (0↔1 .. 4↔5).
pub const GROWTH_PAIRS: usize = 5;

/// Peer groups at or below this size are excluded from the small-group
/// stratification in the Sitiado rule.
const MIN_GDC_SIZE: f64 = 5.0;

/// Resolution code meaning the complaint was closed unresolved.
const RESOLUTION_UNRESOLVED: i64 = 2;

/// Relationship status flag for reactivated clients.
const RELATIONSHIP_REACTIVATED: &str = "vagalume";

/// Aging cutoff (months) separating newly activated clients.
const AGING_NEW_CLIENT_MONTHS: i64 = 3;

/// Derive the consecutive take-rate deltas used by the Massivado and
/// Oportunista rules. Idempotent, so either rule may call it first.
fn ensure_growth_cols(frame: &mut ScoringFrame) {
    features::create_growth_cols(
        &mut frame.rows,
        |r, lag| r.take_rate_at(lag),
        |r, pair, v| r.take_rate_delta[pair] = v,
        GROWTH_PAIRS,
    );
}

/// Per-peer-group quantile of one-signed take-rate deltas for the two
/// most recent lag pairs. `sign` selects which deltas enter the
/// reference population (+1 growth for Massivado, -1 drops for
/// Oportunista).
fn delta_thresholds(
    frame: &ScoringFrame,
    sign: f64,
    q: f64,
) -> Vec<HashMap<GdcKey, f64>> {
    (0..2)
        .map(|pair| {
            features::grouped_quantile(
                frame.rows.iter().filter_map(|r| match r.take_rate_delta[pair] {
                    Some(d) if d * sign > 0.0 => Some((r.gdc_key(), d)),
                    _ => None,
                }),
                q,
            )
        })
        .collect()
}

// ── Rule 1: bercario ─────────────────────────────────────────────────────────

/// Newly activated clients: aging of three months or less.
pub struct BercarioRule;

impl LabelRule for BercarioRule {
    fn name(&self) -> &'static str {
        "bercario"
    }

    fn apply(
        &self,
        frame: &mut ScoringFrame,
        _store: &TableStore,
        _config: &ScoringConfig,
    ) -> LabelResult<()> {
        let mut labeled = 0usize;
        for row in frame.rows.iter_mut() {
            if row.archetype.is_none() && row.aging_months <= AGING_NEW_CLIENT_MONTHS {
                row.archetype = Some(Archetype::Bercario);
                labeled += 1;
            }
        }
        log::debug!("period={} rule=bercario: {labeled} labeled", frame.period);
        Ok(())
    }
}

// ── Rule 2: insatisfeito ─────────────────────────────────────────────────────

/// Dissatisfied clients: complaints, low service/satisfaction scores
/// or unresolved complaints in any of the last three months. May
/// overwrite a bercario label. Also fills the trailing-3-month
/// complaint sum for every row with complaint activity, independent
/// of labeling.
pub struct InsatisfeitoRule;

impl LabelRule for InsatisfeitoRule {
    fn name(&self) -> &'static str {
        "insatisfeito"
    }

    fn apply(
        &self,
        frame: &mut ScoringFrame,
        _store: &TableStore,
        _config: &ScoringConfig,
    ) -> LabelResult<()> {
        let mut labeled = 0usize;
        let mut overridden = 0usize;

        for row in frame.rows.iter_mut() {
            let has_complaints = (0..3)
                .any(|l| row.complaints[l].map_or(false, |c| c > 0.0));

            if has_complaints {
                row.complaints_l3m =
                    Some(row.complaints.iter().map(|c| c.unwrap_or(0.0)).sum());
            }

            let dissatisfied = has_complaints
                || (0..3).any(|l| row.service_score[l].map_or(false, |v| v <= 5.0))
                || (0..3).any(|l| row.resolution_code[l] == Some(RESOLUTION_UNRESOLVED))
                || (0..3).any(|l| row.satisfaction[l].map_or(false, |v| v <= 5.0));

            if dissatisfied
                && matches!(row.archetype, None | Some(Archetype::Bercario))
            {
                if row.archetype == Some(Archetype::Bercario) {
                    overridden += 1;
                }
                row.archetype = Some(Archetype::Insatisfeito);
                labeled += 1;
            }
        }

        log::debug!(
            "period={} rule=insatisfeito: {labeled} labeled ({overridden} overrode bercario)",
            frame.period,
        );
        Ok(())
    }
}

// ── Rule 3: massivado ────────────────────────────────────────────────────────

/// Clients hit by a broad repricing: take-rate growth in one of the
/// two most recent month pairs strictly above the peer group's 90th
/// percentile of positive growth for that same pair.
pub struct MassivadoRule;

impl LabelRule for MassivadoRule {
    fn name(&self) -> &'static str {
        "massivado"
    }

    fn apply(
        &self,
        frame: &mut ScoringFrame,
        _store: &TableStore,
        _config: &ScoringConfig,
    ) -> LabelResult<()> {
        ensure_growth_cols(frame);
        let p90 = delta_thresholds(frame, 1.0, 0.9);

        let mut labeled = 0usize;
        for row in frame.rows.iter_mut() {
            if row.archetype.is_some() {
                continue;
            }
            let gdc = row.gdc_key();
            let hit = (0..2).any(|pair| {
                match (row.take_rate_delta[pair], p90[pair].get(&gdc)) {
                    (Some(d), Some(&threshold)) => d > 0.0 && d > threshold,
                    _ => false,
                }
            });
            if hit {
                row.archetype = Some(Archetype::Massivado);
                labeled += 1;
            }
        }

        log::debug!("period={} rule=massivado: {labeled} labeled", frame.period);
        Ok(())
    }
}

// ── Rule 4: sitiado ──────────────────────────────────────────────────────────

/// Clients in peer groups whose churn is accelerating faster than the
/// stratum median, evaluated separately for small and large peer
/// groups. The large-stratum comparison (>= at lag1, <= at lag2) is
/// replicated verbatim from the upstream rule set; see DESIGN.md.
pub struct SitiadoRule;

impl SitiadoRule {
    fn label_stratum(
        frame: &mut ScoringFrame,
        in_stratum: impl Fn(&ClientRow) -> bool,
    ) -> usize {
        let accels: Vec<f64> = frame
            .rows
            .iter()
            .filter(|r| in_stratum(r))
            .filter_map(|r| r.churn_acceleration())
            .collect();
        let Some(med) = features::median(&accels) else {
            return 0;
        };

        let mut labeled = 0usize;
        for row in frame.rows.iter_mut() {
            if row.archetype.is_some() || !in_stratum(row) {
                continue;
            }
            if let Some(accel) = row.churn_acceleration() {
                if accel > 0.0 && accel > med {
                    row.archetype = Some(Archetype::Sitiado);
                    labeled += 1;
                }
            }
        }
        labeled
    }
}

impl LabelRule for SitiadoRule {
    fn name(&self) -> &'static str {
        "sitiado"
    }

    fn apply(
        &self,
        frame: &mut ScoringFrame,
        _store: &TableStore,
        _config: &ScoringConfig,
    ) -> LabelResult<()> {
        let sizes_l1: Vec<f64> = frame.rows.iter().filter_map(|r| r.gdc_size_l1).collect();
        let sizes_l2: Vec<f64> = frame.rows.iter().filter_map(|r| r.gdc_size_l2).collect();

        let p40_l1 = features::quantile(&sizes_l1, 0.4);
        let p40_l2 = features::quantile(&sizes_l2, 0.4);
        let p60_l1 = features::quantile(&sizes_l1, 0.6);
        let p60_l2 = features::quantile(&sizes_l2, 0.6);

        let small = |r: &ClientRow| match (r.gdc_size_l1, r.gdc_size_l2, p40_l1, p40_l2) {
            (Some(s1), Some(s2), Some(p1), Some(p2)) => {
                s1 > MIN_GDC_SIZE && s2 > MIN_GDC_SIZE && s1 <= p1 && s2 <= p2
            }
            _ => false,
        };
        let large = |r: &ClientRow| match (r.gdc_size_l1, r.gdc_size_l2, p60_l1, p60_l2) {
            (Some(s1), Some(s2), Some(p1), Some(p2)) => s1 >= p1 && s2 <= p2,
            _ => false,
        };

        let labeled =
            Self::label_stratum(frame, small) + Self::label_stratum(frame, large);

        log::debug!("period={} rule=sitiado: {labeled} labeled", frame.period);
        Ok(())
    }
}

// ── Rule 5: infiel ───────────────────────────────────────────────────────────

/// Clients whose product or card-brand mix sits outside their peer
/// group's p10..p90 band. Joins the product-info table first.
pub struct InfielRule;

impl LabelRule for InfielRule {
    fn name(&self) -> &'static str {
        "infiel"
    }

    fn apply(
        &self,
        frame: &mut ScoringFrame,
        store: &TableStore,
        _config: &ScoringConfig,
    ) -> LabelResult<()> {
        joiners::join_product_mix(frame, store)?;

        let mut labeled = 0usize;
        for row in frame.rows.iter_mut() {
            if row.archetype.is_none() && row.conc_mix == 1 {
                row.archetype = Some(Archetype::Infiel);
                labeled += 1;
            }
        }

        log::debug!("period={} rule=infiel: {labeled} labeled", frame.period);
        Ok(())
    }
}

// ── Rule 6: oportunista ──────────────────────────────────────────────────────

/// Clients shopping around: a recent take-rate drop more extreme than
/// the peer group's 10th percentile of drops, plus fee-simulation
/// activity in the trailing 6 months. Joins the simulation history
/// first.
pub struct OportunistaRule;

impl LabelRule for OportunistaRule {
    fn name(&self) -> &'static str {
        "oportunista"
    }

    fn apply(
        &self,
        frame: &mut ScoringFrame,
        store: &TableStore,
        _config: &ScoringConfig,
    ) -> LabelResult<()> {
        ensure_growth_cols(frame);
        joiners::join_simulations(frame, store)?;

        let p10 = delta_thresholds(frame, -1.0, 0.1);

        let mut labeled = 0usize;
        for row in frame.rows.iter_mut() {
            if row.archetype.is_some() {
                continue;
            }
            let gdc = row.gdc_key();
            let dropped = (0..2).any(|pair| {
                match (row.take_rate_delta[pair], p10[pair].get(&gdc)) {
                    (Some(d), Some(&threshold)) => d < 0.0 && d < threshold,
                    _ => false,
                }
            });
            if dropped && row.simulations_6m > 0 {
                row.archetype = Some(Archetype::Oportunista);
                labeled += 1;
            }
        }

        log::debug!("period={} rule=oportunista: {labeled} labeled", frame.period);
        Ok(())
    }
}

// ── Rule 7: vagalume ─────────────────────────────────────────────────────────

/// Reactivated clients past the new-client window.
pub struct VagalumeRule;

impl LabelRule for VagalumeRule {
    fn name(&self) -> &'static str {
        "vagalume"
    }

    fn apply(
        &self,
        frame: &mut ScoringFrame,
        _store: &TableStore,
        _config: &ScoringConfig,
    ) -> LabelResult<()> {
        let mut labeled = 0usize;
        for row in frame.rows.iter_mut() {
            if row.archetype.is_none()
                && row.relationship_status == RELATIONSHIP_REACTIVATED
                && row.aging_months > AGING_NEW_CLIENT_MONTHS
            {
                row.archetype = Some(Archetype::Vagalume);
                labeled += 1;
            }
        }
        log::debug!("period={} rule=vagalume: {labeled} labeled", frame.period);
        Ok(())
    }
}

// ── Rule 8: abandonado ───────────────────────────────────────────────────────

/// Clients with zero visits across the current and two prior months
/// (missing counts treated as zero).
pub struct AbandonadoRule;

impl LabelRule for AbandonadoRule {
    fn name(&self) -> &'static str {
        "abandonado"
    }

    fn apply(
        &self,
        frame: &mut ScoringFrame,
        _store: &TableStore,
        _config: &ScoringConfig,
    ) -> LabelResult<()> {
        let mut labeled = 0usize;
        for row in frame.rows.iter_mut() {
            let visits: f64 = row.visits.iter().map(|v| v.unwrap_or(0.0)).sum();
            if row.archetype.is_none() && visits == 0.0 {
                row.archetype = Some(Archetype::Abandonado);
                labeled += 1;
            }
        }
        log::debug!("period={} rule=abandonado: {labeled} labeled", frame.period);
        Ok(())
    }
}

// ── Rule 9: incognito (fallback) ─────────────────────────────────────────────

/// Default label for every client no earlier rule matched. After this
/// rule no row is unlabeled.
pub struct IncognitoRule;

impl LabelRule for IncognitoRule {
    fn name(&self) -> &'static str {
        "incognito"
    }

    fn apply(
        &self,
        frame: &mut ScoringFrame,
        _store: &TableStore,
        _config: &ScoringConfig,
    ) -> LabelResult<()> {
        let mut labeled = 0usize;
        for row in frame.rows.iter_mut() {
            if row.archetype.is_none() {
                row.archetype = Some(Archetype::Incognito);
                labeled += 1;
            }
        }
        log::debug!("period={} rule=incognito: {labeled} labeled", frame.period);
        Ok(())
    }
}
