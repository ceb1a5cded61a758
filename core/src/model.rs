//! Core data model: the client-period row, the archetype labels and
//! the shared scoring frame threaded through the rule cascade.

use crate::types::{ChainId, ClientId, Period};
use serde::{Deserialize, Serialize};

// ── Archetypes ───────────────────────────────────────────────────────────────

/// Categorical churn-behavior label. Names are the canonical lowercase
/// strings persisted in the output tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Bercario,
    Insatisfeito,
    Massivado,
    Sitiado,
    Infiel,
    Oportunista,
    Vagalume,
    Abandonado,
    Incognito,
}

impl Archetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Bercario     => "bercario",
            Archetype::Insatisfeito => "insatisfeito",
            Archetype::Massivado    => "massivado",
            Archetype::Sitiado      => "sitiado",
            Archetype::Infiel       => "infiel",
            Archetype::Oportunista  => "oportunista",
            Archetype::Vagalume     => "vagalume",
            Archetype::Abandonado   => "abandonado",
            Archetype::Incognito    => "incognito",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bercario"     => Some(Archetype::Bercario),
            "insatisfeito" => Some(Archetype::Insatisfeito),
            "massivado"    => Some(Archetype::Massivado),
            "sitiado"      => Some(Archetype::Sitiado),
            "infiel"       => Some(Archetype::Infiel),
            "oportunista"  => Some(Archetype::Oportunista),
            "vagalume"     => Some(Archetype::Vagalume),
            "abandonado"   => Some(Archetype::Abandonado),
            "incognito"    => Some(Archetype::Incognito),
            _              => None,
        }
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Client-period row ────────────────────────────────────────────────────────

/// Peer-group key: clients sharing period, sector, state and size
/// bucket form one GDC. Within a single-period frame the period is
/// constant, so the key carries the remaining three attributes.
pub type GdcKey = (String, String, String);

/// One row of the scoring population: master features for a single
/// (client, period) plus the mutable state the cascade fills in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRow {
    pub client_id:           ClientId,
    pub chain_id:            ChainId,
    pub period:              Period,
    pub sector:              String,
    pub uf:                  String,
    pub size_bucket:         String,
    pub aging_months:        i64,
    pub take_rate:           f64,
    pub revenue:             f64,
    pub relationship_status: String,
    // Monthly metrics, index = lag (0 = current month).
    pub complaints:          [Option<f64>; 3],
    pub service_score:       [Option<f64>; 3],
    pub resolution_code:     [Option<i64>; 3],
    pub satisfaction:        [Option<f64>; 3],
    pub visits:              [Option<f64>; 3],
    // Peer-group series: 1-month churn totals and population sizes.
    pub gdc_churn:           [Option<f64>; 3],
    pub gdc_size_l1:         Option<f64>,
    pub gdc_size_l2:         Option<f64>,
    // Derived during scoring.
    pub take_rate_lag:       [Option<f64>; 6],
    pub take_rate_delta:     [Option<f64>; 5],
    pub risk_score:          Option<f64>,
    pub conc_mix:            i64,
    pub simulations_6m:      i64,
    pub complaints_l3m:      Option<f64>,
    pub archetype:           Option<Archetype>,
}

impl ClientRow {
    pub fn gdc_key(&self) -> GdcKey {
        (self.sector.clone(), self.uf.clone(), self.size_bucket.clone())
    }

    /// Take rate at `lag` months back; lag 0 is the unlagged column.
    pub fn take_rate_at(&self, lag: usize) -> Option<f64> {
        if lag == 0 {
            Some(self.take_rate)
        } else {
            self.take_rate_lag.get(lag - 1).copied().flatten()
        }
    }

    /// Churn-rate acceleration: month-over-month change of the peer
    /// group's 1-month churn delta. Requires all three churn totals.
    pub fn churn_acceleration(&self) -> Option<f64> {
        match (self.gdc_churn[0], self.gdc_churn[1], self.gdc_churn[2]) {
            (Some(c0), Some(c1), Some(c2)) => Some((c0 - c1) - (c1 - c2)),
            _ => None,
        }
    }
}

// ── Scoring frame ────────────────────────────────────────────────────────────

/// The shared, mutable accumulator passed through the whole cascade.
/// Every row belongs to the same scoring period.
#[derive(Debug, Clone)]
pub struct ScoringFrame {
    pub period: Period,
    pub rows:   Vec<ClientRow>,
}

impl ScoringFrame {
    pub fn labeled_count(&self) -> usize {
        self.rows.iter().filter(|r| r.archetype.is_some()).count()
    }

    /// Per-archetype row counts, sorted descending then by name.
    pub fn archetype_counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts: std::collections::HashMap<&'static str, usize> =
            std::collections::HashMap::new();
        for row in &self.rows {
            if let Some(a) = row.archetype {
                *counts.entry(a.as_str()).or_insert(0) += 1;
            }
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        counts
    }
}

// ── Chain rollup ─────────────────────────────────────────────────────────────

/// One row of the chain-level output: the archetype carrying the
/// largest summed captured revenue among the chain's clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRollup {
    pub chain_id:  ChainId,
    pub archetype: Archetype,
    pub revenue:   f64,
}

// ── Run summary ──────────────────────────────────────────────────────────────

/// End-of-run figures returned to the caller (printed by the runner).
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub period:           Period,
    pub clients_scored:   usize,
    pub archetype_counts: Vec<(String, usize)>,
    pub chains_written:   usize,
}
