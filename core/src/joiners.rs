//! Auxiliary-table joiners: reduce an external table to one
//! summarizing value per client and left-join it onto the frame.
//! Clients absent from the auxiliary table default to 0 — a missing
//! join never nulls out the row.

use crate::{
    error::LabelResult,
    features,
    model::ScoringFrame,
    store::{ProdInfoRecord, TableStore},
    types::{months_back, ClientId},
};
use std::collections::HashMap;

/// Trailing window for simulation-history sums, target period inclusive.
pub const SIMULATION_WINDOW_MONTHS: u32 = 6;

/// Load the product-info table for the frame's period, flag clients
/// whose product/brand mix falls outside their peer group's p10..p90
/// band, and left-join the combined binary `conc_mix` flag.
pub fn join_product_mix(frame: &mut ScoringFrame, store: &TableStore) -> LabelResult<()> {
    let records = store.prod_info_for_period(frame.period)?;

    // Peer-group attributes come from the full master table for the
    // period, so the percentile bands reflect every peer and not just
    // the risk-filtered frame.
    let gdc_by_client = store.gdc_attributes_for_period(frame.period)?;

    let mix_cols: [fn(&ProdInfoRecord) -> f64; 4] = [
        |r| r.debit_mix,
        |r| r.credit_mix,
        |r| r.master_mix,
        |r| r.visa_mix,
    ];

    // flags[i] = out-of-band flag per client for mix column i
    // (0..2 product-type mix, 2..4 card-brand mix).
    let mut flags: [HashMap<ClientId, i64>; 4] = Default::default();
    for (i, get_mix) in mix_cols.iter().enumerate() {
        let pairs = || {
            records.iter().filter_map(|rec| {
                gdc_by_client
                    .get(&rec.client_id)
                    .map(|gdc| (gdc.clone(), get_mix(rec)))
            })
        };
        let p10 = features::grouped_quantile(pairs(), 0.1);
        let p90 = features::grouped_quantile(pairs(), 0.9);

        for rec in &records {
            let Some(gdc) = gdc_by_client.get(&rec.client_id) else {
                continue;
            };
            let value = get_mix(rec);
            let out_of_band = match (p10.get(gdc), p90.get(gdc)) {
                (Some(&lo), Some(&hi)) => value < lo || value > hi,
                _ => false,
            };
            if out_of_band {
                flags[i].insert(rec.client_id.clone(), 1);
            }
        }
    }

    let mut joined = 0usize;
    for row in frame.rows.iter_mut() {
        let flag: Vec<i64> = flags
            .iter()
            .map(|f| f.get(&row.client_id).copied().unwrap_or(0))
            .collect();
        let conc_mix_prod = (flag[0] + flag[1]).min(1);
        let conc_mix_band = (flag[2] + flag[3]).min(1);
        row.conc_mix = (conc_mix_prod + conc_mix_band).min(1);
        if row.conc_mix == 1 {
            joined += 1;
        }
    }

    log::debug!(
        "period={} join: prod mix, {} records, {} concentrated clients",
        frame.period,
        records.len(),
        joined,
    );
    Ok(())
}

/// Sum simulation counts per client over the trailing 6-month window
/// ending at the frame's period and left-join onto the frame.
pub fn join_simulations(frame: &mut ScoringFrame, store: &TableStore) -> LabelResult<()> {
    let from = months_back(frame.period, SIMULATION_WINDOW_MONTHS - 1);
    let totals = store.simulation_totals(from, frame.period)?;

    for row in frame.rows.iter_mut() {
        row.simulations_6m = totals.get(&row.client_id).copied().unwrap_or(0);
    }

    log::debug!(
        "period={} join: simulations {from}..={}, {} clients with activity",
        frame.period,
        frame.period,
        totals.len(),
    );
    Ok(())
}
