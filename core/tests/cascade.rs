use arquetipos_core::config::ScoringConfig;
use arquetipos_core::engine::LabelEngine;
use arquetipos_core::model::{Archetype, ClientRow, ScoringFrame};
use arquetipos_core::store::TableStore;

// ── Helpers ──────────────────────────────────────────────────────────────────

const PERIOD: u32 = 202406;

fn base_row(client: &str, chain: &str) -> ClientRow {
    ClientRow {
        client_id: client.to_string(),
        chain_id: chain.to_string(),
        period: PERIOD,
        sector: "food".to_string(),
        uf: "SP".to_string(),
        size_bucket: "P".to_string(),
        aging_months: 24,
        take_rate: 2.0,
        revenue: 1000.0,
        relationship_status: "ativo".to_string(),
        complaints: [None; 3],
        service_score: [None; 3],
        resolution_code: [None; 3],
        satisfaction: [None; 3],
        visits: [Some(3.0), Some(2.0), Some(4.0)],
        gdc_churn: [None; 3],
        gdc_size_l1: None,
        gdc_size_l2: None,
        take_rate_lag: [None; 6],
        take_rate_delta: [None; 5],
        risk_score: None,
        conc_mix: 0,
        simulations_6m: 0,
        complaints_l3m: None,
        archetype: None,
    }
}

/// Seed the store with the given master rows, one prediction per row,
/// and build an engine that admits the whole population.
fn engine_with(rows: Vec<ClientRow>) -> LabelEngine {
    let store = TableStore::in_memory().unwrap();
    store.migrate().unwrap();
    for row in &rows {
        store.insert_master_row(row).unwrap();
        store.insert_prediction(&row.client_id, PERIOD, 0.9).unwrap();
    }
    let config = ScoringConfig {
        target_period: PERIOD,
        top_risk_fraction: 1.0,
    };
    LabelEngine::build(store, config)
}

fn label_of(engine: &LabelEngine, client: &str) -> Archetype {
    engine
        .store
        .labeled_features(PERIOD)
        .unwrap()
        .into_iter()
        .find(|r| r.client_id == client)
        .and_then(|r| r.archetype)
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// The first matching rule in the cascade wins: a new client with zero
/// visits is bercario, not abandonado, and a reactivated client with
/// zero visits is vagalume, not abandonado.
#[test]
fn first_matching_rule_wins() {
    let mut new_client = base_row("new", "ch1");
    new_client.aging_months = 2;
    new_client.visits = [None; 3];

    let mut reactivated = base_row("back", "ch1");
    reactivated.relationship_status = "vagalume".to_string();
    reactivated.aging_months = 10;
    reactivated.visits = [None; 3];

    let mut engine = engine_with(vec![new_client, reactivated]);
    engine.run().unwrap();

    assert_eq!(label_of(&engine, "new"), Archetype::Bercario);
    assert_eq!(label_of(&engine, "back"), Archetype::Vagalume);
}

/// Dissatisfaction is the one signal allowed to overwrite bercario: a
/// 2-month-old client with complaints ends up insatisfeito, carrying
/// the trailing-3-month complaint sum.
#[test]
fn insatisfeito_overrides_bercario() {
    let mut row = base_row("a", "ch1");
    row.aging_months = 2;
    row.complaints = [Some(3.0), None, None];

    let mut engine = engine_with(vec![row]);
    engine.run().unwrap();

    let records = engine.store.labeled_features(PERIOD).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].archetype, Some(Archetype::Insatisfeito));
    assert_eq!(records[0].complaints_l3m, Some(3.0));
}

/// Dissatisfaction outranks the later relationship-status rule too.
#[test]
fn dissatisfied_reactivated_client_is_insatisfeito() {
    let mut row = base_row("a", "ch1");
    row.relationship_status = "vagalume".to_string();
    row.aging_months = 10;
    row.satisfaction = [None, Some(2.0), None];

    let mut engine = engine_with(vec![row]);
    engine.run().unwrap();

    assert_eq!(label_of(&engine, "a"), Archetype::Insatisfeito);
}

/// Zero visits across the 3-month window, with missing counts treated
/// as zero, lands on abandonado when nothing earlier matched.
#[test]
fn zero_visits_is_abandonado() {
    let mut silent = base_row("silent", "ch1");
    silent.visits = [Some(0.0), None, Some(0.0)];

    let mut engine = engine_with(vec![silent]);
    engine.run().unwrap();

    assert_eq!(label_of(&engine, "silent"), Archetype::Abandonado);
}

/// After the fallback rule every selected client carries a valid
/// archetype; the persisted output is complete.
#[test]
fn every_selected_client_gets_a_label() {
    let mut rows = Vec::new();
    for i in 0..8 {
        rows.push(base_row(&format!("c{i}"), "ch1"));
    }
    rows[1].aging_months = 1;
    rows[2].complaints = [Some(1.0), None, None];
    rows[3].visits = [None; 3];
    rows[4].relationship_status = "vagalume".to_string();

    let mut engine = engine_with(rows);
    let summary = engine.run().unwrap();

    assert_eq!(summary.clients_scored, 8);
    let records = engine.store.labeled_features(PERIOD).unwrap();
    assert_eq!(records.len(), 8);
    for record in &records {
        assert!(
            record.archetype.is_some(),
            "client {} has no label",
            record.client_id,
        );
    }
    // Untouched rows fall through to the fallback.
    assert_eq!(label_of(&engine, "c0"), Archetype::Incognito);
}

/// The run persists both outputs and reports matching figures.
#[test]
fn run_persists_outputs_and_summary() {
    let mut dissatisfied = base_row("a", "ch1");
    dissatisfied.complaints = [Some(2.0), Some(1.0), None];
    let plain = base_row("b", "ch2");

    let mut engine = engine_with(vec![dissatisfied, plain]);
    let summary = engine.run().unwrap();

    assert_eq!(summary.period, PERIOD);
    assert_eq!(summary.clients_scored, 2);
    assert_eq!(summary.chains_written, 2);

    assert_eq!(engine.store.labeled_feature_count(PERIOD).unwrap(), 2);
    let counts = engine.store.archetype_counts(PERIOD).unwrap();
    assert_eq!(
        counts,
        vec![("incognito".to_string(), 1), ("insatisfeito".to_string(), 1)],
    );

    let rollup = engine.store.chain_rollup(PERIOD).unwrap();
    assert_eq!(rollup.len(), 2);
    assert_eq!(rollup[0].chain_id, "ch1");
    assert_eq!(rollup[0].archetype, Archetype::Insatisfeito);
    assert_eq!(rollup[1].chain_id, "ch2");
    assert_eq!(rollup[1].archetype, Archetype::Incognito);
}

/// The persisted output carries every master column and every derived
/// column, not just the label.
#[test]
fn persisted_rows_carry_full_feature_set() {
    let mut m04 = base_row("a", "ch1");
    m04.period = 202404;
    m04.take_rate = 1.0;
    let mut m05 = base_row("a", "ch1");
    m05.period = 202405;
    m05.take_rate = 2.0;
    let mut m06 = base_row("a", "ch1");
    m06.take_rate = 4.0;
    m06.complaints = [Some(2.0), None, Some(1.0)];
    m06.gdc_churn = [Some(1.0), Some(2.0), Some(3.0)];
    m06.gdc_size_l1 = Some(8.0);
    m06.gdc_size_l2 = Some(9.0);

    let mut engine = engine_with(vec![m04, m05, m06]);
    engine.run().unwrap();

    let records = engine.store.labeled_features(PERIOD).unwrap();
    assert_eq!(records.len(), 1);
    let row = &records[0];
    assert_eq!(row.archetype, Some(Archetype::Insatisfeito));
    assert_eq!(row.relationship_status, "ativo");
    assert_eq!(row.take_rate, 4.0);
    assert_eq!(row.take_rate_lag, [Some(2.0), Some(1.0), None, None, None, None]);
    assert_eq!(row.take_rate_delta, [Some(2.0), Some(1.0), None, None, None]);
    assert_eq!(row.complaints, [Some(2.0), None, Some(1.0)]);
    assert_eq!(row.complaints_l3m, Some(3.0));
    assert_eq!(row.visits, [Some(3.0), Some(2.0), Some(4.0)]);
    assert_eq!(row.gdc_churn, [Some(1.0), Some(2.0), Some(3.0)]);
    assert_eq!(row.gdc_size_l1, Some(8.0));
    assert_eq!(row.gdc_size_l2, Some(9.0));
    assert_eq!(row.risk_score, Some(0.9));
    assert_eq!(row.conc_mix, 0);
    assert_eq!(row.simulations_6m, 0);
}

/// A save that fails partway through rolls back entirely, keeping the
/// previous period output intact.
#[test]
fn failed_save_preserves_previous_output() {
    let store = TableStore::in_memory().unwrap();
    store.migrate().unwrap();

    let mut labeled = base_row("a", "ch1");
    labeled.archetype = Some(Archetype::Incognito);
    let good = ScoringFrame { period: PERIOD, rows: vec![labeled] };
    store.save_labeled_features(&good).unwrap();

    // First row is fine, second is unlabeled and aborts the save.
    let mut ok_row = base_row("b", "ch1");
    ok_row.archetype = Some(Archetype::Abandonado);
    let bad = ScoringFrame {
        period: PERIOD,
        rows: vec![ok_row, base_row("c", "ch1")],
    };
    assert!(store.save_labeled_features(&bad).is_err());

    let records = store.labeled_features(PERIOD).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].client_id, "a");
    assert_eq!(records[0].archetype, Some(Archetype::Incognito));
}

/// A second run for the same period replaces the previous output
/// instead of appending to it.
#[test]
fn rerun_replaces_previous_output() {
    let mut engine = engine_with(vec![base_row("a", "ch1")]);
    engine.run().unwrap();
    engine.run().unwrap();

    assert_eq!(engine.store.labeled_feature_count(PERIOD).unwrap(), 1);
    assert_eq!(engine.store.chain_rollup(PERIOD).unwrap().len(), 1);
}
