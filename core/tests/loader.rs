use arquetipos_core::config::ScoringConfig;
use arquetipos_core::error::LabelError;
use arquetipos_core::loader::build_scoring_frame;
use arquetipos_core::model::ClientRow;
use arquetipos_core::store::TableStore;

// ── Helpers ──────────────────────────────────────────────────────────────────

const PERIOD: u32 = 202406;

fn base_row(client: &str, chain: &str, period: u32) -> ClientRow {
    ClientRow {
        client_id: client.to_string(),
        chain_id: chain.to_string(),
        period,
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

fn mem_store() -> TableStore {
    let store = TableStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

fn config(fraction: f64) -> ScoringConfig {
    ScoringConfig {
        target_period: PERIOD,
        top_risk_fraction: fraction,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// With fraction 0.4 over ten distinct scores 1..10 the threshold is
/// the 60th percentile (6.4), so exactly the top four clients enter
/// the frame, carrying their prediction score.
#[test]
fn top_risk_fraction_selects_top_of_population() {
    let store = mem_store();
    for i in 1..=10 {
        let client = format!("c{i:02}");
        store.insert_master_row(&base_row(&client, "ch1", PERIOD)).unwrap();
        store.insert_prediction(&client, PERIOD, i as f64).unwrap();
    }

    let frame = build_scoring_frame(&store, &config(0.4)).unwrap();

    assert_eq!(frame.period, PERIOD);
    assert_eq!(frame.rows.len(), 4);
    for row in &frame.rows {
        let score = row.risk_score.unwrap();
        assert!(score >= 6.4, "client {} below threshold", row.client_id);
        assert!(row.archetype.is_none());
    }
}

/// Scores exactly at the threshold are included, so a tie block at the
/// cutoff can push the selection past the nominal fraction.
#[test]
fn ties_at_threshold_are_included() {
    let store = mem_store();
    for i in 1..=10 {
        let client = format!("c{i:02}");
        store.insert_master_row(&base_row(&client, "ch1", PERIOD)).unwrap();
        let score = if i <= 3 { 1.0 } else { 5.0 };
        store.insert_prediction(&client, PERIOD, score).unwrap();
    }

    // p60 of [1,1,1,5,5,5,5,5,5,5] is 5.0; all seven 5.0 scores pass.
    let frame = build_scoring_frame(&store, &config(0.4)).unwrap();
    assert_eq!(frame.rows.len(), 7);
}

/// Duplicate prediction rows for a client produce one frame row, with
/// the first score seen.
#[test]
fn duplicate_predictions_keep_first_score() {
    let store = mem_store();
    store.insert_master_row(&base_row("a", "ch1", PERIOD)).unwrap();
    store.insert_master_row(&base_row("b", "ch1", PERIOD)).unwrap();
    store.insert_prediction("a", PERIOD, 9.0).unwrap();
    store.insert_prediction("a", PERIOD, 2.0).unwrap();
    store.insert_prediction("b", PERIOD, 3.0).unwrap();

    let frame = build_scoring_frame(&store, &config(1.0)).unwrap();

    assert_eq!(frame.rows.len(), 2);
    let a = frame.rows.iter().find(|r| r.client_id == "a").unwrap();
    assert_eq!(a.risk_score, Some(9.0));
}

/// Stored lag columns are discarded and regenerated from the full
/// per-client history, ordered by period.
#[test]
fn stale_lags_are_regenerated_from_history() {
    let store = mem_store();
    let mut m04 = base_row("a", "ch1", 202404);
    m04.take_rate = 1.0;
    let mut m05 = base_row("a", "ch1", 202405);
    m05.take_rate = 2.0;
    let mut m06 = base_row("a", "ch1", PERIOD);
    m06.take_rate = 3.0;
    m06.take_rate_lag[0] = Some(99.0); // stale value from an upstream job
    store.insert_master_row(&m04).unwrap();
    store.insert_master_row(&m05).unwrap();
    store.insert_master_row(&m06).unwrap();
    store.insert_prediction("a", PERIOD, 0.9).unwrap();

    let frame = build_scoring_frame(&store, &config(1.0)).unwrap();

    assert_eq!(frame.rows.len(), 1);
    assert_eq!(
        frame.rows[0].take_rate_lag,
        [Some(2.0), Some(1.0), None, None, None, None],
    );
}

/// History rows for other periods feed the lag computation but never
/// enter the frame themselves.
#[test]
fn only_target_period_rows_enter_the_frame() {
    let store = mem_store();
    store.insert_master_row(&base_row("a", "ch1", 202405)).unwrap();
    store.insert_master_row(&base_row("a", "ch1", PERIOD)).unwrap();
    store.insert_master_row(&base_row("b", "ch1", 202405)).unwrap();
    store.insert_prediction("a", PERIOD, 0.9).unwrap();

    let frame = build_scoring_frame(&store, &config(1.0)).unwrap();

    assert_eq!(frame.rows.len(), 1);
    assert_eq!(frame.rows[0].client_id, "a");
    assert_eq!(frame.rows[0].period, PERIOD);
}

/// A period with no predictions cannot produce a threshold; the run
/// fails fast instead of labeling an empty population.
#[test]
fn empty_prediction_table_fails_fast() {
    let store = mem_store();
    store.insert_master_row(&base_row("a", "ch1", PERIOD)).unwrap();

    let err = build_scoring_frame(&store, &config(0.4)).unwrap_err();
    assert!(matches!(err, LabelError::EmptyPopulation { period: PERIOD }));
}
