//! label-runner: headless batch runner for the archetype pipeline.
//!
//! Usage:
//!   label-runner --db tables.db --data-dir ./data
//!   label-runner --db tables.db --data-dir ./data --period 202406

use anyhow::Result;
use arquetipos_core::{
    config::ScoringConfig, engine::LabelEngine, store::TableStore, types::Period,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or("tables.db");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");
    let period_override: Option<Period> = args
        .windows(2)
        .find(|w| w[0] == "--period")
        .and_then(|w| w[1].parse().ok());

    let mut config = ScoringConfig::load(data_dir)?;
    if let Some(period) = period_override {
        config.target_period = period;
    }

    println!("Churn archetypes — label-runner");
    println!("  started:   {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  db:        {db}");
    println!("  data_dir:  {data_dir}");
    println!("  period:    {}", config.target_period);
    println!("  fraction:  {}", config.top_risk_fraction);
    println!();

    let store = TableStore::open(db)?;
    store.migrate()?;

    let mut engine = LabelEngine::build(store, config);
    let summary = engine.run()?;

    println!("=== RUN SUMMARY ===");
    println!("  period:          {}", summary.period);
    println!("  clients scored:  {}", summary.clients_scored);
    println!("  chains written:  {}", summary.chains_written);
    println!();
    println!("=== ARCHETYPES ===");
    for (archetype, count) in &summary.archetype_counts {
        println!("  {archetype:<14} {count}");
    }

    Ok(())
}
