//! The cascade orchestrator — loader, nine rules, chain rollup.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. bercario      (new clients)
//!   2. insatisfeito  (dissatisfaction; may override bercario)
//!   3. massivado     (take-rate growth above peer p90)
//!   4. sitiado       (peer-group churn acceleration)
//!   5. infiel        (product/brand mix concentration)
//!   6. oportunista   (take-rate drop + simulation activity)
//!   7. vagalume      (reactivated clients)
//!   8. abandonado    (zero visits)
//!   9. incognito     (fallback)
//!
//! RULES:
//!   - Rules execute in registration order, exactly once per run.
//!   - Each rule's guard depends on the labels left by every earlier
//!     rule, so no rule may run out of order.
//!   - Outputs are persisted only after the whole cascade completes.

use crate::{
    chain,
    config::ScoringConfig,
    error::LabelResult,
    loader,
    model::RunSummary,
    rule::LabelRule,
    rules::{
        AbandonadoRule, BercarioRule, IncognitoRule, InfielRule, InsatisfeitoRule,
        MassivadoRule, OportunistaRule, SitiadoRule, VagalumeRule,
    },
    store::TableStore,
};

pub struct LabelEngine {
    pub config: ScoringConfig,
    pub store:  TableStore,
    rules:      Vec<Box<dyn LabelRule>>,
}

impl LabelEngine {
    pub fn new(store: TableStore, config: ScoringConfig) -> Self {
        Self {
            config,
            store,
            rules: Vec::new(),
        }
    }

    /// Build a fully wired engine with all nine rules registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(store: TableStore, config: ScoringConfig) -> Self {
        let mut engine = LabelEngine::new(store, config);

        // EXECUTION ORDER — fixed, documented, never reordered.
        engine.register(Box::new(BercarioRule));
        engine.register(Box::new(InsatisfeitoRule));
        engine.register(Box::new(MassivadoRule));
        engine.register(Box::new(SitiadoRule));
        engine.register(Box::new(InfielRule));
        engine.register(Box::new(OportunistaRule));
        engine.register(Box::new(VagalumeRule));
        engine.register(Box::new(AbandonadoRule));
        engine.register(Box::new(IncognitoRule));
        engine
    }

    /// Register a rule. Call in the documented execution order.
    pub fn register(&mut self, rule: Box<dyn LabelRule>) {
        self.rules.push(rule);
    }

    /// Run the whole batch: load the scoring population, apply every
    /// rule in order, roll up chains and persist both outputs.
    pub fn run(&mut self) -> LabelResult<RunSummary> {
        let period = self.config.target_period;
        let mut frame = loader::build_scoring_frame(&self.store, &self.config)?;

        for rule in &self.rules {
            let before = frame.labeled_count();
            rule.apply(&mut frame, &self.store, &self.config)?;
            log::info!(
                "period={period} rule={}: {} newly labeled, {} of {} total",
                rule.name(),
                frame.labeled_count() - before,
                frame.labeled_count(),
                frame.rows.len(),
            );
        }

        let rollup = chain::dominant_archetypes(&frame);

        self.store.save_labeled_features(&frame)?;
        self.store.save_chain_rollup(&rollup, period)?;

        log::info!(
            "period={period} run complete: {} clients labeled, {} chains written",
            frame.rows.len(),
            rollup.len(),
        );

        Ok(RunSummary {
            period,
            clients_scored: frame.rows.len(),
            archetype_counts: frame
                .archetype_counts()
                .into_iter()
                .map(|(name, count)| (name.to_string(), count))
                .collect(),
            chains_written: rollup.len(),
        })
    }
}
