//! Rule trait for the label cascade.
//!
//! RULE: Every archetype evaluator implements LabelRule.
//! The engine calls apply() on each registered rule in registration
//! order, exactly once per run. Execution order is fixed and
//! documented in engine.rs — a later rule's guard depends on the
//! labels left by every earlier rule.

use crate::{
    config::ScoringConfig,
    error::LabelResult,
    model::ScoringFrame,
    store::TableStore,
};

/// The contract every rule evaluator must fulfill.
pub trait LabelRule {
    /// Unique stable name for this rule (the archetype it assigns).
    fn name(&self) -> &'static str;

    /// Evaluate the rule over the shared frame, labeling the rows it
    /// matches. Rules may derive helper columns on the frame and may
    /// read auxiliary tables through the store, but they must never
    /// overwrite an existing label (rule 2's bercario override is the
    /// single documented exception).
    fn apply(
        &self,
        frame: &mut ScoringFrame,
        store: &TableStore,
        config: &ScoringConfig,
    ) -> LabelResult<()>;
}
