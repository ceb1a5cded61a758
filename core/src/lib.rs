//! Churn archetype labeling: a batch pipeline that assigns one of
//! nine behavioral archetypes to every high-churn-risk client for a
//! scoring period, then rolls the labels up to merchant chains.
//!
//! Flow: loader (top-risk population) → nine ordered rule evaluators
//! over one shared frame → chain rollup → persisted outputs.

pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod joiners;
pub mod loader;
pub mod model;
pub mod rule;
pub mod rules;
pub mod store;
pub mod types;
