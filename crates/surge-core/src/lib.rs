//! Batch orchestration for surge runs.
//!
//! [`BatchOrchestrator`] drives a unit collection through deploy and activate under a concurrency ceiling
//! and a failure [`ToleranceBudget`], recording every outcome in a [`RunResult`] that [`ReportBuilder`] serializes.

mod error;
pub use error::CoreError;

pub mod commands;

mod config;
pub use config::{BudgetPolicy, RunConfig, load_app_definitions};

mod domain;
pub use domain::default_shared_domain;

mod generator;
pub use generator::UnitGenerator;

mod orchestrator;
pub use orchestrator::BatchOrchestrator;

mod report;
pub use report::ReportBuilder;

mod state;
pub use state::RunResult;

mod tolerance;
pub use tolerance::ToleranceBudget;

#[cfg(test)]
mod testing;
