use std::{fmt, fs, path::Path, path::PathBuf, str::FromStr, time::Duration};

use surge_model::AppDefinition;
use tracing::info;

use crate::error::CoreError;

/// How failures of the two phases are charged against the tolerance budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BudgetPolicy {
    /// Each phase may fail up to the limit on its own.
    #[default]
    PerPhase,
    /// Deploy and activate failures add up against one limit.
    Shared,
}

impl FromStr for BudgetPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-phase" | "per_phase" | "phase" => Ok(BudgetPolicy::PerPhase),
            "shared" => Ok(BudgetPolicy::Shared),
            _ => Err(CoreError::Config(format!(
                "invalid budget policy: {s} (expected: per-phase|shared)"
            ))),
        }
    }
}

impl fmt::Display for BudgetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BudgetPolicy::PerPhase => "per-phase",
            BudgetPolicy::Shared => "shared",
        })
    }
}

/// Parameters of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub num_batches: usize,
    /// Concurrency ceiling; also the slot pool size.
    pub max_in_flight: usize,
    /// Retries the health probe may spend on transient answers.
    pub max_polling_errors: u32,
    /// Fraction of all units allowed to fail per budget.
    pub tolerance: f64,
    /// Route domain; empty means "ask the platform".
    pub domain: String,
    pub use_tls: bool,
    pub skip_verify_certificate: bool,
    pub payload: PathBuf,
    pub prefix: String,
    pub output_file: PathBuf,
    /// Deadline of every single external-tool invocation.
    pub timeout: Duration,
    pub app_types: Vec<AppDefinition>,
    pub budget_policy: BudgetPolicy,
    /// Deploy the first unit alone before fanning out.
    pub smoke_test: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_batches: 1,
            max_in_flight: 1,
            max_polling_errors: 1,
            tolerance: 1.0,
            domain: String::new(),
            use_tls: false,
            skip_verify_certificate: false,
            payload: PathBuf::from("assets/temp-app"),
            prefix: "surgeapp".to_string(),
            output_file: PathBuf::from("output.json"),
            timeout: Duration::from_secs(30),
            app_types: Vec::new(),
            budget_policy: BudgetPolicy::default(),
            smoke_test: true,
        }
    }
}

impl RunConfig {
    #[inline]
    pub fn scheme(&self) -> &'static str {
        if self.use_tls { "https" } else { "http" }
    }

    pub fn total_unit_count(&self) -> usize {
        let per_batch: usize = self.app_types.iter().map(|d| d.app_count).sum();
        per_batch * self.num_batches
    }

    /// `floor(tolerance × total_unit_count)`.
    pub fn max_allowed_failures(&self) -> usize {
        (self.tolerance * self.total_unit_count() as f64).floor() as usize
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_in_flight == 0 {
            return Err(CoreError::Config("max in flight must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.tolerance) {
            return Err(CoreError::Config(format!(
                "tolerance must be within [0, 1], got {}",
                self.tolerance
            )));
        }
        if self.app_types.is_empty() {
            return Err(CoreError::Config("no app definitions configured".into()));
        }
        if self.timeout.is_zero() {
            return Err(CoreError::Config("timeout must be positive".into()));
        }
        Ok(())
    }
}

/// Read the JSON app-definition file.
pub fn load_app_definitions(path: &Path) -> Result<Vec<AppDefinition>, CoreError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("open {}: {e}", path.display())))?;
    let defs: Vec<AppDefinition> = serde_json::from_str(&raw)
        .map_err(|e| CoreError::Config(format!("parse {}: {e}", path.display())))?;

    info!(target: "surge.core.config", path = %path.display(), size = defs.len(), "app types loaded");
    Ok(defs)
}
