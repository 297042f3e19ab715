use std::path::PathBuf;

use surge_exec::ExecError;
use surge_probe::ProbeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("command failed: {0}")]
    Exec(#[from] ExecError),

    #[error("health check failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("identifier lookup returned no output")]
    EmptyIdentifier,

    #[error("no shared domains returned by the platform")]
    NoSharedDomain,

    #[error("failed to parse shared domains: {0}")]
    DomainParse(String),

    #[error("failed to write report {path}: {reason}")]
    Report { path: PathBuf, reason: String },
}

impl CoreError {
    /// `false` for aborts caused by the run being stopped from outside.
    pub fn counts_against_budget(&self) -> bool {
        match self {
            CoreError::Exec(e) => e.counts_against_budget(),
            CoreError::Probe(ProbeError::Cancelled) => false,
            _ => true,
        }
    }
}
