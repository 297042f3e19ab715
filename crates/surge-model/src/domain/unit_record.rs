use serde::Serialize;

use crate::{Phase, PhaseState};

/// Everything the run learned about one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitRecord {
    #[serde(rename = "app_name")]
    pub name: String,
    /// Platform identifier; `None` when resolution failed or never ran.
    #[serde(rename = "app_guid")]
    pub identifier: Option<String>,
    #[serde(rename = "push")]
    pub deploy: PhaseState,
    #[serde(rename = "start")]
    pub activate: PhaseState,
}

impl UnitRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: None,
            deploy: PhaseState::pending(),
            activate: PhaseState::pending(),
        }
    }

    pub fn state(&self, phase: Phase) -> &PhaseState {
        match phase {
            Phase::Deploy => &self.deploy,
            Phase::Activate => &self.activate,
        }
    }
}
