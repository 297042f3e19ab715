//! Shared, mutex-guarded record of every unit the run touched.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use surge_model::{Outcome, Phase, PhaseState, UnitName, UnitRecord};
use tracing::warn;

/// Per-unit results of a run.
///
/// A unit enters the map when its deploy phase is recorded and never leaves it.
/// Each phase of each unit is written at most once.
#[derive(Clone, Default)]
pub struct RunResult {
    inner: Arc<Mutex<HashMap<UnitName, UnitRecord>>>,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UnitName, UnitRecord>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the deploy outcome together with the resolved identifier.
    ///
    /// Returns `false` (and changes nothing) if the deploy phase was already recorded.
    pub fn record_deploy(&self, name: &str, state: PhaseState, identifier: Option<String>) -> bool {
        let mut map = self.lock();
        let record = map
            .entry(name.to_string())
            .or_insert_with(|| UnitRecord::new(name));

        if record.deploy.outcome().is_terminal() {
            warn!(target: "surge.core.state", unit = name, phase = %Phase::Deploy, "phase already recorded; ignoring");
            return false;
        }
        record.deploy = state;
        record.identifier = identifier;
        true
    }

    /// Record the activate outcome of a unit.
    ///
    /// Returns `false` (and changes nothing) if the activate phase was already recorded.
    pub fn record_activate(&self, name: &str, state: PhaseState) -> bool {
        let mut map = self.lock();
        let record = map
            .entry(name.to_string())
            .or_insert_with(|| UnitRecord::new(name));

        if record.activate.outcome().is_terminal() {
            warn!(target: "surge.core.state", unit = name, phase = %Phase::Activate, "phase already recorded; ignoring");
            return false;
        }
        record.activate = state;
        true
    }

    #[cfg(test)]
    pub(crate) fn get(&self, name: &str) -> Option<UnitRecord> {
        self.lock().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Units whose `phase` ended with `outcome`.
    pub fn count(&self, phase: Phase, outcome: Outcome) -> usize {
        self.lock()
            .values()
            .filter(|r| r.state(phase).outcome() == outcome)
            .count()
    }

    /// Copy of every record, in no particular order.
    pub fn snapshot(&self) -> Vec<UnitRecord> {
        self.lock().values().cloned().collect()
    }
}
