mod app_definition;
pub use app_definition::AppDefinition;

mod phase;
pub use phase::{Outcome, Phase};

mod phase_state;
pub use phase_state::PhaseState;

mod unit;
pub use unit::Unit;

mod unit_record;
pub use unit_record::UnitRecord;

/// Name of a unit; unique within a run.
pub type UnitName = String;
