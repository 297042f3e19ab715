use serde::Serialize;

use crate::UnitRecord;

/// Machine-readable outcome of a whole run.
///
/// `succeeded` is `false` as soon as the run was cancelled, whatever the per-unit states say.
/// Unit order is unspecified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub succeeded: bool,
    #[serde(rename = "apps")]
    pub units: Vec<UnitRecord>,
}
