use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One entry of the app-definition file.
///
/// Every batch produces `app_count` units from each definition, all sharing the same manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDefinition {
    /// Manifest handed to the external tool on deploy.
    pub manifest_path: PathBuf,
    /// Middle segment of the generated unit names.
    pub app_name_prefix: String,
    /// Units generated per batch.
    pub app_count: usize,
}
