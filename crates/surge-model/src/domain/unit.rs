use std::path::{Path, PathBuf};

use crate::ModelError;

/// One deployable workload.
///
/// Immutable for the whole run; per-phase results live in [`crate::UnitRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    name: String,
    route: String,
    manifest: PathBuf,
    payload: PathBuf,
}

impl Unit {
    /// Build a unit reachable at `{scheme}://{name}.{domain}`.
    pub fn new(
        name: impl Into<String>,
        scheme: &str,
        domain: &str,
        manifest: impl Into<PathBuf>,
        payload: impl Into<PathBuf>,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ModelError::InvalidUnitName(name));
        }

        let route = format!("{scheme}://{name}.{domain}");
        Ok(Self {
            name,
            route,
            manifest: manifest.into(),
            payload: payload.into(),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn route(&self) -> &str {
        &self.route
    }

    #[inline]
    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    #[inline]
    pub fn payload(&self) -> &Path {
        &self.payload
    }
}
