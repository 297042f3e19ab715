use surge_model::Unit;
use tracing::{debug, error, info};

use crate::config::RunConfig;

/// Expands the app definitions of a [`RunConfig`] into concrete units.
pub struct UnitGenerator<'a> {
    cfg: &'a RunConfig,
}

impl<'a> UnitGenerator<'a> {
    pub fn new(cfg: &'a RunConfig) -> Self {
        Self { cfg }
    }

    /// `{prefix}-{batch}-{app_name_prefix}-{seq}` for every batch, definition and sequence number.
    ///
    /// Definitions producing invalid names are logged and skipped.
    pub fn units(&self) -> Vec<Unit> {
        let mut units = Vec::with_capacity(self.cfg.total_unit_count());
        for batch in 0..self.cfg.num_batches {
            for def in &self.cfg.app_types {
                for seq in 0..def.app_count {
                    let name = format!(
                        "{}-{}-{}-{}",
                        self.cfg.prefix, batch, def.app_name_prefix, seq
                    );
                    match Unit::new(
                        name.clone(),
                        self.cfg.scheme(),
                        &self.cfg.domain,
                        def.manifest_path.clone(),
                        self.cfg.payload.clone(),
                    ) {
                        Ok(unit) => {
                            debug!(target: "surge.core.generator", unit = %name, "generated unit");
                            units.push(unit);
                        }
                        Err(e) => {
                            error!(target: "surge.core.generator", unit = %name, error = %e, "failed generating unit");
                        }
                    }
                }
            }
        }
        info!(target: "surge.core.generator", count = units.len(), "units generated");
        units
    }
}
