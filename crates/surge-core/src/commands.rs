//! External-tool vocabulary for the unit lifecycle.
use std::time::Duration;

use surge_exec::CommandRunner;
use surge_model::Unit;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CoreError;

/// Environment variable telling a unit which route it is served on.
pub const ENDPOINT_ENV: &str = "ENDPOINT_TO_HIT";

fn path_arg(p: &std::path::Path) -> String {
    p.to_string_lossy().into_owned()
}

pub fn push_args(unit: &Unit) -> Vec<String> {
    vec![
        "push".into(),
        unit.name().into(),
        "-p".into(),
        path_arg(unit.payload()),
        "-f".into(),
        path_arg(unit.manifest()),
        "--no-start".into(),
    ]
}

pub fn set_endpoint_args(unit: &Unit) -> Vec<String> {
    vec![
        "set-env".into(),
        unit.name().into(),
        ENDPOINT_ENV.into(),
        unit.route().into(),
    ]
}

pub fn identifier_args(unit: &Unit) -> Vec<String> {
    vec!["app".into(), "--guid".into(), unit.name().into()]
}

pub fn start_args(unit: &Unit) -> Vec<String> {
    vec!["start".into(), unit.name().into()]
}

/// Upload the unit stopped, then tell it its own route.
pub async fn deploy(
    runner: &dyn CommandRunner,
    cancel: &CancellationToken,
    timeout: Duration,
    unit: &Unit,
) -> Result<(), CoreError> {
    runner.run(cancel, timeout, &push_args(unit)).await?;
    runner.run(cancel, timeout, &set_endpoint_args(unit)).await?;
    info!(target: "surge.core.commands", unit = unit.name(), "deployed");
    debug!(target: "surge.core.commands", unit = unit.name(), endpoint = unit.route(), "endpoint set");
    Ok(())
}

/// Ask the platform for the unit's identifier.
pub async fn resolve_identifier(
    runner: &dyn CommandRunner,
    cancel: &CancellationToken,
    timeout: Duration,
    unit: &Unit,
) -> Result<String, CoreError> {
    let output = runner.run(cancel, timeout, &identifier_args(unit)).await?;
    let id = String::from_utf8_lossy(&output).trim().to_string();
    if id.is_empty() {
        return Err(CoreError::EmptyIdentifier);
    }
    Ok(id)
}

pub async fn start(
    runner: &dyn CommandRunner,
    cancel: &CancellationToken,
    timeout: Duration,
    unit: &Unit,
) -> Result<(), CoreError> {
    runner.run(cancel, timeout, &start_args(unit)).await?;
    info!(target: "surge.core.commands", unit = unit.name(), "started");
    Ok(())
}
