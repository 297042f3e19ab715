use std::sync::Arc;

use anyhow::Context;
use surge_core::{
    BatchOrchestrator, ReportBuilder, UnitGenerator, default_shared_domain, load_app_definitions,
};
use surge_exec::{CliConfig, CliRunner, SlotPool};
use surge_probe::{HttpProbe, ProbeConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::Cli;

/// Seed, start and report one run.
///
/// Returns whether the run finished without being cancelled. Only setup and report failures are errors.
pub async fn run(cli: &Cli, shutdown: CancellationToken) -> anyhow::Result<bool> {
    let app_types = load_app_definitions(&cli.config)?;
    let mut cfg = cli.run_config(app_types);
    cfg.validate()?;

    let template = cli.session_template();
    let pool = Arc::new(
        SlotPool::new(cfg.max_in_flight, template.as_deref()).context("provision slot pool")?,
    );
    let runner = Arc::new(CliRunner::new(CliConfig::new(&cli.cli_bin), Arc::clone(&pool)));
    let probe = Arc::new(
        HttpProbe::new(&ProbeConfig {
            skip_verify_certificate: cfg.skip_verify_certificate,
            ..ProbeConfig::default()
        })
        .context("build health probe")?,
    );

    if cfg.domain.is_empty() {
        cfg.domain = default_shared_domain(runner.as_ref(), &shutdown)
            .await
            .context("cannot determine shared domain")?;
    }

    let units = UnitGenerator::new(&cfg).units();
    let orchestrator = BatchOrchestrator::new(&cfg, runner, probe, shutdown);

    let deployed = orchestrator.run_deploy_phase(units).await;
    orchestrator.run_activate_phase(deployed).await;

    let report = orchestrator.generate_report();
    ReportBuilder::new(&cfg.output_file).write(&report)?;

    if let Err(e) = pool.drain().await {
        warn!(target: "surge.run", error = %e, "failed to drain slot pool");
    }
    info!(target: "surge.run", succeeded = report.succeeded, "run complete");
    Ok(report.succeeded)
}
