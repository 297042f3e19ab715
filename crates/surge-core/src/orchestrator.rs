//! Two-phase batch driver.
//!
//! Both phases fan units out under the same concurrency ceiling. Every worker checks the shared cancellation
//! signal right before it starts; once a [`ToleranceBudget`] fires, work already in flight runs to completion
//! and every unit not yet started is recorded as skipped.
//!
//! Two tokens are in play:
//! - `shutdown` belongs to the caller (operator interrupt) and is handed to the runner and probe, so it
//!   interrupts in-flight work;
//! - `signal` is a child of `shutdown` fired by the budgets; it only stops new work from starting.
use std::{sync::Arc, time::Duration};

use surge_exec::CommandRunner;
use surge_model::{Outcome, Phase, PhaseState, Report, Unit, timestamp};
use surge_probe::HealthProbe;
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{
    commands,
    config::{BudgetPolicy, RunConfig},
    error::CoreError,
    state::RunResult,
    tolerance::ToleranceBudget,
};

pub struct BatchOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    runner: Arc<dyn CommandRunner>,
    probe: Arc<dyn HealthProbe>,
    shutdown: CancellationToken,
    signal: CancellationToken,

    max_in_flight: usize,
    timeout: Duration,
    max_polling_errors: u32,
    smoke_test: bool,

    deploy_budget: Arc<ToleranceBudget>,
    /// Same budget as `deploy_budget` under [`BudgetPolicy::Shared`].
    activate_budget: Arc<ToleranceBudget>,
    results: RunResult,
}

impl BatchOrchestrator {
    pub fn new(
        cfg: &RunConfig,
        runner: Arc<dyn CommandRunner>,
        probe: Arc<dyn HealthProbe>,
        shutdown: CancellationToken,
    ) -> Self {
        let signal = shutdown.child_token();
        let limit = cfg.max_allowed_failures();

        let deploy_budget = Arc::new(ToleranceBudget::new(limit, signal.clone()));
        let activate_budget = match cfg.budget_policy {
            BudgetPolicy::Shared => Arc::clone(&deploy_budget),
            BudgetPolicy::PerPhase => Arc::new(ToleranceBudget::new(limit, signal.clone())),
        };
        info!(
            target: "surge.core.orchestrator",
            max_allowed_failures = limit,
            max_in_flight = cfg.max_in_flight,
            policy = %cfg.budget_policy,
            smoke_test = cfg.smoke_test,
            "orchestrator ready"
        );

        Self {
            inner: Arc::new(Inner {
                runner,
                probe,
                shutdown,
                signal,
                max_in_flight: cfg.max_in_flight.max(1),
                timeout: cfg.timeout,
                max_polling_errors: cfg.max_polling_errors,
                smoke_test: cfg.smoke_test,
                deploy_budget,
                activate_budget,
                results: RunResult::new(),
            }),
        }
    }

    /// Deploy every unit; returns the ones that deployed successfully.
    ///
    /// With the smoke test enabled the first unit runs alone first. If it fails, the run is cancelled and
    /// nothing else is attempted or recorded.
    pub async fn run_deploy_phase(&self, units: Vec<Unit>) -> Vec<Unit> {
        info!(target: "surge.core.deploy", units = units.len(), "deploy phase started");
        let mut units = units.into_iter();
        let mut deployed = Vec::new();

        if self.inner.smoke_test
            && let Some(first) = units.next()
        {
            let span = unit_span(Phase::Deploy, &first);
            match self.inner.deploy_one(&first).instrument(span).await {
                Outcome::Succeeded => deployed.push(first),
                Outcome::Failed => {
                    error!(target: "surge.core.deploy", unit = first.name(), "smoke test failed; aborting run");
                    self.inner.signal.cancel();
                    return deployed;
                }
                _ => {}
            }
        }

        let inner = Arc::clone(&self.inner);
        deployed.extend(
            fan_out(&self.inner, Phase::Deploy, units, move |unit| {
                let inner = Arc::clone(&inner);
                async move { inner.deploy_one(&unit).await == Outcome::Succeeded }
            })
            .await,
        );

        info!(
            target: "surge.core.deploy",
            recorded = self.inner.results.len(),
            deployed = deployed.len(),
            failures = self.inner.deploy_budget.failures(),
            cancelled = self.inner.signal.is_cancelled(),
            "deploy phase complete"
        );
        deployed
    }

    /// Start every unit and health-check its route; returns the units that came up healthy.
    pub async fn run_activate_phase(&self, units: Vec<Unit>) -> Vec<Unit> {
        info!(target: "surge.core.activate", units = units.len(), "activate phase started");

        let inner = Arc::clone(&self.inner);
        let healthy = fan_out(&self.inner, Phase::Activate, units.into_iter(), move |unit| {
            let inner = Arc::clone(&inner);
            async move { inner.activate_one(&unit).await == Outcome::Succeeded }
        })
        .await;

        info!(
            target: "surge.core.activate",
            healthy = healthy.len(),
            failures = self.inner.activate_budget.failures(),
            cancelled = self.inner.signal.is_cancelled(),
            "activate phase complete"
        );
        healthy
    }

    /// Snapshot of the run; must not be called while a phase is running.
    pub fn generate_report(&self) -> Report {
        let mut units = self.inner.results.snapshot();
        units.sort_by(|a, b| a.name.cmp(&b.name));
        Report {
            succeeded: !self.inner.signal.is_cancelled(),
            units,
        }
    }

    pub fn results(&self) -> &RunResult {
        &self.inner.results
    }

    /// `true` once a budget fired, the smoke test failed, or the caller shut the run down.
    pub fn is_cancelled(&self) -> bool {
        self.inner.signal.is_cancelled()
    }
}

fn unit_span(phase: Phase, unit: &Unit) -> tracing::Span {
    info_span!("unit", unit = %unit.name(), %phase)
}

/// Run `work` for every unit, at most `max_in_flight` at a time; returns the units it succeeded for,
/// in input order.
///
/// The permit is taken before the task is spawned, so a unit's worker never starts until a previous one
/// has finished recording its outcome.
async fn fan_out<F, Fut>(
    inner: &Inner,
    phase: Phase,
    units: impl Iterator<Item = Unit>,
    work: F,
) -> Vec<Unit>
where
    F: Fn(Unit) -> Fut,
    Fut: Future<Output = bool> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(inner.max_in_flight));
    let mut set = JoinSet::new();

    for (idx, unit) in units.enumerate() {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let span = unit_span(phase, &unit);
        let fut = work(unit.clone());
        set.spawn(
            async move {
                let ok = fut.await;
                drop(permit);
                (idx, unit, ok)
            }
            .instrument(span),
        );
    }

    let mut passed = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, unit, true)) => passed.push((idx, unit)),
            Ok((_, _, false)) => {}
            Err(e) => error!(target: "surge.core.orchestrator", %phase, error = %e, "unit worker panicked"),
        }
    }
    passed.sort_by_key(|(idx, _)| *idx);
    passed.into_iter().map(|(_, unit)| unit).collect()
}

impl Inner {
    async fn deploy_one(&self, unit: &Unit) -> Outcome {
        if self.signal.is_cancelled() {
            debug!(target: "surge.core.deploy", unit = unit.name(), "run cancelled; skipping");
            self.results.record_deploy(unit.name(), PhaseState::skipped(), None);
            return Outcome::Skipped;
        }

        let started = timestamp::now();
        let deployed = commands::deploy(&*self.runner, &self.shutdown, self.timeout, unit).await;
        let ended = timestamp::now();

        match deployed {
            Ok(()) => {
                let identifier =
                    match commands::resolve_identifier(&*self.runner, &self.shutdown, self.timeout, unit)
                        .await
                    {
                        Ok(id) => Some(id),
                        Err(e) => {
                            warn!(target: "surge.core.deploy", unit = unit.name(), error = %e, "failed resolving identifier");
                            None
                        }
                    };
                self.results
                    .record_deploy(unit.name(), PhaseState::finished(true, started, ended), identifier);
                Outcome::Succeeded
            }
            Err(e) => {
                error!(
                    target: "surge.core.deploy",
                    unit = unit.name(),
                    error = %e,
                    failures = self.deploy_budget.failures() + 1,
                    "deploy failed"
                );
                self.results
                    .record_deploy(unit.name(), PhaseState::finished(false, started, ended), None);
                charge(&self.deploy_budget, &e);
                Outcome::Failed
            }
        }
    }

    async fn activate_one(&self, unit: &Unit) -> Outcome {
        if self.signal.is_cancelled() {
            debug!(target: "surge.core.activate", unit = unit.name(), "run cancelled; skipping");
            self.results.record_activate(unit.name(), PhaseState::skipped());
            return Outcome::Skipped;
        }

        let started = timestamp::now();
        let activated = self.start_and_probe(unit).await;
        let ended = timestamp::now();

        match activated {
            Ok(()) => {
                self.results
                    .record_activate(unit.name(), PhaseState::finished(true, started, ended));
                Outcome::Succeeded
            }
            Err(e) => {
                error!(
                    target: "surge.core.activate",
                    unit = unit.name(),
                    error = %e,
                    failures = self.activate_budget.failures() + 1,
                    "activate failed"
                );
                self.results
                    .record_activate(unit.name(), PhaseState::finished(false, started, ended));
                charge(&self.activate_budget, &e);
                Outcome::Failed
            }
        }
    }

    async fn start_and_probe(&self, unit: &Unit) -> Result<(), CoreError> {
        commands::start(&*self.runner, &self.shutdown, self.timeout, unit).await?;
        let body = self
            .probe
            .probe(&self.shutdown, unit.route(), self.max_polling_errors)
            .await?;
        debug!(target: "surge.core.activate", unit = unit.name(), %body, "unit healthy");
        Ok(())
    }
}

fn charge(budget: &ToleranceBudget, err: &CoreError) {
    if err.counts_against_budget() {
        budget.record_failure();
    } else {
        debug!(target: "surge.core.orchestrator", error = %err, "aborted by shutdown; not charged");
    }
}
