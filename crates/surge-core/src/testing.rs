//! In-memory collaborators for orchestrator tests.
use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use surge_exec::{CommandRunner, ExecError, ExecResult};
use surge_model::Unit;
use surge_probe::{HealthProbe, ProbeError};
use tokio_util::sync::CancellationToken;

pub fn unit(i: usize) -> Unit {
    Unit::new(format!("unit-{i}"), "http", "example.test", "manifest.yml", "payload").unwrap()
}

pub fn units(n: usize) -> Vec<Unit> {
    (0..n).map(unit).collect()
}

fn names<I, S>(items: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// Scripted [`CommandRunner`] that understands the push/set-env/app/start/curl vocabulary.
#[derive(Default)]
pub struct FakeRunner {
    fail_push: HashSet<String>,
    cancel_push: HashSet<String>,
    fail_guid: HashSet<String>,
    blank_guid: HashSet<String>,
    fail_start: HashSet<String>,
    curl_output: String,
    delay: Duration,
    calls: Mutex<Vec<Vec<String>>>,
    current: AtomicUsize,
    max_seen: AtomicUsize,
}

impl FakeRunner {
    pub fn fail_push<I: IntoIterator<Item = S>, S: Into<String>>(mut self, units: I) -> Self {
        self.fail_push = names(units);
        self
    }

    pub fn cancel_push<I: IntoIterator<Item = S>, S: Into<String>>(mut self, units: I) -> Self {
        self.cancel_push = names(units);
        self
    }

    pub fn fail_guid<I: IntoIterator<Item = S>, S: Into<String>>(mut self, units: I) -> Self {
        self.fail_guid = names(units);
        self
    }

    pub fn blank_guid<I: IntoIterator<Item = S>, S: Into<String>>(mut self, units: I) -> Self {
        self.blank_guid = names(units);
        self
    }

    pub fn fail_start<I: IntoIterator<Item = S>, S: Into<String>>(mut self, units: I) -> Self {
        self.fail_start = names(units);
        self
    }

    pub fn with_curl_output(mut self, output: &str) -> Self {
        self.curl_output = output.to_string();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Units named by invocations of `verb`, in call order.
    pub fn invoked(&self, verb: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.first().is_some_and(|v| v == verb))
            .filter_map(|c| {
                let unit = if verb == "app" { c.last() } else { c.get(1) };
                unit.cloned()
            })
            .collect()
    }

    pub fn max_seen(&self) -> usize {
        self.max_seen.load(Ordering::SeqCst)
    }

    fn answer(&self, args: &[String]) -> ExecResult<Vec<u8>> {
        let failed = |unit: &str| ExecError::NonZeroExit {
            code: 1,
            output: format!("FAILED {unit}"),
        };

        match args {
            [verb, unit, ..] if verb == "push" => {
                if self.cancel_push.contains(unit) {
                    Err(ExecError::Cancelled)
                } else if self.fail_push.contains(unit) {
                    Err(failed(unit))
                } else {
                    Ok(Vec::new())
                }
            }
            [verb, _, unit] if verb == "app" => {
                if self.fail_guid.contains(unit) {
                    Err(failed(unit))
                } else if self.blank_guid.contains(unit) {
                    Ok(b"\n".to_vec())
                } else {
                    Ok(format!("guid-{unit}\n").into_bytes())
                }
            }
            [verb, unit] if verb == "start" => {
                if self.fail_start.contains(unit) {
                    Err(failed(unit))
                } else {
                    Ok(Vec::new())
                }
            }
            [verb, ..] if verb == "curl" => Ok(self.curl_output.clone().into_bytes()),
            _ => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        _timeout: Duration,
        args: &[String],
    ) -> ExecResult<Vec<u8>> {
        self.calls.lock().unwrap().push(args.to_vec());

        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);

        let interrupted = if self.delay.is_zero() {
            false
        } else {
            tokio::select! {
                _ = cancel.cancelled() => true,
                _ = tokio::time::sleep(self.delay) => false,
            }
        };

        self.current.fetch_sub(1, Ordering::SeqCst);
        if interrupted {
            return Err(ExecError::Cancelled);
        }
        self.answer(args)
    }
}

/// [`HealthProbe`] failing the routes of the named units.
#[derive(Default)]
pub struct FakeProbe {
    failing: HashSet<String>,
    probed: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn failing<I: IntoIterator<Item = S>, S: Into<String>>(mut self, units: I) -> Self {
        self.failing = names(units);
        self
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl HealthProbe for FakeProbe {
    async fn probe(
        &self,
        cancel: &CancellationToken,
        route: &str,
        _max_retries: u32,
    ) -> Result<String, ProbeError> {
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }
        self.probed.lock().unwrap().push(route.to_string());

        let failing = self
            .failing
            .iter()
            .any(|unit| route.contains(&format!("//{unit}.")));
        if failing {
            return Err(ProbeError::Status {
                endpoint: route.to_string(),
                status: 500,
                body: "crashed".to_string(),
            });
        }
        Ok("ok".to_string())
    }
}
