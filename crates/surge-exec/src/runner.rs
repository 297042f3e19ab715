use std::{process::Stdio, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    error::{ExecError, ExecResult},
    pool::SlotPool,
    util::{keep_tail, read_pipe, terminate},
};

/// Runs one external-tool invocation.
///
/// Returns the complete stdout on success. Implementations must return promptly with
/// [`ExecError::Timeout`] once `timeout` elapses and with [`ExecError::Cancelled`] once `cancel` fires.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        cancel: &CancellationToken,
        timeout: Duration,
        args: &[String],
    ) -> ExecResult<Vec<u8>>;
}

/// Process configuration shared by every invocation.
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub program: String,
    /// Variable pointing the tool at the borrowed slot directory.
    pub session_env: String,
    /// Extra environment for every invocation.
    pub env: Vec<(String, String)>,
    /// Bytes of combined output carried by a failure (the tail wins).
    pub output_limit: usize,
}

impl CliConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            program: "cf".to_string(),
            session_env: "CF_HOME".to_string(),
            env: vec![("GOMAXPROCS".to_string(), "4".to_string())],
            output_limit: 1024,
        }
    }
}

/// [`CommandRunner`] that spawns the configured program inside a borrowed slot.
pub struct CliRunner {
    cfg: CliConfig,
    pool: Arc<SlotPool>,
}

impl CliRunner {
    pub fn new(cfg: CliConfig, pool: Arc<SlotPool>) -> Self {
        Self { cfg, pool }
    }
}

enum Ending {
    Exited(std::io::Result<std::process::ExitStatus>, Vec<u8>, Vec<u8>),
    TimedOut,
    Cancelled,
}

#[async_trait]
impl CommandRunner for CliRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        timeout: Duration,
        args: &[String],
    ) -> ExecResult<Vec<u8>> {
        if self.cfg.program.is_empty() {
            return Err(ExecError::MissingProgram);
        }

        let slot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExecError::Cancelled),
            slot = self.pool.acquire() => slot?,
        };

        let mut cmd = Command::new(&self.cfg.program);
        cmd.args(args)
            .env(&self.cfg.session_env, slot.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (k, v) in &self.cfg.env {
            cmd.env(k, v);
        }

        trace!(target: "surge.exec.runner", program = %self.cfg.program, ?args, slot = %slot.path().display(), "spawn");
        let mut child = cmd.spawn().map_err(|e| ExecError::Spawn(e.to_string()))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let ending = {
            let finish = async {
                let (out, err) = tokio::join!(read_pipe(stdout), read_pipe(stderr));
                (child.wait().await, out, err)
            };
            tokio::select! {
                (status, out, err) = finish => Ending::Exited(status, out, err),
                _ = tokio::time::sleep(timeout) => Ending::TimedOut,
                _ = cancel.cancelled() => Ending::Cancelled,
            }
        };

        match ending {
            Ending::TimedOut => {
                warn!(target: "surge.exec.runner", ?args, ?timeout, "command timed out; killing child");
                terminate(&mut child);
                Err(ExecError::Timeout(timeout))
            }
            Ending::Cancelled => {
                debug!(target: "surge.exec.runner", ?args, "cancelled; killing child");
                terminate(&mut child);
                Err(ExecError::Cancelled)
            }
            Ending::Exited(status, mut out, err) => {
                let status = status?;
                if status.success() {
                    if !err.is_empty() {
                        debug!(target: "surge.exec.runner", ?args, stderr = %String::from_utf8_lossy(&err), "stderr on success");
                    }
                    trace!(target: "surge.exec.runner", ?args, bytes = out.len(), "exit success");
                    return Ok(out);
                }

                out.extend_from_slice(&err);
                let output = keep_tail(out, self.cfg.output_limit);
                let output = String::from_utf8_lossy(&output).into_owned();
                warn!(target: "surge.exec.runner", ?args, code = ?status.code(), %output, "command failed");
                match status.code() {
                    Some(code) => Err(ExecError::NonZeroExit { code, output }),
                    None => Err(ExecError::KilledBySignal { output }),
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ErrorClass;

    fn sh(pool_size: usize) -> CliRunner {
        let pool = Arc::new(SlotPool::new(pool_size, None).unwrap());
        CliRunner::new(CliConfig::new("sh"), pool)
    }

    fn script(s: &str) -> Vec<String> {
        vec!["-c".to_string(), s.to_string()]
    }

    const SECOND: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn success_returns_stdout_only() {
        let runner = sh(1);
        let out = runner
            .run(&CancellationToken::new(), 5 * SECOND, &script("printf out; printf notice 1>&2"))
            .await
            .unwrap();
        assert_eq!(out, b"out");
    }

    #[tokio::test]
    async fn session_env_points_at_borrowed_slot() {
        let runner = sh(1);
        let out = runner
            .run(&CancellationToken::new(), 5 * SECOND, &script("printf '%s' \"$CF_HOME\""))
            .await
            .unwrap();
        let home = std::path::PathBuf::from(String::from_utf8(out).unwrap());

        assert!(home.is_dir());
        assert!(
            home.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("surge-home"))
        );
    }

    #[tokio::test]
    async fn extra_env_is_passed_through() {
        let runner = sh(1);
        let out = runner
            .run(&CancellationToken::new(), 5 * SECOND, &script("printf '%s' \"$GOMAXPROCS\""))
            .await
            .unwrap();
        assert_eq!(out, b"4");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_output() {
        let runner = sh(1);
        let err = runner
            .run(&CancellationToken::new(), 5 * SECOND, &script("printf boom; exit 3"))
            .await
            .unwrap_err();

        match &err {
            ExecError::NonZeroExit { code, output } => {
                assert_eq!(*code, 3);
                assert_eq!(output, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.class(), ErrorClass::Command);
        assert_eq!(runner.pool.in_use(), 0);
    }

    fn limited(limit: usize) -> CliRunner {
        let pool = Arc::new(SlotPool::new(1, None).unwrap());
        let cfg = CliConfig {
            output_limit: limit,
            ..CliConfig::new("sh")
        };
        CliRunner::new(cfg, pool)
    }

    #[tokio::test]
    async fn successful_stdout_is_never_truncated() {
        let runner = limited(16);
        let out = runner
            .run(
                &CancellationToken::new(),
                5 * SECOND,
                &script("i=0; while [ $i -lt 200 ]; do printf 0123456789; i=$((i+1)); done; printf 'update available' 1>&2"),
            )
            .await
            .unwrap();

        assert_eq!(out.len(), 2000);
        assert!(out.starts_with(b"0123456789"));
        assert!(out.ends_with(b"0123456789"));
    }

    #[tokio::test]
    async fn failure_output_keeps_the_combined_tail() {
        let runner = limited(6);
        let err = runner
            .run(&CancellationToken::new(), 5 * SECOND, &script("printf abcdefgh; printf XY 1>&2; exit 1"))
            .await
            .unwrap_err();

        match err {
            ExecError::NonZeroExit { output, .. } => assert_eq!(output, "efghXY"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_returns_promptly_and_releases_slot() {
        let runner = sh(1);
        let started = std::time::Instant::now();
        let err = runner
            .run(&CancellationToken::new(), Duration::from_millis(100), &script("sleep 5"))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Timeout(_)));
        assert_eq!(err.class(), ErrorClass::Command);
        assert!(started.elapsed() < 3 * SECOND);
        assert_eq!(runner.pool.in_use(), 0);
    }

    #[tokio::test]
    async fn cancellation_is_its_own_class() {
        let runner = sh(1);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = runner.run(&cancel, 10 * SECOND, &script("sleep 5")).await.unwrap_err();
        assert!(matches!(err, ExecError::Cancelled));
        assert!(!err.counts_against_budget());
        assert_eq!(runner.pool.in_use(), 0);
    }

    #[tokio::test]
    async fn already_cancelled_never_spawns() {
        let runner = sh(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = runner
            .run(&cancel, SECOND, &script("printf should-not-run"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Cancelled));
    }

    #[tokio::test]
    async fn spawn_failure_is_fatal() {
        let pool = Arc::new(SlotPool::new(1, None).unwrap());
        let runner = CliRunner::new(CliConfig::new("/nonexistent/surge-tool"), pool);
        let err = runner
            .run(&CancellationToken::new(), SECOND, &["version".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn(_)));
        assert_eq!(err.class(), ErrorClass::Fatal);
        assert_eq!(runner.pool.in_use(), 0);
    }

    #[tokio::test]
    async fn empty_program_is_rejected() {
        let pool = Arc::new(SlotPool::new(1, None).unwrap());
        let runner = CliRunner::new(CliConfig::new(""), pool);
        let err = runner
            .run(&CancellationToken::new(), SECOND, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::MissingProgram));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_invocations_never_share_a_slot() {
        let runner = Arc::new(sh(2));
        let mut handles = Vec::new();
        for _ in 0..6 {
            let runner = Arc::clone(&runner);
            handles.push(tokio::spawn(async move {
                runner
                    .run(
                        &CancellationToken::new(),
                        10 * SECOND,
                        &script("mkdir \"$CF_HOME/lock\" && sleep 0.1 && rmdir \"$CF_HOME/lock\""),
                    )
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(runner.pool.in_use(), 0);
    }
}
