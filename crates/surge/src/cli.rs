use std::{path::PathBuf, time::Duration};

use clap::Parser;
use surge_core::{BudgetPolicy, RunConfig};
use surge_model::AppDefinition;
use surge_observe::{LoggerConfig, LoggerFormat};

/// Stress a PaaS by deploying and starting batches of throwaway apps.
#[derive(Debug, Parser)]
#[command(name = "surge", version, about, long_about = None)]
pub struct Cli {
    /// App domain; discovered from the platform when empty.
    #[arg(long, env = "SURGE_DOMAIN", default_value = "")]
    pub domain: String,

    /// Number of batches to seed.
    #[arg(short = 'n', long, env = "SURGE_NUM_BATCHES", default_value_t = 1)]
    pub num_batches: usize,

    /// Max number of tool invocations in flight.
    #[arg(short = 'k', long, env = "SURGE_MAX_IN_FLIGHT", default_value_t = 1)]
    pub max_in_flight: usize,

    /// Max number of transient health-check answers tolerated per app.
    #[arg(long, env = "SURGE_MAX_POLLING_ERRORS", default_value_t = 1)]
    pub max_polling_errors: u32,

    /// Fractional failure tolerance.
    #[arg(long, env = "SURGE_TOLERANCE", default_value_t = 1.0)]
    pub tolerance: f64,

    /// Path to the app-definition file.
    #[arg(long, env = "SURGE_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Path of the JSON report.
    #[arg(long, env = "SURGE_OUTPUT", default_value = "output.json")]
    pub output: PathBuf,

    /// Directory containing the app payload to push.
    #[arg(long, env = "SURGE_PAYLOAD", default_value = "assets/temp-app")]
    pub payload: PathBuf,

    /// Naming prefix for generated apps.
    #[arg(long, env = "SURGE_PREFIX", default_value = "surgeapp")]
    pub prefix: String,

    /// Seconds allowed for a single tool invocation.
    #[arg(long, env = "SURGE_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,

    /// Probe apps over https.
    #[arg(long, env = "SURGE_USE_TLS")]
    pub use_tls: bool,

    #[arg(long, env = "SURGE_SKIP_VERIFY_CERTIFICATE")]
    pub skip_verify_certificate: bool,

    /// External platform tool.
    #[arg(long, env = "SURGE_CLI_BIN", default_value = "cf")]
    pub cli_bin: String,

    /// Session directory copied into every slot; defaults to `$HOME/.cf` when present.
    #[arg(long, env = "SURGE_SESSION_TEMPLATE")]
    pub session_template: Option<PathBuf>,

    /// `per-phase` or `shared`.
    #[arg(long, env = "SURGE_BUDGET_POLICY", default_value = "per-phase")]
    pub budget_policy: BudgetPolicy,

    /// Fan out immediately instead of deploying the first app alone.
    #[arg(long, env = "SURGE_NO_SMOKE_TEST")]
    pub no_smoke_test: bool,

    #[arg(long, env = "SURGE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// `text`, `json` or `journald`.
    #[arg(long, env = "SURGE_LOG_FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,
}

impl Cli {
    pub fn run_config(&self, app_types: Vec<AppDefinition>) -> RunConfig {
        RunConfig {
            num_batches: self.num_batches,
            max_in_flight: self.max_in_flight,
            max_polling_errors: self.max_polling_errors,
            tolerance: self.tolerance,
            domain: self.domain.clone(),
            use_tls: self.use_tls,
            skip_verify_certificate: self.skip_verify_certificate,
            payload: self.payload.clone(),
            prefix: self.prefix.clone(),
            output_file: self.output.clone(),
            timeout: Duration::from_secs(self.timeout),
            app_types,
            budget_policy: self.budget_policy,
            smoke_test: !self.no_smoke_test,
        }
    }

    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            format: self.log_format,
            level: self.log_level.clone(),
            ..LoggerConfig::default()
        }
    }

    pub fn session_template(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.session_template {
            return Some(dir.clone());
        }
        let home = std::env::var_os("HOME")?;
        let dir = PathBuf::from(home).join(".cf");
        dir.is_dir().then_some(dir)
    }
}
