use clap::Parser;
use surge_model::timestamp;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

mod cli;
mod run;

use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Before any worker thread exists.
    timestamp::init_local_offset();
    surge_observe::init_logger(&cli.logger_config())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(cli))
}

async fn serve(cli: Cli) -> anyhow::Result<()> {
    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id);
    info!(target: "surge.run", parent: &span, offset = %timestamp::local_offset(), "started");

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(target: "surge.run", "interrupt received; stopping run");
                shutdown.cancel();
            }
        });
    }

    match run::run(&cli, shutdown).instrument(span.clone()).await {
        Ok(succeeded) => {
            info!(target: "surge.run", parent: &span, succeeded, "exited");
            Ok(())
        }
        Err(e) => {
            error!(target: "surge.run", parent: &span, error = %format_args!("{e:#}"), "run failed");
            Err(e)
        }
    }
}
