//! fabricd entry point.

use anyhow::Context;
use clap::Parser;
use fabricd::{init_logging, Args, ExitStatus, FabricdError};
use std::io::Write;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting fabricd");

    match run(&args).await {
        Ok(status) => {
            info!(exit_code = status.code(), "fabricd finished");
            status.into()
        }
        Err(e) => {
            error!("{:#}", e);
            e.downcast_ref::<FabricdError>()
                .map(FabricdError::exit_status)
                .unwrap_or(ExitStatus::UnusableInput)
                .into()
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<ExitStatus> {
    let mut out = std::io::stdout().lock();
    let summary = fabricd::execute(args, &mut out)
        .await
        .with_context(|| format!("fabric {} not applied", args.topology.display()))?;
    out.flush().context("cannot flush report")?;
    Ok(summary.exit_status())
}
