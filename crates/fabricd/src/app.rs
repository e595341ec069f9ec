//! One fabricd run: load, compile, then dump or install.

use fabric_compiler::{compile, Compilation, Topology};
use fabric_installer::{FlowBatch, Installer, OnosProgrammer, RuleProgrammer};
use std::io::Write;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::cli::Args;
use crate::config::FabricdConfig;
use crate::error::{FabricdError, Result};
use crate::report::{self, ExitStatus, RunSummary};
use crate::topology::load_topology;

impl FabricdError {
    /// Exit status for a run that ended in this error.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            FabricdError::Output(_) => ExitStatus::Failures,
            _ => ExitStatus::UnusableInput,
        }
    }
}

/// Loads the daemon config and the topology named on the command line.
pub fn load_inputs(args: &Args) -> Result<(FabricdConfig, Topology)> {
    let config = FabricdConfig::load_or_default(&args.config)?;
    config.validate()?;
    let topology = load_topology(&args.topology)?;
    Ok((config, topology))
}

/// Compiles the fabric and writes the per-entry configuration errors.
/// An ambiguous rule set or any other fatal compile error is returned.
pub fn compile_fabric(
    config: &FabricdConfig,
    topology: &Topology,
    out: &mut impl Write,
) -> Result<Compilation> {
    let compilation = compile(topology, config.compiler_options()).inspect_err(|e| {
        error!("Compilation aborted: {}", e);
    })?;

    for e in &compilation.errors {
        warn!("{}", e);
    }
    report::write_compile_errors(out, &compilation.errors)?;
    Ok(compilation)
}

/// Prints the compiled flows in controller wire format.
pub fn dry_run(compilation: &Compilation, out: &mut impl Write) -> Result<RunSummary> {
    let batch = FlowBatch::from_rules(&compilation.rules);
    serde_json::to_writer_pretty(&mut *out, &batch)?;
    writeln!(out)?;

    let summary = RunSummary::from_compilation(compilation);
    info!(rules = summary.rules, "Dry run, nothing installed");
    Ok(summary)
}

/// Installs the compiled rules through `programmer` and writes one report
/// line per rule.
pub async fn install(
    config: &FabricdConfig,
    programmer: Arc<dyn RuleProgrammer>,
    compilation: &Compilation,
    out: &mut impl Write,
) -> Result<RunSummary> {
    let installer = Installer::new(programmer)
        .with_concurrency(config.install.concurrency)
        .with_request_timeout(config.controller.request_timeout());

    let outcome = installer.install(&compilation.rules).await;
    report::write_install_report(out, &outcome)?;

    Ok(RunSummary::from_compilation(compilation).with_install(&outcome))
}

/// Runs fabricd end to end against the configured controller.
#[instrument(skip_all, fields(topology = %args.topology.display(), dry_run = args.dry_run))]
pub async fn execute(args: &Args, out: &mut impl Write) -> Result<RunSummary> {
    let (config, topology) = load_inputs(args)?;
    let compilation = compile_fabric(&config, &topology, out)?;

    let summary = if args.dry_run {
        dry_run(&compilation, out)?
    } else {
        info!(
            controller = %config.controller.base_url(),
            rules = compilation.rules.len(),
            "Installing rules"
        );
        let programmer = OnosProgrammer::new(&config.controller)
            .map_err(|e| FabricdError::Configuration(e.to_string()))?;
        install(&config, Arc::new(programmer), &compilation, out).await?
    };

    report::write_summary(out, &summary)?;
    Ok(summary)
}
