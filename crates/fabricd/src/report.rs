//! Operator-facing run report and exit status.

use fabric_compiler::{Compilation, CompileError};
use fabric_installer::InstallReport;
use std::io::{self, Write};
use std::process::ExitCode;

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Every entry compiled and every rule was accepted.
    Clean,
    /// Some entries or rules failed.
    Failures,
    /// Inputs could not be used at all.
    UnusableInput,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Clean => 0,
            ExitStatus::Failures => 1,
            ExitStatus::UnusableInput => 2,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rules: usize,
    pub pairs: usize,
    pub compile_errors: usize,
    /// None on a dry run.
    pub accepted: Option<usize>,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_compilation(compilation: &Compilation) -> Self {
        Self {
            rules: compilation.rules.len(),
            pairs: compilation.paths.len(),
            compile_errors: compilation.errors.len(),
            accepted: None,
            failed: 0,
        }
    }

    pub fn with_install(mut self, report: &InstallReport) -> Self {
        self.accepted = Some(report.accepted());
        self.failed = report.outcomes.len() - report.accepted();
        self
    }

    pub fn exit_status(&self) -> ExitStatus {
        if self.compile_errors == 0 && self.failed == 0 {
            ExitStatus::Clean
        } else {
            ExitStatus::Failures
        }
    }
}

pub fn write_compile_errors(out: &mut impl Write, errors: &[CompileError]) -> io::Result<()> {
    for error in errors {
        writeln!(out, "SKIPPED {}", error)?;
    }
    Ok(())
}

/// One line per rule, in compilation order.
pub fn write_install_report(out: &mut impl Write, report: &InstallReport) -> io::Result<()> {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => writeln!(out, "OK      {}", outcome.rule)?,
            Err(e) => writeln!(out, "FAILED  {}: {}", outcome.rule, e)?,
        }
    }
    Ok(())
}

pub fn write_summary(out: &mut impl Write, summary: &RunSummary) -> io::Result<()> {
    match summary.accepted {
        Some(accepted) => writeln!(
            out,
            "{} rule(s) for {} host pair(s): {} accepted, {} failed, {} configuration error(s)",
            summary.rules, summary.pairs, accepted, summary.failed, summary.compile_errors
        ),
        None => writeln!(
            out,
            "{} rule(s) for {} host pair(s), {} configuration error(s), nothing installed",
            summary.rules, summary.pairs, summary.compile_errors
        ),
    }
}
