//! Installs compiled fabric rules through the controller.
//!
//! - [`RuleProgrammer`]: one-rule-at-a-time submission seam
//! - [`OnosProgrammer`]: REST implementation of that seam
//! - [`Installer`]: two-phase, bounded, best-effort bulk install
//! - [`wire`]: JSON flow encoding shared with the dry-run output

pub mod error;
pub mod installer;
pub mod onos;
pub mod programmer;
pub mod wire;

pub use error::{InstallError, InstallResult};
pub use installer::{InstallReport, Installer, Phase, RuleOutcome, DEFAULT_CONCURRENCY};
pub use onos::{ControllerConfig, OnosProgrammer};
pub use programmer::{MockProgrammer, RuleProgrammer};
pub use wire::{FlowBatch, FlowPayload};
