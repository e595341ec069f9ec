//! fabricd: compile a leaf/spine VLAN fabric and install it on the
//! controller.
//!
//! A run loads the daemon config and topology, compiles every host pair,
//! then either prints the flows (`--dry-run`) or installs them and reports
//! one line per rule. See [`app::execute`].

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod topology;

pub use app::{compile_fabric, dry_run, execute, install, load_inputs};
pub use cli::Args;
pub use config::{CompilerConfig, FabricdConfig, InstallConfig, DEFAULT_CONFIG_PATH};
pub use error::{FabricdError, Result};
pub use logging::init_logging;
pub use report::{ExitStatus, RunSummary};
pub use topology::load_topology;
