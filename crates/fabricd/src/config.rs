//! Configuration file support for fabricd
//!
//! Loads and validates daemon settings from TOML.
//! Default location: /etc/fabricd/fabricd.toml
//!
//! ```toml
//! [controller]
//! host = "172.17.0.5"
//! port = 8181
//! username = "onos"
//! password = "rocks"
//! request_timeout_secs = 5
//!
//! [install]
//! concurrency = 8
//!
//! [priorities]
//! route = 41000
//!
//! [compiler]
//! vlan_aware_spine = true
//! ```

use crate::error::{FabricdError, Result};
use fabric_compiler::{CompilerOptions, Priorities, DEFAULT_RULE_TIMEOUT_SECS};
use fabric_installer::{ControllerConfig, DEFAULT_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fabricd/fabricd.toml";

/// Installation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Maximum requests in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

/// Compiler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Match the VLAN tag on spine transit rules
    #[serde(default = "default_vlan_aware_spine")]
    pub vlan_aware_spine: bool,

    /// Install rules as permanent (no idle/hard timeout)
    #[serde(default = "default_permanent")]
    pub permanent: bool,

    /// Expiry in seconds of rules installed with `permanent = false`
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u16,
}

/// Complete fabricd configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricdConfig {
    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub install: InstallConfig,

    #[serde(default)]
    pub priorities: Priorities,

    #[serde(default)]
    pub compiler: CompilerConfig,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_vlan_aware_spine() -> bool {
    true
}

fn default_permanent() -> bool {
    true
}

fn default_timeout_secs() -> u16 {
    DEFAULT_RULE_TIMEOUT_SECS
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            vlan_aware_spine: default_vlan_aware_spine(),
            permanent: default_permanent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FabricdConfig {
    /// Load configuration from file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| FabricdError::parse(path, e))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(FabricdError::io(path, e)),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.controller.host.trim().is_empty() {
            return Err(FabricdError::Configuration(
                "controller.host must not be empty".to_string(),
            ));
        }

        if self.controller.port == 0 {
            return Err(FabricdError::Configuration(
                "controller.port must be > 0".to_string(),
            ));
        }

        if self.controller.request_timeout_secs == 0 {
            return Err(FabricdError::Configuration(
                "controller.request_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.install.concurrency == 0 {
            return Err(FabricdError::Configuration(
                "install.concurrency must be > 0".to_string(),
            ));
        }

        if !self.compiler.permanent && self.compiler.timeout_secs == 0 {
            return Err(FabricdError::Configuration(
                "compiler.timeout_secs must be > 0 when rules are not permanent".to_string(),
            ));
        }

        self.priorities
            .validate()
            .map_err(|e| FabricdError::Configuration(e.to_string()))?;

        Ok(())
    }

    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            priorities: self.priorities,
            vlan_aware_spine: self.compiler.vlan_aware_spine,
            permanent: self.compiler.permanent,
            timeout_secs: self.compiler.timeout_secs,
        }
    }
}
