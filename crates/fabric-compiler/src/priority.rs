//! Priority plan for generated rules.
//!
//! The plan keeps the tiers apart so that overlapping entries in one table
//! always resolve the same way:
//!
//! ```text
//! punt    42000  ARP to controller, above every data rule
//! route   41000  routed traffic (router MAC / local routes)
//! ingress 40100  VLAN classification on host ports
//! bridge  40000  bridged traffic, spine and delivery hops
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};
use crate::rule::Priority;

/// Priority for each class of generated rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priorities {
    #[serde(default = "default_bridge")]
    pub bridge: Priority,

    #[serde(default = "default_ingress")]
    pub ingress: Priority,

    #[serde(default = "default_route")]
    pub route: Priority,

    #[serde(default = "default_punt")]
    pub punt: Priority,
}

fn default_bridge() -> Priority {
    40000
}

fn default_ingress() -> Priority {
    40100
}

fn default_route() -> Priority {
    41000
}

fn default_punt() -> Priority {
    42000
}

impl Default for Priorities {
    fn default() -> Self {
        Self {
            bridge: default_bridge(),
            ingress: default_ingress(),
            route: default_route(),
            punt: default_punt(),
        }
    }
}

impl Priorities {
    /// Checks the ordering the generators rely on.
    pub fn validate(&self) -> CompileResult<()> {
        if self.route <= self.bridge {
            return Err(CompileError::invalid_priorities(format!(
                "route priority {} must be above bridge priority {}",
                self.route, self.bridge
            )));
        }

        if self.ingress == self.bridge {
            return Err(CompileError::invalid_priorities(format!(
                "ingress priority {} must differ from bridge priority",
                self.ingress
            )));
        }

        let highest_data = self.bridge.max(self.ingress).max(self.route);
        if self.punt <= highest_data {
            return Err(CompileError::invalid_priorities(format!(
                "punt priority {} must be above every data priority (highest is {})",
                self.punt, highest_data
            )));
        }

        Ok(())
    }
}
