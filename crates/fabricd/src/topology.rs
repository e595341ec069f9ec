//! Topology file loading.

use crate::error::{FabricdError, Result};
use fabric_compiler::{Topology, TopologyConfig};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Reads a TOML topology description and builds the fabric model.
///
/// Unreadable or malformed files and structural topology errors fail the
/// load. Entry-level defects are kept on the model and reported by the
/// compiler.
pub fn load_topology(path: impl AsRef<Path>) -> Result<Topology> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| FabricdError::io(path, e))?;
    let config: TopologyConfig =
        toml::from_str(&content).map_err(|e| FabricdError::parse(path, e))?;

    let topology = Topology::new(config)?;
    for defect in topology.defects() {
        warn!(entity = %defect.entity, "{}", defect.reason);
    }
    info!(
        path = %path.display(),
        switches = topology.switches().count(),
        hosts = topology.hosts().count(),
        vlans = topology.vlans().count(),
        "Loaded topology"
    );
    Ok(topology)
}
