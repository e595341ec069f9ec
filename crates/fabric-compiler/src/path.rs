//! Host endpoints and the transient path between two of them.
//!
//! A [`Path`] is derived per ordered host pair, turned into a
//! [`Scenario`](crate::Scenario) and dropped. It records which switches
//! the traffic crosses, the ports it uses and the VLAN tag on each link.

use fabric_types::{PortNumber, VlanId};
use serde::Serialize;
use std::fmt;

use crate::error::{CompileError, CompileResult};
use crate::rule::DeviceId;
use crate::topology::{Host, Switch, Topology, Vlan};

/// A host with its attachment checked against the model.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub host: &'a Host,
    pub leaf: &'a Switch,
    pub port: PortNumber,
    pub vlan: &'a Vlan,
}

impl<'a> Endpoint<'a> {
    /// Resolves a host's attachment. Fails with a configuration error
    /// naming the host when the entry is incomplete or inconsistent.
    pub fn resolve(topology: &'a Topology, host: &'a Host) -> CompileResult<Self> {
        let entity = format!("host {}", host.name);

        let port = host
            .port
            .ok_or_else(|| CompileError::config(&entity, "no attachment port"))?;
        let vlan_id = host
            .vlan
            .ok_or_else(|| CompileError::config(&entity, "no VLAN assigned"))?;
        let vlan = topology.vlan(vlan_id).ok_or_else(|| {
            CompileError::config(&entity, format!("VLAN {} is not declared", vlan_id))
        })?;
        let leaf = topology.switch(&host.switch).ok_or_else(|| {
            CompileError::config(&entity, format!("unknown switch '{}'", host.switch))
        })?;

        if !leaf.is_leaf() {
            return Err(CompileError::config(
                &entity,
                format!("attached to {} switch '{}'", leaf.role, leaf.name),
            ));
        }
        if !vlan.subnet.contains(&host.ip) {
            return Err(CompileError::config(
                &entity,
                format!(
                    "address {} is outside VLAN {} subnet {}",
                    host.ip, vlan.id, vlan.subnet
                ),
            ));
        }

        Ok(Self {
            host,
            leaf,
            port,
            vlan,
        })
    }

    pub fn vlan_id(&self) -> VlanId {
        self.vlan.id
    }
}

/// Forwarding case of an ordered host pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathClass {
    /// Both hosts on one leaf.
    SameSwitch,
    /// Same VLAN, different leaves.
    Bridged,
    /// Different VLANs, different leaves.
    Routed,
}

impl fmt::Display for PathClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathClass::SameSwitch => write!(f, "same-switch"),
            PathClass::Bridged => write!(f, "bridged"),
            PathClass::Routed => write!(f, "routed"),
        }
    }
}

/// One switch on a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub switch: String,
    pub device_id: DeviceId,
    pub in_port: PortNumber,
    pub out_port: PortNumber,
    /// Tag on the frame as it leaves this switch; `None` towards a host.
    pub egress_vlan: Option<VlanId>,
}

/// Ordered hop sequence from a source host to a destination host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub src: String,
    pub dst: String,
    pub class: PathClass,
    pub hops: Vec<Hop>,
    /// True when the frame leaves the source leaf with a different tag
    /// than the one it was classified with.
    pub retag: bool,
}

impl Path {
    /// Computes the path between two resolved endpoints.
    pub fn between(
        topology: &Topology,
        src: &Endpoint<'_>,
        dst: &Endpoint<'_>,
    ) -> CompileResult<Self> {
        let same_vlan = src.vlan_id() == dst.vlan_id();

        if src.leaf.name == dst.leaf.name {
            return Ok(Self {
                src: src.host.name.clone(),
                dst: dst.host.name.clone(),
                class: PathClass::SameSwitch,
                hops: vec![Hop {
                    switch: src.leaf.name.clone(),
                    device_id: src.leaf.device_id.clone(),
                    in_port: src.port,
                    out_port: dst.port,
                    egress_vlan: None,
                }],
                retag: !same_vlan,
            });
        }

        let spine = topology
            .primary_spine(&src.leaf.name, &dst.leaf.name)
            .ok_or_else(|| {
                CompileError::config(
                    pair_entity(src, dst),
                    format!(
                        "no spine links leaf '{}' with leaf '{}'",
                        src.leaf.name, dst.leaf.name
                    ),
                )
            })?;

        // primary_spine only returns spines linked to both leaves
        let missing = || {
            CompileError::config(
                pair_entity(src, dst),
                format!("spine '{}' port map is incomplete", spine.name),
            )
        };
        let uplink = topology
            .uplink(&src.leaf.name, &spine.name)
            .ok_or_else(missing)?;
        let spine_in = topology
            .downlink(&spine.name, &src.leaf.name)
            .ok_or_else(missing)?;
        let spine_out = topology
            .downlink(&spine.name, &dst.leaf.name)
            .ok_or_else(missing)?;
        let dst_uplink = topology
            .uplink(&dst.leaf.name, &spine.name)
            .ok_or_else(missing)?;

        let carried = dst.vlan_id();
        Ok(Self {
            src: src.host.name.clone(),
            dst: dst.host.name.clone(),
            class: if same_vlan {
                PathClass::Bridged
            } else {
                PathClass::Routed
            },
            hops: vec![
                Hop {
                    switch: src.leaf.name.clone(),
                    device_id: src.leaf.device_id.clone(),
                    in_port: src.port,
                    out_port: uplink,
                    egress_vlan: Some(carried),
                },
                Hop {
                    switch: spine.name.clone(),
                    device_id: spine.device_id.clone(),
                    in_port: spine_in,
                    out_port: spine_out,
                    egress_vlan: Some(carried),
                },
                Hop {
                    switch: dst.leaf.name.clone(),
                    device_id: dst.leaf.device_id.clone(),
                    in_port: dst_uplink,
                    out_port: dst.port,
                    egress_vlan: None,
                },
            ],
            retag: !same_vlan,
        })
    }

    pub fn first(&self) -> Option<&Hop> {
        self.hops.first()
    }

    pub fn last(&self) -> Option<&Hop> {
        self.hops.last()
    }

    /// Switch names in traversal order.
    pub fn switches(&self) -> Vec<String> {
        self.hops.iter().map(|h| h.switch.clone()).collect()
    }
}

pub(crate) fn pair_entity(src: &Endpoint<'_>, dst: &Endpoint<'_>) -> String {
    format!("pair {}->{}", src.host.name, dst.host.name)
}
