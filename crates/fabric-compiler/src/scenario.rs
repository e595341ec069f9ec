//! Forwarding scenarios selected by the compiler.

use fabric_types::{Ipv4Address, PortNumber, VlanId};
use std::fmt;

use crate::generator::{self, Delivery, RuleContext, SpineTransit};
use crate::path::{Endpoint, Path, PathClass};
use crate::rule::{DeviceId, FlowRule, TableId};

/// One unit of rule generation. Each variant carries only what its
/// generator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    IngressClassifier {
        leaf: DeviceId,
        port: PortNumber,
        vlan: VlanId,
    },
    LocalRoute {
        leaf: DeviceId,
        src_vlan: VlanId,
        dst_ip: Ipv4Address,
        dst: Delivery,
    },
    /// Same leaf, same VLAN. The frame never reaches the gateway, so a
    /// router-MAC rewrite would not match; it is bridged to the host port.
    LocalBridge {
        leaf: DeviceId,
        dst: Delivery,
    },
    L2Bridge {
        transit: SpineTransit,
        dst: Delivery,
    },
    L3Route {
        transit: SpineTransit,
        src_vlan: VlanId,
        dst_ip: Ipv4Address,
        dst: Delivery,
    },
    ArpPunt {
        device: DeviceId,
        table: TableId,
    },
}

impl Scenario {
    /// Picks the scenario for a host pair from its path.
    pub fn for_pair(path: &Path, src: &Endpoint<'_>, dst: &Endpoint<'_>) -> Option<Self> {
        let delivery = Delivery {
            mac: dst.host.mac,
            vlan: dst.vlan_id(),
            port: dst.port,
        };

        match path.class {
            PathClass::SameSwitch if src.vlan_id() == dst.vlan_id() => Some(Self::LocalBridge {
                leaf: src.leaf.device_id.clone(),
                dst: delivery,
            }),
            PathClass::SameSwitch => Some(Self::LocalRoute {
                leaf: src.leaf.device_id.clone(),
                src_vlan: src.vlan_id(),
                dst_ip: dst.host.ip,
                dst: delivery,
            }),
            PathClass::Bridged => Some(Self::L2Bridge {
                transit: transit(path)?,
                dst: delivery,
            }),
            PathClass::Routed => Some(Self::L3Route {
                transit: transit(path)?,
                src_vlan: src.vlan_id(),
                dst_ip: dst.host.ip,
                dst: delivery,
            }),
        }
    }

    /// Runs the generator for this scenario.
    pub fn generate(&self, ctx: &RuleContext) -> Vec<FlowRule> {
        match self {
            Self::IngressClassifier { leaf, port, vlan } => {
                vec![generator::ingress_classifier(ctx, leaf, *port, *vlan)]
            }
            Self::LocalRoute {
                leaf,
                src_vlan,
                dst_ip,
                dst,
            } => vec![generator::local_route(ctx, leaf, *src_vlan, *dst_ip, *dst)],
            Self::LocalBridge { leaf, dst } => vec![generator::local_bridge(ctx, leaf, *dst)],
            Self::L2Bridge { transit, dst } => generator::l2_bridge(ctx, transit, *dst),
            Self::L3Route {
                transit,
                src_vlan,
                dst_ip,
                dst,
            } => generator::l3_route(ctx, transit, *src_vlan, *dst_ip, *dst),
            Self::ArpPunt { device, table } => vec![generator::arp_punt(ctx, device, *table)],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::IngressClassifier { .. } => "ingress-classifier",
            Self::LocalRoute { .. } => "local-route",
            Self::LocalBridge { .. } => "local-bridge",
            Self::L2Bridge { .. } => "l2-bridge",
            Self::L3Route { .. } => "l3-route",
            Self::ArpPunt { .. } => "arp-punt",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn transit(path: &Path) -> Option<SpineTransit> {
    let [source, spine, destination] = path.hops.as_slice() else {
        return None;
    };
    Some(SpineTransit {
        src_leaf: source.device_id.clone(),
        uplink: source.out_port,
        spine: spine.device_id.clone(),
        downlink: spine.out_port,
        dst_leaf: destination.device_id.clone(),
    })
}
