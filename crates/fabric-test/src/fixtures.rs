//! Reference fabrics for compiler tests
//!
//! The reference fabric is the two-VLAN lab network:
//!
//! ```text
//!                      s0a (of:..01)
//!            port 2 /     | port 3     \ port 4
//!        port 1    /      | port 1      \ port 1
//!             sa1 (..03)  sb1 (..04)     sc1 (..05)
//!          2 /  \ 3     2 /  \ 3       2 /  \ 3
//!         ha1   ha2     hb1   hb2      hc1   hc2
//! ```
//!
//! Port 2 of each leaf is in VLAN 10 (10.0.10.0/24), port 3 in VLAN 20
//! (10.0.20.0/24). The redundant variant adds spine s0b on port 4 of
//! every leaf and a spine-spine link on port 1.

use fabric_compiler::topology::{HostConfig, VlanConfig};
use fabric_compiler::{SwitchRole, Topology, TopologyConfig};
use fabric_types::{PortNumber, VlanId};

pub const ROUTER_MAC: &str = "00:00:00:00:00:99";

pub const S0A: &str = "of:0000000000000001";
pub const S0B: &str = "of:0000000000000002";
pub const SA1: &str = "of:0000000000000003";
pub const SB1: &str = "of:0000000000000004";
pub const SC1: &str = "of:0000000000000005";

/// Host names of the reference fabric, in name order.
pub static HOSTS: [&str; 6] = ["ha1", "ha2", "hb1", "hb2", "hc1", "hc2"];

pub fn port(n: u32) -> PortNumber {
    PortNumber::new(n).unwrap_or_else(|e| panic!("bad fixture port: {e}"))
}

pub fn vlan(id: u16) -> VlanId {
    VlanId::new(id).unwrap_or_else(|e| panic!("bad fixture VLAN: {e}"))
}

/// Builds a host entry attached to `switch`.
pub fn host(name: &str, mac: &str, ip: &str, vlan_id: u16, switch: &str, p: u32) -> HostConfig {
    HostConfig {
        name: name.to_string(),
        mac: mac
            .parse()
            .unwrap_or_else(|e| panic!("bad fixture MAC {mac}: {e}")),
        ip: ip
            .parse()
            .unwrap_or_else(|e| panic!("bad fixture address {ip}: {e}")),
        vlan: Some(vlan(vlan_id)),
        switch: switch.to_string(),
        port: Some(port(p)),
    }
}

fn vlans() -> Vec<VlanConfig> {
    vec![
        VlanConfig {
            id: vlan(10),
            subnet: "10.0.10.0/24".parse().unwrap_or_else(|e| panic!("{e}")),
            gateway: "10.0.10.1".parse().ok(),
        },
        VlanConfig {
            id: vlan(20),
            subnet: "10.0.20.0/24".parse().unwrap_or_else(|e| panic!("{e}")),
            gateway: "10.0.20.1".parse().ok(),
        },
    ]
}

/// Six hosts, two VLANs, three leaves, one spine.
pub fn reference_fabric() -> TopologyConfig {
    let mut config = TopologyConfig::new(
        ROUTER_MAC
            .parse()
            .unwrap_or_else(|e| panic!("bad router MAC: {e}")),
    );
    config.vlans = vlans();

    config
        .with_switch("s0a", S0A, SwitchRole::Spine)
        .with_switch("sa1", SA1, SwitchRole::Leaf)
        .with_switch("sb1", SB1, SwitchRole::Leaf)
        .with_switch("sc1", SC1, SwitchRole::Leaf)
        .with_host(host("ha1", "00:00:00:00:01:01", "10.0.10.11", 10, "sa1", 2))
        .with_host(host("ha2", "00:00:00:00:02:01", "10.0.20.11", 20, "sa1", 3))
        .with_host(host("hb1", "00:00:00:00:01:02", "10.0.10.12", 10, "sb1", 2))
        .with_host(host("hb2", "00:00:00:00:02:02", "10.0.20.12", 20, "sb1", 3))
        .with_host(host("hc1", "00:00:00:00:01:03", "10.0.10.13", 10, "sc1", 2))
        .with_host(host("hc2", "00:00:00:00:02:03", "10.0.20.13", 20, "sc1", 3))
        .with_link("s0a", port(2), "sa1", port(1))
        .with_link("s0a", port(3), "sb1", port(1))
        .with_link("s0a", port(4), "sc1", port(1))
}

/// The reference fabric with a second spine.
pub fn redundant_fabric() -> TopologyConfig {
    reference_fabric()
        .with_switch("s0b", S0B, SwitchRole::Spine)
        .with_link("s0a", port(1), "s0b", port(1))
        .with_link("s0b", port(2), "sa1", port(4))
        .with_link("s0b", port(3), "sb1", port(4))
        .with_link("s0b", port(4), "sc1", port(4))
}

/// Builds a topology, panicking on fixture errors.
pub fn build(config: TopologyConfig) -> Topology {
    Topology::new(config).unwrap_or_else(|e| panic!("fixture topology rejected: {e}"))
}

pub fn reference_topology() -> Topology {
    build(reference_fabric())
}
