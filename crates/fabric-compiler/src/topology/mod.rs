//! Topology and addressing model.
//!
//! [`Topology`] is built once from a [`TopologyConfig`] and is read-only
//! afterwards. It is the single source of truth for rule generation:
//! switch roles, port maps, host attachments and VLAN subnets.
//!
//! Structural problems (duplicate names, two peers on one port) are
//! rejected by [`Topology::new`]. Problems confined to one entry, such as
//! a link naming an unknown switch, are kept as [`Defect`]s so the
//! compiler can report them and continue with the rest of the fabric.

mod config;

pub use config::{FabricConfig, HostConfig, LinkConfig, LinkEnd, SwitchConfig, TopologyConfig, VlanConfig};

use fabric_types::{Ipv4Address, Ipv4Prefix, MacAddress, PortNumber, VlanId};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

use crate::error::{TopologyError, TopologyResult};
use crate::rule::{DeviceId, TableId};

/// Switch role in the two-tier fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchRole {
    /// Aggregation switch, connects leaves only.
    Spine,
    /// First-hop switch with attached hosts.
    Leaf,
}

impl SwitchRole {
    /// Minimum number of pipeline tables the generated rules use.
    pub const fn required_tables(&self) -> u8 {
        match self {
            SwitchRole::Spine => 1,
            SwitchRole::Leaf => 2,
        }
    }

    /// Table that receives the ARP punt: the forwarding table of a leaf,
    /// the only table of a spine.
    pub const fn control_table(&self) -> TableId {
        match self {
            SwitchRole::Spine => 0,
            SwitchRole::Leaf => 1,
        }
    }
}

impl fmt::Display for SwitchRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchRole::Spine => write!(f, "spine"),
            SwitchRole::Leaf => write!(f, "leaf"),
        }
    }
}

/// What sits on the far side of a switch port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortPeer {
    Host(String),
    Switch { name: String, port: PortNumber },
}

impl fmt::Display for PortPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortPeer::Host(name) => write!(f, "host {}", name),
            PortPeer::Switch { name, port } => write!(f, "link to {}:{}", name, port),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    pub name: String,
    pub device_id: DeviceId,
    pub role: SwitchRole,
    pub tables: u8,
    /// Local port to neighbor, ordered by port number.
    pub ports: BTreeMap<PortNumber, PortPeer>,
}

impl Switch {
    pub fn is_leaf(&self) -> bool {
        self.role == SwitchRole::Leaf
    }

    pub fn is_spine(&self) -> bool {
        self.role == SwitchRole::Spine
    }

    /// Lowest-numbered local port linked to `neighbor`.
    pub fn port_towards(&self, neighbor: &str) -> Option<PortNumber> {
        self.ports.iter().find_map(|(port, peer)| match peer {
            PortPeer::Switch { name, .. } if name == neighbor => Some(*port),
            _ => None,
        })
    }

    /// Names of directly linked switches, without duplicates.
    pub fn neighbors(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .ports
            .values()
            .filter_map(|peer| match peer {
                PortPeer::Switch { name, .. } => Some(name.as_str()),
                PortPeer::Host(_) => None,
            })
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub name: String,
    pub mac: MacAddress,
    pub ip: Ipv4Address,
    pub vlan: Option<VlanId>,
    /// Name of the attachment switch as written in the description.
    pub switch: String,
    pub port: Option<PortNumber>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vlan {
    pub id: VlanId,
    pub subnet: Ipv4Prefix,
    pub gateway: Option<Ipv4Address>,
}

/// An entry-level problem found while building the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defect {
    pub entity: String,
    pub reason: String,
}

/// Immutable fabric model.
#[derive(Debug, Clone)]
pub struct Topology {
    router_mac: MacAddress,
    vlans: BTreeMap<VlanId, Vlan>,
    switches: BTreeMap<String, Switch>,
    hosts: BTreeMap<String, Host>,
    defects: Vec<Defect>,
}

impl Topology {
    /// Builds the model from a description.
    pub fn new(config: TopologyConfig) -> TopologyResult<Self> {
        let router_mac = config.fabric.router_mac;
        if !router_mac.is_station() {
            return Err(TopologyError::InvalidRouterMac(router_mac));
        }

        let mut vlans = BTreeMap::new();
        for vlan in config.vlans {
            match vlans.entry(vlan.id) {
                Entry::Occupied(_) => return Err(TopologyError::DuplicateVlan(vlan.id)),
                Entry::Vacant(slot) => {
                    slot.insert(Vlan {
                        id: vlan.id,
                        subnet: vlan.subnet,
                        gateway: vlan.gateway,
                    });
                }
            }
        }

        let mut switches = BTreeMap::new();
        let mut device_owner: HashMap<String, String> = HashMap::new();
        for sw in config.switches {
            if switches.contains_key(&sw.name) {
                return Err(TopologyError::DuplicateSwitch(sw.name));
            }
            if let Some(first) = device_owner.insert(sw.device_id.clone(), sw.name.clone()) {
                return Err(TopologyError::DuplicateDeviceId {
                    device: sw.device_id,
                    first,
                    second: sw.name,
                });
            }

            let required = sw.role.required_tables();
            let tables = sw.tables.unwrap_or(required);
            if tables < required {
                return Err(TopologyError::InsufficientTables {
                    switch: sw.name,
                    role: sw.role,
                    tables,
                    required,
                });
            }

            switches.insert(
                sw.name.clone(),
                Switch {
                    name: sw.name,
                    device_id: DeviceId::new(sw.device_id),
                    role: sw.role,
                    tables,
                    ports: BTreeMap::new(),
                },
            );
        }

        let mut hosts = BTreeMap::new();
        let mut mac_owner: HashMap<MacAddress, String> = HashMap::new();
        let mut ip_owner: HashMap<Ipv4Address, String> = HashMap::new();
        for host in config.hosts {
            if hosts.contains_key(&host.name) {
                return Err(TopologyError::DuplicateHost(host.name));
            }
            if host.mac == router_mac {
                return Err(TopologyError::RouterMacCollision {
                    host: host.name,
                    mac: host.mac,
                });
            }
            if let Some(first) = mac_owner.insert(host.mac, host.name.clone()) {
                return Err(TopologyError::DuplicateHostMac {
                    mac: host.mac,
                    first,
                    second: host.name,
                });
            }
            if let Some(first) = ip_owner.insert(host.ip, host.name.clone()) {
                return Err(TopologyError::DuplicateHostAddress {
                    address: host.ip,
                    first,
                    second: host.name,
                });
            }

            if let (Some(sw), Some(port)) = (switches.get_mut(&host.switch), host.port) {
                claim_port(sw, port, PortPeer::Host(host.name.clone()))?;
            }

            hosts.insert(
                host.name.clone(),
                Host {
                    name: host.name,
                    mac: host.mac,
                    ip: host.ip,
                    vlan: host.vlan,
                    switch: host.switch,
                    port: host.port,
                },
            );
        }

        let mut defects = Vec::new();
        for link in config.links {
            let entity = format!(
                "link {}:{} - {}:{}",
                link.a.switch, link.a.port, link.b.switch, link.b.port
            );

            if link.a.switch == link.b.switch {
                defects.push(Defect {
                    entity,
                    reason: "both ends are on the same switch".to_string(),
                });
                continue;
            }
            let missing: Vec<&str> = [&link.a.switch, &link.b.switch]
                .into_iter()
                .filter(|name| !switches.contains_key(*name))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                defects.push(Defect {
                    entity,
                    reason: format!("references unknown switch '{}'", missing.join("', '")),
                });
                continue;
            }

            for (near, far) in [(&link.a, &link.b), (&link.b, &link.a)] {
                if let Some(sw) = switches.get_mut(&near.switch) {
                    claim_port(
                        sw,
                        near.port,
                        PortPeer::Switch {
                            name: far.switch.clone(),
                            port: far.port,
                        },
                    )?;
                }
            }
        }

        debug!(
            switches = switches.len(),
            hosts = hosts.len(),
            vlans = vlans.len(),
            defects = defects.len(),
            "Built topology"
        );

        Ok(Self {
            router_mac,
            vlans,
            switches,
            hosts,
            defects,
        })
    }

    pub fn router_mac(&self) -> MacAddress {
        self.router_mac
    }

    pub fn switch(&self, name: &str) -> Option<&Switch> {
        self.switches.get(name)
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    pub fn vlan(&self, id: VlanId) -> Option<&Vlan> {
        self.vlans.get(&id)
    }

    /// Switches in name order.
    pub fn switches(&self) -> impl Iterator<Item = &Switch> {
        self.switches.values()
    }

    /// Hosts in name order.
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn vlans(&self) -> impl Iterator<Item = &Vlan> {
        self.vlans.values()
    }

    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    /// Spines linked to both leaves, in name order.
    pub fn spines_between<'a>(
        &'a self,
        leaf_a: &'a str,
        leaf_b: &'a str,
    ) -> impl Iterator<Item = &'a Switch> + 'a {
        self.switches.values().filter(move |sw| {
            sw.is_spine()
                && sw.port_towards(leaf_a).is_some()
                && sw.port_towards(leaf_b).is_some()
        })
    }

    /// The spine carrying traffic between two leaves: the first by name
    /// among those linked to both.
    pub fn primary_spine<'a>(&'a self, leaf_a: &'a str, leaf_b: &'a str) -> Option<&'a Switch> {
        self.spines_between(leaf_a, leaf_b).next()
    }

    /// Leaf port facing `spine`.
    pub fn uplink(&self, leaf: &str, spine: &str) -> Option<PortNumber> {
        self.switches.get(leaf)?.port_towards(spine)
    }

    /// Spine port facing `leaf`.
    pub fn downlink(&self, spine: &str, leaf: &str) -> Option<PortNumber> {
        self.switches.get(spine)?.port_towards(leaf)
    }
}

fn claim_port(switch: &mut Switch, port: PortNumber, peer: PortPeer) -> TopologyResult<()> {
    match switch.ports.entry(port) {
        Entry::Occupied(existing) => Err(TopologyError::PortConflict {
            switch: switch.name.clone(),
            port,
            existing: existing.get().to_string(),
            claimant: peer.to_string(),
        }),
        Entry::Vacant(slot) => {
            slot.insert(peer);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn port(n: u32) -> PortNumber {
        PortNumber::new(n).unwrap()
    }

    fn host(name: &str, mac: &str, ip: &str, vlan: u16, switch: &str, p: u32) -> HostConfig {
        HostConfig {
            name: name.to_string(),
            mac: mac.parse().unwrap(),
            ip: ip.parse().unwrap(),
            vlan: Some(VlanId::new(vlan).unwrap()),
            switch: switch.to_string(),
            port: Some(port(p)),
        }
    }

    fn small_fabric() -> TopologyConfig {
        TopologyConfig::new("00:00:00:00:00:99".parse().unwrap())
            .with_vlan(VlanId::new(10).unwrap(), "10.0.10.0/24".parse().unwrap())
            .with_switch("s0a", "of:0000000000000001", SwitchRole::Spine)
            .with_switch("s0b", "of:0000000000000002", SwitchRole::Spine)
            .with_switch("sa1", "of:0000000000000003", SwitchRole::Leaf)
            .with_switch("sb1", "of:0000000000000004", SwitchRole::Leaf)
            .with_host(host("ha1", "00:00:00:00:01:01", "10.0.10.11", 10, "sa1", 2))
            .with_host(host("hb1", "00:00:00:00:01:02", "10.0.10.12", 10, "sb1", 2))
            .with_link("s0a", port(2), "sa1", port(1))
            .with_link("s0a", port(3), "sb1", port(1))
            .with_link("s0b", port(2), "sa1", port(4))
            .with_link("s0b", port(3), "sb1", port(4))
    }

    #[test]
    fn test_port_map() {
        let topo = Topology::new(small_fabric()).unwrap();
        let sa1 = topo.switch("sa1").unwrap();
        assert_eq!(sa1.tables, 2);
        assert_eq!(sa1.ports.get(&port(2)), Some(&PortPeer::Host("ha1".to_string())));
        assert_eq!(sa1.port_towards("s0a"), Some(port(1)));
        assert_eq!(sa1.port_towards("s0b"), Some(port(4)));
        assert_eq!(sa1.neighbors(), vec!["s0a", "s0b"]);

        let s0a = topo.switch("s0a").unwrap();
        assert_eq!(s0a.tables, 1);
        assert_eq!(s0a.port_towards("sb1"), Some(port(3)));

        assert_eq!(topo.uplink("sb1", "s0b"), Some(port(4)));
        assert_eq!(topo.downlink("s0b", "sb1"), Some(port(3)));
        assert_eq!(topo.downlink("s0a", "missing"), None);
    }

    #[test]
    fn test_primary_spine_is_first_by_name() {
        let topo = Topology::new(small_fabric()).unwrap();
        let spines: Vec<&str> = topo
            .spines_between("sa1", "sb1")
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(spines, vec!["s0a", "s0b"]);
        assert_eq!(topo.primary_spine("sa1", "sb1").unwrap().name, "s0a");
    }

    #[test]
    fn test_primary_spine_for_owned_leaf_names() {
        let topo = Topology::new(small_fabric()).unwrap();
        let leaves: Vec<String> = vec!["sb1".to_string(), "sa1".to_string()];
        let spine = topo.primary_spine(&leaves[0], &leaves[1]);
        assert_eq!(spine.map(|s| s.name.as_str()), Some("s0a"));
        assert!(topo.primary_spine(&leaves[0], "missing").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let config = small_fabric().with_switch("sa1", "of:00000000000000ff", SwitchRole::Leaf);
        assert_eq!(
            Topology::new(config).unwrap_err(),
            TopologyError::DuplicateSwitch("sa1".to_string())
        );

        let config = small_fabric().with_switch("sz9", "of:0000000000000003", SwitchRole::Leaf);
        assert!(matches!(
            Topology::new(config),
            Err(TopologyError::DuplicateDeviceId { .. })
        ));
    }

    #[test]
    fn test_duplicate_host_addresses_rejected() {
        let config =
            small_fabric().with_host(host("hx", "00:00:00:00:01:01", "10.0.10.50", 10, "sa1", 5));
        assert!(matches!(
            Topology::new(config),
            Err(TopologyError::DuplicateHostMac { .. })
        ));

        let config =
            small_fabric().with_host(host("hx", "00:00:00:00:0a:01", "10.0.10.11", 10, "sa1", 5));
        assert!(matches!(
            Topology::new(config),
            Err(TopologyError::DuplicateHostAddress { .. })
        ));

        let config =
            small_fabric().with_host(host("hx", "00:00:00:00:00:99", "10.0.10.50", 10, "sa1", 5));
        assert!(matches!(
            Topology::new(config),
            Err(TopologyError::RouterMacCollision { .. })
        ));
    }

    #[test]
    fn test_port_conflict_rejected() {
        let config = small_fabric().with_link("s0a", port(4), "sa1", port(2));
        assert_eq!(
            Topology::new(config).unwrap_err(),
            TopologyError::PortConflict {
                switch: "sa1".to_string(),
                port: port(2),
                existing: "host ha1".to_string(),
                claimant: "link to s0a:4".to_string(),
            }
        );
    }

    #[test]
    fn test_insufficient_tables_rejected() {
        let mut config = small_fabric();
        config.switches[2].tables = Some(1);
        assert!(matches!(
            Topology::new(config),
            Err(TopologyError::InsufficientTables { required: 2, .. })
        ));
    }

    #[test]
    fn test_dangling_link_is_a_defect() {
        let config = small_fabric().with_link("s0a", port(9), "sz9", port(1));
        let topo = Topology::new(config).unwrap();
        assert_eq!(topo.defects().len(), 1);
        assert_eq!(topo.defects()[0].entity, "link s0a:9 - sz9:1");
        assert!(topo.defects()[0].reason.contains("sz9"));
        // The known end is left untouched
        assert!(topo.switch("s0a").unwrap().ports.get(&port(9)).is_none());
    }

    #[test]
    fn test_invalid_router_mac() {
        let mut config = small_fabric();
        config.fabric.router_mac = MacAddress::BROADCAST;
        assert!(matches!(
            Topology::new(config),
            Err(TopologyError::InvalidRouterMac(_))
        ));
    }
}
