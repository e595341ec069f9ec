//! Serializable topology description.
//!
//! File format (TOML):
//!
//! ```toml
//! [fabric]
//! router_mac = "00:00:00:00:00:99"
//!
//! [[vlans]]
//! id = 10
//! subnet = "10.0.10.0/24"
//! gateway = "10.0.10.1"
//!
//! [[switches]]
//! name = "s0a"
//! device_id = "of:0000000000000001"
//! role = "spine"
//!
//! [[hosts]]
//! name = "ha1"
//! mac = "00:00:00:00:01:01"
//! ip = "10.0.10.11"
//! vlan = 10
//! switch = "sa1"
//! port = 2
//!
//! [[links]]
//! a = { switch = "s0a", port = 2 }
//! b = { switch = "sa1", port = 1 }
//! ```

use fabric_types::{Ipv4Address, Ipv4Prefix, MacAddress, PortNumber, VlanId};
use serde::{Deserialize, Serialize};

use super::SwitchRole;

/// Fabric-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricConfig {
    /// Gateway MAC that hosts send routed traffic to.
    pub router_mac: MacAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanConfig {
    pub id: VlanId,
    pub subnet: Ipv4Prefix,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<Ipv4Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchConfig {
    pub name: String,
    pub device_id: String,
    pub role: SwitchRole,
    /// Number of pipeline tables; defaults from the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<u8>,
}

/// A host and its attachment point. `vlan` and `port` are optional so that
/// an incomplete entry can be loaded and reported instead of rejecting the
/// whole file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    pub name: String,
    pub mac: MacAddress,
    pub ip: Ipv4Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<VlanId>,
    pub switch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<PortNumber>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEnd {
    pub switch: String,
    pub port: PortNumber,
}

/// A point-to-point link between two switch ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub a: LinkEnd,
    pub b: LinkEnd,
}

/// Complete topology description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub fabric: FabricConfig,

    #[serde(default)]
    pub vlans: Vec<VlanConfig>,

    #[serde(default)]
    pub switches: Vec<SwitchConfig>,

    #[serde(default)]
    pub hosts: Vec<HostConfig>,

    #[serde(default)]
    pub links: Vec<LinkConfig>,
}

impl TopologyConfig {
    /// Creates an empty description for the given router MAC.
    pub fn new(router_mac: MacAddress) -> Self {
        Self {
            fabric: FabricConfig { router_mac },
            vlans: Vec::new(),
            switches: Vec::new(),
            hosts: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn with_vlan(mut self, id: VlanId, subnet: Ipv4Prefix) -> Self {
        self.vlans.push(VlanConfig {
            id,
            subnet,
            gateway: None,
        });
        self
    }

    pub fn with_switch(
        mut self,
        name: impl Into<String>,
        device_id: impl Into<String>,
        role: SwitchRole,
    ) -> Self {
        self.switches.push(SwitchConfig {
            name: name.into(),
            device_id: device_id.into(),
            role,
            tables: None,
        });
        self
    }

    pub fn with_host(mut self, host: HostConfig) -> Self {
        self.hosts.push(host);
        self
    }

    pub fn with_link(
        mut self,
        a: impl Into<String>,
        a_port: PortNumber,
        b: impl Into<String>,
        b_port: PortNumber,
    ) -> Self {
        self.links.push(LinkConfig {
            a: LinkEnd {
                switch: a.into(),
                port: a_port,
            },
            b: LinkEnd {
                switch: b.into(),
                port: b_port,
            },
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[fabric]
router_mac = "00:00:00:00:00:99"

[[vlans]]
id = 10
subnet = "10.0.10.0/24"

[[switches]]
name = "sa1"
device_id = "of:0000000000000003"
role = "leaf"

[[switches]]
name = "s0a"
device_id = "of:0000000000000001"
role = "spine"
tables = 1

[[hosts]]
name = "ha1"
mac = "00:00:00:00:01:01"
ip = "10.0.10.11"
vlan = 10
switch = "sa1"
port = 2

[[hosts]]
name = "ha9"
mac = "00:00:00:00:09:01"
ip = "10.0.10.99"
switch = "sa1"

[[links]]
a = { switch = "s0a", port = 2 }
b = { switch = "sa1", port = 1 }
"#;
        let config: TopologyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.fabric.router_mac.to_string(), "00:00:00:00:00:99");
        assert_eq!(config.switches.len(), 2);
        assert_eq!(config.switches[0].role, SwitchRole::Leaf);
        assert_eq!(config.switches[0].tables, None);
        assert_eq!(config.switches[1].tables, Some(1));
        assert_eq!(config.hosts[0].vlan.map(|v| v.as_u16()), Some(10));
        assert_eq!(config.hosts[1].vlan, None);
        assert_eq!(config.hosts[1].port, None);
        assert_eq!(config.links[0].b.port.as_u32(), 1);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let bad_vlan = r#"
[fabric]
router_mac = "00:00:00:00:00:99"

[[vlans]]
id = 4095
subnet = "10.0.10.0/24"
"#;
        assert!(toml::from_str::<TopologyConfig>(bad_vlan).is_err());

        let bad_mac = r#"
[fabric]
router_mac = "not-a-mac"
"#;
        assert!(toml::from_str::<TopologyConfig>(bad_mac).is_err());
    }
}
