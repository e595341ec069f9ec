//! Controller flow encoding.
//!
//! A rule is posted as one JSON object:
//!
//! ```json
//! {
//!   "priority": 41000, "isPermanent": true,
//!   "deviceId": "of:0000000000000003", "tableId": 1,
//!   "selector": { "criteria": [ {"type": "VLAN_VID", "vlanId": 10} ] },
//!   "treatment": { "instructions": [ {"type": "OUTPUT", "port": 1} ] }
//! }
//! ```
//!
//! Rules that are not permanent also carry `"timeout"` in seconds.

use fabric_compiler::{Criterion, FlowRule, Instruction, OutputPort};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowPayload {
    pub priority: u16,
    pub is_permanent: bool,
    /// Seconds until expiry; the controller requires it on non-permanent flows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u16>,
    pub device_id: String,
    pub table_id: u8,
    pub selector: Selector,
    pub treatment: Treatment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub criteria: Vec<WireCriterion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treatment {
    pub instructions: Vec<WireInstruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireCriterion {
    InPort {
        port: u32,
    },
    EthDst {
        mac: String,
    },
    EthType {
        #[serde(rename = "ethType")]
        eth_type: String,
    },
    VlanVid {
        #[serde(rename = "vlanId")]
        vlan_id: u16,
    },
    #[serde(rename = "IPV4_DST")]
    Ipv4Dst {
        ip: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireInstruction {
    #[serde(rename = "L2MODIFICATION")]
    L2Modification(L2Modification),
    Table {
        #[serde(rename = "tableId")]
        table_id: u8,
    },
    Output {
        port: WirePort,
    },
}

/// Header rewrites, keyed by `subtype`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum L2Modification {
    VlanPush,
    VlanId {
        #[serde(rename = "vlanId")]
        vlan_id: u16,
    },
    VlanPop,
    EthSrc {
        mac: String,
    },
    EthDst {
        mac: String,
    },
}

/// Output port: a number, or a reserved name such as `CONTROLLER`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WirePort {
    Number(u32),
    Reserved(String),
}

/// Body of a `--dry-run` dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowBatch {
    pub flows: Vec<FlowPayload>,
}

impl From<&Criterion> for WireCriterion {
    fn from(criterion: &Criterion) -> Self {
        match criterion {
            Criterion::InPort(port) => Self::InPort {
                port: port.as_u32(),
            },
            Criterion::EthDst(mac) => Self::EthDst {
                mac: mac.to_string(),
            },
            Criterion::EthType(ty) => Self::EthType {
                eth_type: ty.to_string(),
            },
            Criterion::VlanVid(vlan) => Self::VlanVid {
                vlan_id: vlan.as_u16(),
            },
            Criterion::Ipv4Dst(prefix) => Self::Ipv4Dst {
                ip: prefix.to_string(),
            },
        }
    }
}

impl From<&Instruction> for WireInstruction {
    fn from(instruction: &Instruction) -> Self {
        match instruction {
            Instruction::VlanPush => Self::L2Modification(L2Modification::VlanPush),
            Instruction::SetVlan(vlan) => Self::L2Modification(L2Modification::VlanId {
                vlan_id: vlan.as_u16(),
            }),
            Instruction::VlanPop => Self::L2Modification(L2Modification::VlanPop),
            Instruction::SetEthSrc(mac) => Self::L2Modification(L2Modification::EthSrc {
                mac: mac.to_string(),
            }),
            Instruction::SetEthDst(mac) => Self::L2Modification(L2Modification::EthDst {
                mac: mac.to_string(),
            }),
            Instruction::GotoTable(table) => Self::Table { table_id: *table },
            Instruction::Output(OutputPort::Port(port)) => Self::Output {
                port: WirePort::Number(port.as_u32()),
            },
            Instruction::Output(OutputPort::Controller) => Self::Output {
                port: WirePort::Reserved("CONTROLLER".to_string()),
            },
        }
    }
}

impl From<&FlowRule> for FlowPayload {
    fn from(rule: &FlowRule) -> Self {
        Self {
            priority: rule.priority,
            is_permanent: rule.permanent,
            timeout: (!rule.permanent).then_some(rule.timeout),
            device_id: rule.device_id.to_string(),
            table_id: rule.table,
            selector: Selector {
                criteria: rule.criteria.iter().map(WireCriterion::from).collect(),
            },
            treatment: Treatment {
                instructions: rule
                    .instructions
                    .iter()
                    .map(WireInstruction::from)
                    .collect(),
            },
        }
    }
}

impl FlowBatch {
    pub fn from_rules<'a>(rules: impl IntoIterator<Item = &'a FlowRule>) -> Self {
        Self {
            flows: rules.into_iter().map(FlowPayload::from).collect(),
        }
    }
}
