//! Match-action rule types.
//!
//! A [`FlowRule`] is one entry in one table of one device's pipeline:
//! - Match criteria (which packets the entry applies to)
//! - Instructions (header rewrites followed by exactly one terminal step)
//! - Priority (which entry wins when several match)
//!
//! Rules are plain values. Two rules with the same device, table,
//! priority, criteria and instructions are the same rule, which is what
//! makes re-installation idempotent.

use fabric_types::{EtherType, Ipv4Prefix, MacAddress, PortNumber, VlanId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Table index inside a device pipeline.
pub type TableId = u8;

/// Rule priority (higher value wins on overlapping matches).
pub type Priority = u16;

/// Controller-side device identifier (e.g. `of:0000000000000003`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Packet field a criterion constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CriterionKind {
    InPort,
    EthDst,
    EthType,
    VlanVid,
    Ipv4Dst,
}

/// A single match criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Criterion {
    /// Ingress port.
    InPort(PortNumber),
    /// Destination link-layer address.
    EthDst(MacAddress),
    /// Frame type.
    EthType(EtherType),
    /// Outer VLAN tag; only matches tagged frames.
    VlanVid(VlanId),
    /// Destination network address.
    Ipv4Dst(Ipv4Prefix),
}

impl Criterion {
    pub fn kind(&self) -> CriterionKind {
        match self {
            Self::InPort(_) => CriterionKind::InPort,
            Self::EthDst(_) => CriterionKind::EthDst,
            Self::EthType(_) => CriterionKind::EthType,
            Self::VlanVid(_) => CriterionKind::VlanVid,
            Self::Ipv4Dst(_) => CriterionKind::Ipv4Dst,
        }
    }

    /// Returns true if some packet satisfies both criteria. Criteria on
    /// different fields never exclude each other.
    pub fn intersects(&self, other: &Criterion) -> bool {
        match (self, other) {
            (Self::InPort(a), Self::InPort(b)) => a == b,
            (Self::EthDst(a), Self::EthDst(b)) => a == b,
            (Self::EthType(a), Self::EthType(b)) => a == b,
            (Self::VlanVid(a), Self::VlanVid(b)) => a == b,
            (Self::Ipv4Dst(a), Self::Ipv4Dst(b)) => a.overlaps(b),
            _ => true,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InPort(port) => write!(f, "in_port={}", port),
            Self::EthDst(mac) => write!(f, "eth_dst={}", mac),
            Self::EthType(ty) => write!(f, "eth_type={}", ty),
            Self::VlanVid(vlan) => write!(f, "vlan={}", vlan),
            Self::Ipv4Dst(prefix) => write!(f, "ipv4_dst={}", prefix),
        }
    }
}

/// Where an output instruction sends the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputPort {
    Port(PortNumber),
    Controller,
}

impl fmt::Display for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Port(port) => write!(f, "{}", port),
            Self::Controller => write!(f, "CONTROLLER"),
        }
    }
}

/// A single instruction, applied in list order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instruction {
    /// Push an 802.1Q header.
    VlanPush,
    /// Set the VLAN id of the outermost tag.
    SetVlan(VlanId),
    /// Pop the outermost 802.1Q header.
    VlanPop,
    SetEthSrc(MacAddress),
    SetEthDst(MacAddress),
    /// Continue processing in a later table (terminal).
    GotoTable(TableId),
    /// Emit the packet (terminal).
    Output(OutputPort),
}

impl Instruction {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::GotoTable(_) | Self::Output(_))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VlanPush => write!(f, "push_vlan"),
            Self::SetVlan(vlan) => write!(f, "set_vlan:{}", vlan),
            Self::VlanPop => write!(f, "pop_vlan"),
            Self::SetEthSrc(mac) => write!(f, "set_eth_src:{}", mac),
            Self::SetEthDst(mac) => write!(f, "set_eth_dst:{}", mac),
            Self::GotoTable(table) => write!(f, "goto_table:{}", table),
            Self::Output(port) => write!(f, "output:{}", port),
        }
    }
}

/// Structural defects a rule can have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule has no match criteria")]
    NoCriteria,

    #[error("rule has no terminal instruction")]
    NoTerminal,

    #[error("terminal instruction '{0}' is not the last instruction")]
    TerminalNotLast(Instruction),

    #[error("goto_table:{to} from table {from} does not move forward")]
    BackwardGoto { from: TableId, to: TableId },

    #[error("rule pops the VLAN tag it pushed")]
    PushThenPop,

    #[error("set_vlan on a frame that carries no tag")]
    SetVlanUntagged,

    #[error("VLAN tag is popped twice")]
    DoublePop,

    #[error("non-permanent rule has no timeout")]
    MissingTimeout,
}

/// A match-action entry for one table of one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowRule {
    pub device_id: DeviceId,
    pub table: TableId,
    pub priority: Priority,
    pub permanent: bool,
    /// Seconds before a non-permanent rule expires; 0 when permanent.
    pub timeout: u16,
    pub criteria: Vec<Criterion>,
    pub instructions: Vec<Instruction>,
}

impl FlowRule {
    /// Creates an empty permanent rule at priority 0.
    pub fn new(device_id: DeviceId, table: TableId) -> Self {
        Self {
            device_id,
            table,
            priority: 0,
            permanent: true,
            timeout: 0,
            criteria: Vec::new(),
            instructions: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Makes the rule expire after `secs` seconds.
    pub fn with_timeout(mut self, secs: u16) -> Self {
        self.permanent = false;
        self.timeout = secs;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn criterion(&self, kind: CriterionKind) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.kind() == kind)
    }

    /// Returns the VLAN id this rule matches on, if any.
    pub fn matched_vlan(&self) -> Option<VlanId> {
        self.criteria.iter().find_map(|c| match c {
            Criterion::VlanVid(vlan) => Some(*vlan),
            _ => None,
        })
    }

    pub fn pushes_tag(&self) -> bool {
        self.instructions.contains(&Instruction::VlanPush)
    }

    pub fn pops_tag(&self) -> bool {
        self.instructions.contains(&Instruction::VlanPop)
    }

    /// Returns the terminal instruction, if the rule has one at the end.
    pub fn terminal(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.is_terminal())
    }

    /// Returns true for rules other entries depend on to see packets at
    /// all: tag-pushing classifiers and punts to the controller.
    pub fn is_pipeline_entry(&self) -> bool {
        self.instructions.iter().any(|i| {
            matches!(
                i,
                Instruction::VlanPush | Instruction::Output(OutputPort::Controller)
            )
        })
    }

    /// Returns true if some packet could match both rules. Only meaningful
    /// for rules on the same device and table.
    pub fn overlaps(&self, other: &FlowRule) -> bool {
        self.criteria.iter().all(|a| {
            other
                .criteria
                .iter()
                .filter(|b| b.kind() == a.kind())
                .all(|b| a.intersects(b))
        })
    }

    /// Renders the match criteria for log lines, e.g.
    /// `eth_dst=00:00:00:00:02:02,vlan=20`.
    pub fn match_summary(&self) -> String {
        self.criteria
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Validates the rule's internal consistency.
    ///
    /// Tag tracking starts from what the match guarantees: a `VlanVid`
    /// criterion means the frame is tagged on entry.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.criteria.is_empty() {
            return Err(RuleError::NoCriteria);
        }
        if !self.permanent && self.timeout == 0 {
            return Err(RuleError::MissingTimeout);
        }

        let Some(last) = self.instructions.last() else {
            return Err(RuleError::NoTerminal);
        };
        if !last.is_terminal() {
            return Err(RuleError::NoTerminal);
        }
        if let Some(early) = self.instructions[..self.instructions.len() - 1]
            .iter()
            .find(|i| i.is_terminal())
        {
            return Err(RuleError::TerminalNotLast(*early));
        }
        if let Instruction::GotoTable(to) = last {
            if *to <= self.table {
                return Err(RuleError::BackwardGoto {
                    from: self.table,
                    to: *to,
                });
            }
        }

        let mut tagged = self.matched_vlan().is_some();
        let mut pushed = false;
        for instruction in &self.instructions {
            match instruction {
                Instruction::VlanPush => {
                    tagged = true;
                    pushed = true;
                }
                Instruction::VlanPop => {
                    if pushed {
                        return Err(RuleError::PushThenPop);
                    }
                    if !tagged {
                        return Err(RuleError::DoublePop);
                    }
                    tagged = false;
                }
                Instruction::SetVlan(_) if !tagged => return Err(RuleError::SetVlanUntagged),
                _ => {}
            }
        }

        Ok(())
    }
}

impl fmt::Display for FlowRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let instructions = self
            .instructions
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(
            f,
            "{} table={} priority={} match[{}] actions[{}]",
            self.device_id,
            self.table,
            self.priority,
            self.match_summary(),
            instructions
        )
    }
}
