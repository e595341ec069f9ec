//! Rule generators, one pure function per forwarding scenario.
//!
//! Generators take small value inputs and return rules. They never look
//! at the topology; the compiler resolves ports and VLANs before calling
//! them.
//!
//! Pipeline layout on a leaf:
//!
//! ```text
//! table 0: ingress classifiers (host ports), delivery from the spine
//! table 1: forwarding decisions for classified traffic, ARP punt
//! ```
//!
//! A spine has a single table carrying transit rules and its ARP punt.

use fabric_types::{EtherType, Ipv4Address, MacAddress, PortNumber, VlanId};

use crate::priority::Priorities;
use crate::rule::{Criterion, DeviceId, FlowRule, Instruction, OutputPort, TableId};

/// Table classifying untagged host traffic on a leaf.
pub const CLASSIFIER_TABLE: TableId = 0;

/// Table holding forwarding decisions on a leaf.
pub const FORWARDING_TABLE: TableId = 1;

/// Single table of a spine.
pub const SPINE_TABLE: TableId = 0;

/// Expiry used for non-permanent rules unless configured otherwise.
pub const DEFAULT_RULE_TIMEOUT_SECS: u16 = 600;

/// Settings shared by every generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleContext {
    pub router_mac: MacAddress,
    pub priorities: Priorities,
    /// Match the VLAN tag as well as the address on spine hops.
    pub vlan_aware_spine: bool,
    pub permanent: bool,
    /// Expiry of non-permanent rules, in seconds.
    pub timeout_secs: u16,
}

impl RuleContext {
    pub fn new(router_mac: MacAddress) -> Self {
        Self {
            router_mac,
            priorities: Priorities::default(),
            vlan_aware_spine: true,
            permanent: true,
            timeout_secs: DEFAULT_RULE_TIMEOUT_SECS,
        }
    }

    fn rule(&self, device: &DeviceId, table: TableId) -> FlowRule {
        let rule = FlowRule::new(device.clone(), table);
        if self.permanent {
            rule
        } else {
            rule.with_timeout(self.timeout_secs)
        }
    }
}

/// Transit hops of a path through one spine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineTransit {
    pub src_leaf: DeviceId,
    /// Source leaf port towards the spine.
    pub uplink: PortNumber,
    pub spine: DeviceId,
    /// Spine port towards the destination leaf.
    pub downlink: PortNumber,
    pub dst_leaf: DeviceId,
}

/// Destination host as seen by the last hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub mac: MacAddress,
    pub vlan: VlanId,
    pub port: PortNumber,
}

/// Tags untagged frames arriving on a host port with the host's VLAN.
pub fn ingress_classifier(
    ctx: &RuleContext,
    leaf: &DeviceId,
    port: PortNumber,
    vlan: VlanId,
) -> FlowRule {
    ctx.rule(leaf, CLASSIFIER_TABLE)
        .with_priority(ctx.priorities.ingress)
        .with_criterion(Criterion::InPort(port))
        .with_instruction(Instruction::VlanPush)
        .with_instruction(Instruction::SetVlan(vlan))
        .with_instruction(Instruction::GotoTable(FORWARDING_TABLE))
}

/// Routes between two VLANs on one leaf. Rewrites happen while the frame
/// is still tagged; the pop comes right before output.
pub fn local_route(
    ctx: &RuleContext,
    leaf: &DeviceId,
    src_vlan: VlanId,
    dst_ip: Ipv4Address,
    dst: Delivery,
) -> FlowRule {
    ctx.rule(leaf, FORWARDING_TABLE)
        .with_priority(ctx.priorities.route)
        .with_criterion(Criterion::Ipv4Dst(dst_ip.host_prefix()))
        .with_criterion(Criterion::EthType(EtherType::IPV4))
        .with_criterion(Criterion::VlanVid(src_vlan))
        .with_instruction(Instruction::SetEthDst(dst.mac))
        .with_instruction(Instruction::SetEthSrc(ctx.router_mac))
        .with_instruction(Instruction::SetVlan(dst.vlan))
        .with_instruction(Instruction::VlanPop)
        .with_instruction(Instruction::Output(OutputPort::Port(dst.port)))
}

/// Bridges two hosts of one VLAN on the same leaf.
pub fn local_bridge(ctx: &RuleContext, leaf: &DeviceId, dst: Delivery) -> FlowRule {
    ctx.rule(leaf, FORWARDING_TABLE)
        .with_priority(ctx.priorities.bridge)
        .with_criterion(Criterion::EthDst(dst.mac))
        .with_criterion(Criterion::VlanVid(dst.vlan))
        .with_instruction(Instruction::VlanPop)
        .with_instruction(Instruction::Output(OutputPort::Port(dst.port)))
}

/// Bridges a VLAN across the spine: source leaf uplink, spine transit and
/// delivery on the destination leaf.
pub fn l2_bridge(ctx: &RuleContext, transit: &SpineTransit, dst: Delivery) -> Vec<FlowRule> {
    let source = ctx
        .rule(&transit.src_leaf, FORWARDING_TABLE)
        .with_priority(ctx.priorities.bridge)
        .with_criterion(Criterion::EthDst(dst.mac))
        .with_criterion(Criterion::VlanVid(dst.vlan))
        .with_instruction(Instruction::Output(OutputPort::Port(transit.uplink)));

    vec![
        source,
        spine_transit(ctx, transit, dst),
        leaf_delivery(ctx, &transit.dst_leaf, dst),
    ]
}

/// Routes across the spine. The source leaf does the routing: it matches
/// frames addressed to the router, rewrites both addresses and retags to
/// the destination VLAN. The remaining hops are the bridge hops of the
/// destination VLAN.
pub fn l3_route(
    ctx: &RuleContext,
    transit: &SpineTransit,
    src_vlan: VlanId,
    dst_ip: Ipv4Address,
    dst: Delivery,
) -> Vec<FlowRule> {
    let source = ctx
        .rule(&transit.src_leaf, FORWARDING_TABLE)
        .with_priority(ctx.priorities.route)
        .with_criterion(Criterion::EthDst(ctx.router_mac))
        .with_criterion(Criterion::Ipv4Dst(dst_ip.host_prefix()))
        .with_criterion(Criterion::EthType(EtherType::IPV4))
        .with_criterion(Criterion::VlanVid(src_vlan))
        .with_instruction(Instruction::SetEthSrc(ctx.router_mac))
        .with_instruction(Instruction::SetEthDst(dst.mac))
        .with_instruction(Instruction::SetVlan(dst.vlan))
        .with_instruction(Instruction::Output(OutputPort::Port(transit.uplink)));

    vec![
        source,
        spine_transit(ctx, transit, dst),
        leaf_delivery(ctx, &transit.dst_leaf, dst),
    ]
}

/// Sends ARP frames to the controller.
pub fn arp_punt(ctx: &RuleContext, device: &DeviceId, table: TableId) -> FlowRule {
    ctx.rule(device, table)
        .with_priority(ctx.priorities.punt)
        .with_criterion(Criterion::EthType(EtherType::ARP))
        .with_instruction(Instruction::Output(OutputPort::Controller))
}

fn spine_transit(ctx: &RuleContext, transit: &SpineTransit, dst: Delivery) -> FlowRule {
    let mut rule = ctx
        .rule(&transit.spine, SPINE_TABLE)
        .with_priority(ctx.priorities.bridge)
        .with_criterion(Criterion::EthDst(dst.mac));
    if ctx.vlan_aware_spine {
        rule = rule.with_criterion(Criterion::VlanVid(dst.vlan));
    }
    rule.with_instruction(Instruction::Output(OutputPort::Port(transit.downlink)))
}

fn leaf_delivery(ctx: &RuleContext, leaf: &DeviceId, dst: Delivery) -> FlowRule {
    ctx.rule(leaf, CLASSIFIER_TABLE)
        .with_priority(ctx.priorities.bridge)
        .with_criterion(Criterion::EthDst(dst.mac))
        .with_criterion(Criterion::VlanVid(dst.vlan))
        .with_instruction(Instruction::VlanPop)
        .with_instruction(Instruction::Output(OutputPort::Port(dst.port)))
}
