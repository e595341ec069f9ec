//! Pipeline simulator and verification helpers
//!
//! [`PipelineSimulator`] installs a compiled rule list into per-device
//! tables and walks a frame through them the way a switch would: highest
//! priority match wins, `goto_table` continues in the same device, output
//! to a switch port continues on the linked switch at table 0.

use fabric_compiler::{
    Criterion, DeviceId, FlowRule, Instruction, OutputPort, PortPeer, Priority, TableId, Topology,
};
use fabric_types::{EtherType, Ipv4Address, MacAddress, PortNumber, VlanId};
use std::collections::HashMap;
use thiserror::Error;

/// Upper bound on switch visits for one frame; a visit may chain tables.
const MAX_HOPS: usize = 16;

/// Verification error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("unknown host '{0}'")]
    UnknownHost(String),

    #[error("host '{0}' has no attachment port")]
    Unattached(String),

    #[error("frame dropped on {switch} table {table}: no rule matches {frame}")]
    NoMatch {
        switch: String,
        table: TableId,
        frame: String,
    },

    #[error("{switch} table {table}: {count} rules match at priority {priority}")]
    Ambiguous {
        switch: String,
        table: TableId,
        priority: Priority,
        count: usize,
    },

    #[error("{switch} port {port} leads nowhere")]
    DeadPort { switch: String, port: PortNumber },

    #[error("frame pushed a second tag on {switch}")]
    DoubleTag { switch: String },

    #[error("frame popped a tag it does not carry on {switch}")]
    PopUntagged { switch: String },

    #[error("frame exceeded the lookup limit")]
    Loop,

    #[error("expected delivery to {expected}, got {actual}")]
    WrongEndpoint { expected: String, actual: String },

    #[error("delivery check failed for {pair}: {reason}")]
    DeliveryCheck { pair: String, reason: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Frame state while it moves through the fabric. A single 802.1Q tag is
/// modelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub eth_src: MacAddress,
    pub eth_dst: MacAddress,
    pub eth_type: EtherType,
    pub tagged: bool,
    pub vlan: Option<VlanId>,
    pub ipv4_dst: Option<Ipv4Address>,
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "eth_dst={} eth_type={}",
            self.eth_dst, self.eth_type
        )?;
        match (self.tagged, self.vlan) {
            (true, Some(vlan)) => write!(f, " vlan={}", vlan)?,
            (true, None) => write!(f, " vlan=?")?,
            (false, _) => write!(f, " untagged")?,
        }
        if let Some(ip) = self.ipv4_dst {
            write!(f, " ipv4_dst={}", ip)?;
        }
        Ok(())
    }
}

/// One table lookup during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    pub switch: String,
    pub table: TableId,
    pub priority: Priority,
    pub in_port: PortNumber,
    pub pushed: bool,
    pub popped: bool,
}

/// Where a frame ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Host { name: String, frame: Frame },
    Controller { switch: String },
}

/// Result of walking one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub steps: Vec<TraceStep>,
    pub destination: Destination,
}

impl Trace {
    pub fn pushes(&self) -> usize {
        self.steps.iter().filter(|s| s.pushed).count()
    }

    pub fn pops(&self) -> usize {
        self.steps.iter().filter(|s| s.popped).count()
    }

    /// Switches visited, without consecutive repeats from table chaining.
    pub fn switches(&self) -> Vec<String> {
        let mut names: Vec<String> = self.steps.iter().map(|s| s.switch.clone()).collect();
        names.dedup();
        names
    }

    /// Ingress port on each visited switch, in order.
    pub fn ingress_ports(&self) -> Vec<(String, PortNumber)> {
        let mut ports: Vec<(String, PortNumber)> = self
            .steps
            .iter()
            .map(|s| (s.switch.clone(), s.in_port))
            .collect();
        ports.dedup();
        ports
    }
}

/// Walks frames through a compiled rule set.
pub struct PipelineSimulator<'a> {
    topology: &'a Topology,
    tables: HashMap<(DeviceId, TableId), Vec<&'a FlowRule>>,
    switch_by_device: HashMap<DeviceId, String>,
}

impl<'a> PipelineSimulator<'a> {
    pub fn new(topology: &'a Topology, rules: &'a [FlowRule]) -> Self {
        let mut tables: HashMap<(DeviceId, TableId), Vec<&'a FlowRule>> = HashMap::new();
        for rule in rules {
            tables
                .entry((rule.device_id.clone(), rule.table))
                .or_default()
                .push(rule);
        }
        for entries in tables.values_mut() {
            entries.sort_by(|a, b| b.priority.cmp(&a.priority));
        }

        let switch_by_device = topology
            .switches()
            .map(|s| (s.device_id.clone(), s.name.clone()))
            .collect();

        Self {
            topology,
            tables,
            switch_by_device,
        }
    }

    /// Sends an IPv4 frame from `src` to `dst` the way the host would:
    /// to the peer directly inside its subnet, to the router otherwise.
    pub fn send_ipv4(&self, src: &str, dst: &str) -> VerifyResult<Trace> {
        let src_host = self.host(src)?;
        let dst_host = self.host(dst)?;

        let same_subnet = src_host.vlan == dst_host.vlan;
        let frame = Frame {
            eth_src: src_host.mac,
            eth_dst: if same_subnet {
                dst_host.mac
            } else {
                self.topology.router_mac()
            },
            eth_type: EtherType::IPV4,
            tagged: false,
            vlan: None,
            ipv4_dst: Some(dst_host.ip),
        };
        self.walk(src, frame)
    }

    /// Sends a broadcast ARP request from `src`.
    pub fn send_arp(&self, src: &str) -> VerifyResult<Trace> {
        let src_host = self.host(src)?;
        let frame = Frame {
            eth_src: src_host.mac,
            eth_dst: MacAddress::BROADCAST,
            eth_type: EtherType::ARP,
            tagged: false,
            vlan: None,
            ipv4_dst: None,
        };
        self.walk(src, frame)
    }

    /// Checks that an IPv4 frame from `src` reaches `dst` untagged,
    /// addressed to it, with exactly one push and one pop on the way and
    /// no single lookup doing both.
    pub fn verify_delivery(&self, src: &str, dst: &str) -> VerifyResult<Trace> {
        let trace = self.send_ipv4(src, dst)?;
        let pair = format!("{}->{}", src, dst);
        let check = |ok: bool, reason: String| {
            if ok {
                Ok(())
            } else {
                Err(VerificationError::DeliveryCheck {
                    pair: pair.clone(),
                    reason,
                })
            }
        };

        let Destination::Host { name, frame } = &trace.destination else {
            return Err(VerificationError::WrongEndpoint {
                expected: dst.to_string(),
                actual: "controller".to_string(),
            });
        };
        if name != dst {
            return Err(VerificationError::WrongEndpoint {
                expected: dst.to_string(),
                actual: name.clone(),
            });
        }

        let dst_host = self.host(dst)?;
        check(!frame.tagged, "frame delivered tagged".to_string())?;
        check(
            frame.eth_dst == dst_host.mac,
            format!("frame delivered to MAC {}", frame.eth_dst),
        )?;
        check(
            trace.pushes() == 1,
            format!("{} tag push(es)", trace.pushes()),
        )?;
        check(trace.pops() == 1, format!("{} tag pop(s)", trace.pops()))?;
        check(
            trace.steps.iter().all(|s| !(s.pushed && s.popped)),
            "a single lookup pushed and popped".to_string(),
        )?;

        Ok(trace)
    }

    fn host(&self, name: &str) -> VerifyResult<&'a fabric_compiler::Host> {
        self.topology
            .host(name)
            .ok_or_else(|| VerificationError::UnknownHost(name.to_string()))
    }

    fn walk(&self, src: &str, mut frame: Frame) -> VerifyResult<Trace> {
        let src_host = self.host(src)?;
        let mut switch = self
            .topology
            .switch(&src_host.switch)
            .ok_or_else(|| VerificationError::UnknownHost(src.to_string()))?;
        let mut in_port = src_host
            .port
            .ok_or_else(|| VerificationError::Unattached(src.to_string()))?;
        let mut table: TableId = 0;
        let mut steps = Vec::new();

        for _ in 0..MAX_HOPS * 4 {
            let rule = self.lookup(&switch.device_id, table, in_port, &frame)?;
            let mut step = TraceStep {
                switch: switch.name.clone(),
                table,
                priority: rule.priority,
                in_port,
                pushed: false,
                popped: false,
            };

            for instruction in &rule.instructions {
                match instruction {
                    Instruction::VlanPush => {
                        if frame.tagged {
                            return Err(VerificationError::DoubleTag {
                                switch: switch.name.clone(),
                            });
                        }
                        frame.tagged = true;
                        frame.vlan = None;
                        step.pushed = true;
                    }
                    Instruction::SetVlan(vlan) => frame.vlan = Some(*vlan),
                    Instruction::VlanPop => {
                        if !frame.tagged {
                            return Err(VerificationError::PopUntagged {
                                switch: switch.name.clone(),
                            });
                        }
                        frame.tagged = false;
                        frame.vlan = None;
                        step.popped = true;
                    }
                    Instruction::SetEthSrc(mac) => frame.eth_src = *mac,
                    Instruction::SetEthDst(mac) => frame.eth_dst = *mac,
                    Instruction::GotoTable(next) => table = *next,
                    Instruction::Output(OutputPort::Controller) => {
                        steps.push(step);
                        return Ok(Trace {
                            steps,
                            destination: Destination::Controller {
                                switch: switch.name.clone(),
                            },
                        });
                    }
                    Instruction::Output(OutputPort::Port(out)) => {
                        match switch.ports.get(out) {
                            Some(PortPeer::Host(name)) => {
                                steps.push(step);
                                return Ok(Trace {
                                    steps,
                                    destination: Destination::Host {
                                        name: name.clone(),
                                        frame,
                                    },
                                });
                            }
                            Some(PortPeer::Switch { name, port }) => {
                                switch = self.topology.switch(name).ok_or_else(|| {
                                    VerificationError::DeadPort {
                                        switch: switch.name.clone(),
                                        port: *out,
                                    }
                                })?;
                                in_port = *port;
                                table = 0;
                            }
                            None => {
                                return Err(VerificationError::DeadPort {
                                    switch: switch.name.clone(),
                                    port: *out,
                                })
                            }
                        }
                    }
                }
            }
            steps.push(step);
        }

        Err(VerificationError::Loop)
    }

    fn lookup(
        &self,
        device: &DeviceId,
        table: TableId,
        in_port: PortNumber,
        frame: &Frame,
    ) -> VerifyResult<&'a FlowRule> {
        let switch = self
            .switch_by_device
            .get(device)
            .cloned()
            .unwrap_or_else(|| device.to_string());
        let entries = self.tables.get(&(device.clone(), table));
        let mut matching = entries
            .into_iter()
            .flatten()
            .filter(|rule| rule.criteria.iter().all(|c| matches(c, in_port, frame)));

        let Some(best) = matching.next() else {
            return Err(VerificationError::NoMatch {
                switch,
                table,
                frame: frame.to_string(),
            });
        };
        let ties = 1 + matching.filter(|r| r.priority == best.priority).count();
        if ties > 1 {
            return Err(VerificationError::Ambiguous {
                switch,
                table,
                priority: best.priority,
                count: ties,
            });
        }
        Ok(*best)
    }
}

fn matches(criterion: &Criterion, in_port: PortNumber, frame: &Frame) -> bool {
    match criterion {
        Criterion::InPort(port) => *port == in_port,
        Criterion::EthDst(mac) => *mac == frame.eth_dst,
        Criterion::EthType(ty) => *ty == frame.eth_type,
        Criterion::VlanVid(vlan) => frame.tagged && frame.vlan == Some(*vlan),
        Criterion::Ipv4Dst(prefix) => frame.ipv4_dst.is_some_and(|ip| prefix.contains(&ip)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{port, reference_topology};
    use fabric_compiler::{compile, CompilerOptions};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_walk_routed_frame() {
        let topo = reference_topology();
        let compilation = compile(&topo, CompilerOptions::default()).unwrap();
        let sim = PipelineSimulator::new(&topo, &compilation.rules);

        let trace = sim.verify_delivery("ha1", "hb2").unwrap();
        assert_eq!(trace.switches(), vec!["sa1", "s0a", "sb1"]);
        assert_eq!(
            trace.ingress_ports(),
            vec![
                ("sa1".to_string(), port(2)),
                ("s0a".to_string(), port(2)),
                ("sb1".to_string(), port(1))
            ]
        );
    }

    #[test]
    fn test_empty_rule_set_drops() {
        let topo = reference_topology();
        let sim = PipelineSimulator::new(&topo, &[]);
        assert!(matches!(
            sim.send_ipv4("ha1", "hb1"),
            Err(VerificationError::NoMatch { table: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_host() {
        let topo = reference_topology();
        let sim = PipelineSimulator::new(&topo, &[]);
        assert_eq!(
            sim.send_arp("hz9").unwrap_err(),
            VerificationError::UnknownHost("hz9".to_string())
        );
    }
}
