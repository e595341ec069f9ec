//! Ordered, duplicate-free rule collection.

use std::collections::{BTreeMap, HashSet};

use crate::error::{CompileError, CompileResult};
use crate::rule::{DeviceId, FlowRule, Priority, TableId};

/// Rules in first-insertion order. Inserting a rule equal to one already
/// present is a no-op.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<FlowRule>,
    seen: HashSet<FlowRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule. Returns false if an identical rule was already there.
    pub fn insert(&mut self, rule: FlowRule) -> bool {
        if self.seen.contains(&rule) {
            return false;
        }
        self.seen.insert(rule.clone());
        self.rules.push(rule);
        true
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlowRule> {
        self.rules.iter()
    }

    /// Rules installed on one device, in insertion order.
    pub fn for_device<'a>(&'a self, device: &'a DeviceId) -> impl Iterator<Item = &'a FlowRule> {
        self.rules.iter().filter(move |r| &r.device_id == device)
    }

    /// Fails on the first pair of distinct rules sharing device, table and
    /// priority whose matches overlap.
    pub fn check_ambiguity(&self) -> CompileResult<()> {
        let mut groups: BTreeMap<(&DeviceId, TableId, Priority), Vec<&FlowRule>> =
            BTreeMap::new();
        for rule in &self.rules {
            groups
                .entry((&rule.device_id, rule.table, rule.priority))
                .or_default()
                .push(rule);
        }

        for ((device, table, priority), rules) in groups {
            for (i, first) in rules.iter().enumerate() {
                if let Some(second) = rules[i + 1..].iter().find(|other| first.overlaps(other)) {
                    return Err(CompileError::AmbiguousMatch {
                        device: device.clone(),
                        table,
                        priority,
                        first: first.match_summary(),
                        second: second.match_summary(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn into_rules(self) -> Vec<FlowRule> {
        self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Criterion, Instruction, OutputPort};
    use fabric_types::{MacAddress, PortNumber, VlanId};
    use pretty_assertions::assert_eq;

    fn delivery(mac: &str, vlan: u16, out: u32, priority: Priority) -> FlowRule {
        let mac: MacAddress = mac.parse().unwrap();
        FlowRule::new(DeviceId::new("of:0000000000000004"), 0)
            .with_priority(priority)
            .with_criterion(Criterion::EthDst(mac))
            .with_criterion(Criterion::VlanVid(VlanId::new(vlan).unwrap()))
            .with_instruction(Instruction::VlanPop)
            .with_instruction(Instruction::Output(OutputPort::Port(
                PortNumber::new(out).unwrap(),
            )))
    }

    #[test]
    fn test_insert_deduplicates() {
        let mut set = RuleSet::new();
        assert!(set.insert(delivery("00:00:00:00:02:02", 20, 3, 40000)));
        assert!(set.insert(delivery("00:00:00:00:01:02", 10, 2, 40000)));
        assert!(!set.insert(delivery("00:00:00:00:02:02", 20, 3, 40000)));

        assert_eq!(set.len(), 2);
        let order: Vec<String> = set.iter().map(|r| r.match_summary()).collect();
        assert_eq!(
            order,
            vec![
                "eth_dst=00:00:00:00:02:02,vlan=20",
                "eth_dst=00:00:00:00:01:02,vlan=10"
            ]
        );
        assert!(set.check_ambiguity().is_ok());
    }

    #[test]
    fn test_conflicting_actions_are_ambiguous() {
        let mut set = RuleSet::new();
        set.insert(delivery("00:00:00:00:02:02", 20, 3, 40000));
        set.insert(delivery("00:00:00:00:02:02", 20, 4, 40000));

        let err = set.check_ambiguity().unwrap_err();
        assert!(matches!(
            err,
            CompileError::AmbiguousMatch {
                table: 0,
                priority: 40000,
                ..
            }
        ));
    }

    #[test]
    fn test_priority_separates_overlaps() {
        let mut set = RuleSet::new();
        set.insert(delivery("00:00:00:00:02:02", 20, 3, 40000));
        set.insert(delivery("00:00:00:00:02:02", 20, 4, 40100));
        assert!(set.check_ambiguity().is_ok());
    }
}
