//! Rules for single host pairs, checked entry by entry.

use fabric_compiler::{
    compile, CompilerOptions, Criterion, DeviceId, FlowRule, Instruction, OutputPort, PathClass,
};
use fabric_test::{port, reference_topology, vlan, PipelineSimulator, ROUTER_MAC, S0A, SA1, SB1};
use fabric_types::{EtherType, MacAddress};
use pretty_assertions::assert_eq;

const HB2_MAC: &str = "00:00:00:00:02:02";

fn mac(s: &str) -> MacAddress {
    s.parse().unwrap()
}

fn find<'a>(rules: &'a [FlowRule], device: &str, table: u8, criteria: &[Criterion]) -> &'a FlowRule {
    let matching: Vec<&FlowRule> = rules
        .iter()
        .filter(|r| r.device_id == DeviceId::new(device) && r.table == table)
        .filter(|r| r.criteria == criteria)
        .collect();
    assert_eq!(matching.len(), 1, "{device} table {table}: {criteria:?}");
    matching[0]
}

#[test]
fn test_routed_pair_ha1_to_hb2() {
    let topo = reference_topology();
    let compilation = compile(&topo, CompilerOptions::default()).unwrap();

    let summary = compilation
        .paths
        .iter()
        .find(|p| p.src == "ha1" && p.dst == "hb2")
        .unwrap();
    assert_eq!(summary.class, PathClass::Routed);
    assert_eq!(summary.scenario, "l3-route");
    assert_eq!(summary.rules, 3);

    // Source leaf routes: router MAC in, host addresses out, retag to VLAN 20
    let source = find(
        &compilation.rules,
        SA1,
        1,
        &[
            Criterion::EthDst(mac(ROUTER_MAC)),
            Criterion::Ipv4Dst("10.0.20.12/32".parse().unwrap()),
            Criterion::EthType(EtherType::IPV4),
            Criterion::VlanVid(vlan(10)),
        ],
    );
    assert_eq!(source.priority, 41000);
    assert_eq!(
        source.instructions,
        vec![
            Instruction::SetEthSrc(mac(ROUTER_MAC)),
            Instruction::SetEthDst(mac(HB2_MAC)),
            Instruction::SetVlan(vlan(20)),
            Instruction::Output(OutputPort::Port(port(1))),
        ]
    );

    let transit = find(
        &compilation.rules,
        S0A,
        0,
        &[Criterion::EthDst(mac(HB2_MAC)), Criterion::VlanVid(vlan(20))],
    );
    assert_eq!(transit.priority, 40000);
    assert_eq!(
        transit.instructions,
        vec![Instruction::Output(OutputPort::Port(port(3)))]
    );

    let delivery = find(
        &compilation.rules,
        SB1,
        0,
        &[Criterion::EthDst(mac(HB2_MAC)), Criterion::VlanVid(vlan(20))],
    );
    assert_eq!(
        delivery.instructions,
        vec![
            Instruction::VlanPop,
            Instruction::Output(OutputPort::Port(port(3))),
        ]
    );

    let sim = PipelineSimulator::new(&topo, &compilation.rules);
    let trace = sim.verify_delivery("ha1", "hb2").unwrap();
    let priorities: Vec<u16> = trace.steps.iter().map(|s| s.priority).collect();
    assert_eq!(priorities, vec![40100, 41000, 40000, 40000]);
}

#[test]
fn test_local_route_ha1_to_ha2() {
    let topo = reference_topology();
    let compilation = compile(&topo, CompilerOptions::default()).unwrap();

    let rule = find(
        &compilation.rules,
        SA1,
        1,
        &[
            Criterion::Ipv4Dst("10.0.20.11/32".parse().unwrap()),
            Criterion::EthType(EtherType::IPV4),
            Criterion::VlanVid(vlan(10)),
        ],
    );
    assert_eq!(
        rule.to_string(),
        "of:0000000000000003 table=1 priority=41000 \
         match[ipv4_dst=10.0.20.11/32,eth_type=0x0800,vlan=10] \
         actions[set_eth_dst:00:00:00:00:02:01,set_eth_src:00:00:00:00:00:99,\
         set_vlan:20,pop_vlan,output:3]"
    );

    let sim = PipelineSimulator::new(&topo, &compilation.rules);
    let trace = sim.verify_delivery("ha1", "ha2").unwrap();
    assert_eq!(trace.switches(), vec!["sa1"]);
}

#[test]
fn test_bridged_pair_hb1_to_hc1() {
    let topo = reference_topology();
    let compilation = compile(&topo, CompilerOptions::default()).unwrap();

    let hc1 = mac("00:00:00:00:01:03");
    let source = find(
        &compilation.rules,
        SB1,
        1,
        &[Criterion::EthDst(hc1), Criterion::VlanVid(vlan(10))],
    );
    assert_eq!(source.priority, 40000);
    assert_eq!(
        source.instructions,
        vec![Instruction::Output(OutputPort::Port(port(1)))]
    );

    let transit = find(
        &compilation.rules,
        S0A,
        0,
        &[Criterion::EthDst(hc1), Criterion::VlanVid(vlan(10))],
    );
    assert_eq!(
        transit.instructions,
        vec![Instruction::Output(OutputPort::Port(port(4)))]
    );

    let sim = PipelineSimulator::new(&topo, &compilation.rules);
    let trace = sim.verify_delivery("hb1", "hc1").unwrap();
    assert_eq!(trace.switches(), vec!["sb1", "s0a", "sc1"]);
}
