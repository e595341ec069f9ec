//! Compiler: walks the topology and collects the rules for every scenario.
//!
//! Order of generation is fixed so that compiling the same topology twice
//! yields the same list:
//! 1. ARP punt per switch (name order)
//! 2. Ingress classifier per host port (host name order)
//! 3. Every ordered host pair (source name, then destination name)

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{CompileError, CompileResult};
use crate::generator::{RuleContext, DEFAULT_RULE_TIMEOUT_SECS};
use crate::path::{pair_entity, Endpoint, Path, PathClass};
use crate::priority::Priorities;
use crate::rule::FlowRule;
use crate::ruleset::RuleSet;
use crate::scenario::Scenario;
use crate::topology::Topology;

/// Knobs that change the generated rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    pub priorities: Priorities,
    /// Include the VLAN tag in spine matches.
    pub vlan_aware_spine: bool,
    pub permanent: bool,
    /// Expiry of rules when `permanent` is off.
    pub timeout_secs: u16,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            priorities: Priorities::default(),
            vlan_aware_spine: true,
            permanent: true,
            timeout_secs: DEFAULT_RULE_TIMEOUT_SECS,
        }
    }
}

/// What was generated for one ordered host pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairSummary {
    pub src: String,
    pub dst: String,
    pub class: PathClass,
    pub scenario: &'static str,
    /// Switches crossed, in order.
    pub switches: Vec<String>,
    /// Rules the pair's generator produced, shared ones included.
    pub rules: usize,
}

/// Output of a compilation pass.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub rules: Vec<FlowRule>,
    /// Per-entry configuration errors. The affected entries produced no rules.
    pub errors: Vec<CompileError>,
    pub paths: Vec<PairSummary>,
}

impl Compilation {
    /// True when every entry of the topology compiled.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Compiler<'a> {
    topology: &'a Topology,
    ctx: RuleContext,
}

impl<'a> Compiler<'a> {
    pub fn new(topology: &'a Topology, options: CompilerOptions) -> Self {
        Self {
            topology,
            ctx: RuleContext {
                router_mac: topology.router_mac(),
                priorities: options.priorities,
                vlan_aware_spine: options.vlan_aware_spine,
                permanent: options.permanent,
                timeout_secs: options.timeout_secs,
            },
        }
    }

    /// Compiles the whole fabric.
    ///
    /// Returns `Err` only for fatal problems: an invalid priority plan, a
    /// malformed generated rule or an ambiguous rule set. Configuration
    /// errors of single entries are collected in [`Compilation::errors`].
    #[instrument(skip(self), fields(router_mac = %self.ctx.router_mac))]
    pub fn compile(&self) -> CompileResult<Compilation> {
        self.ctx.priorities.validate()?;

        let mut rules = RuleSet::new();
        let mut errors = Vec::new();
        let mut paths = Vec::new();

        for defect in self.topology.defects() {
            warn!("Skipping {}: {}", defect.entity, defect.reason);
            errors.push(CompileError::config(&defect.entity, &defect.reason));
        }

        for switch in self.topology.switches() {
            let punt = Scenario::ArpPunt {
                device: switch.device_id.clone(),
                table: switch.role.control_table(),
            };
            self.emit(&mut rules, &punt)?;
        }

        let mut endpoints = Vec::new();
        for host in self.topology.hosts() {
            match Endpoint::resolve(self.topology, host) {
                Ok(endpoint) => endpoints.push(endpoint),
                Err(e) => {
                    warn!("{}", e);
                    errors.push(e);
                }
            }
        }

        for endpoint in &endpoints {
            let classifier = Scenario::IngressClassifier {
                leaf: endpoint.leaf.device_id.clone(),
                port: endpoint.port,
                vlan: endpoint.vlan_id(),
            };
            self.emit(&mut rules, &classifier)?;
        }

        for src in &endpoints {
            for dst in endpoints.iter().filter(|d| d.host.name != src.host.name) {
                let path = match Path::between(self.topology, src, dst) {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("{}", e);
                        errors.push(e);
                        continue;
                    }
                };
                let Some(scenario) = Scenario::for_pair(&path, src, dst) else {
                    let e = CompileError::config(
                        pair_entity(src, dst),
                        format!("unsupported {} path over {} hop(s)", path.class, path.hops.len()),
                    );
                    warn!("{}", e);
                    errors.push(e);
                    continue;
                };

                let generated = self.emit(&mut rules, &scenario)?;
                debug!(
                    src = %path.src,
                    dst = %path.dst,
                    scenario = scenario.name(),
                    rules = generated,
                    "Compiled pair"
                );
                paths.push(PairSummary {
                    src: path.src.clone(),
                    dst: path.dst.clone(),
                    class: path.class,
                    scenario: scenario.name(),
                    switches: path.switches(),
                    rules: generated,
                });
            }
        }

        rules.check_ambiguity()?;

        info!(
            rules = rules.len(),
            pairs = paths.len(),
            errors = errors.len(),
            "Compiled fabric"
        );

        Ok(Compilation {
            rules: rules.into_rules(),
            errors,
            paths,
        })
    }

    /// Generates the scenario's rules, validates them and adds them to the
    /// set. Returns how many rules the generator produced.
    fn emit(&self, rules: &mut RuleSet, scenario: &Scenario) -> CompileResult<usize> {
        let generated = scenario.generate(&self.ctx);
        let count = generated.len();
        for rule in generated {
            rule.validate().map_err(|source| CompileError::InvalidRule {
                rule: rule.to_string(),
                source,
            })?;
            if !rules.insert(rule) {
                debug!(scenario = scenario.name(), "Rule already generated");
            }
        }
        Ok(count)
    }
}

/// Compiles a topology with the given options.
pub fn compile(topology: &Topology, options: CompilerOptions) -> CompileResult<Compilation> {
    Compiler::new(topology, options).compile()
}
