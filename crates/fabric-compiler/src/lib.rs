//! Leaf/spine fabric rule compiler.
//!
//! Turns a static fabric description into the match-action rules that
//! make every host reachable from every other host:
//!
//! - [`topology`]: the immutable switch/host/VLAN model
//! - [`rule`]: the match-action entry and its validation
//! - [`generator`]: one pure function per forwarding scenario
//! - [`compiler`]: pair enumeration, deduplication and ambiguity checks
//!
//! ```ignore
//! let topology = Topology::new(toml::from_str(&text)?)?;
//! let compilation = compile(&topology, CompilerOptions::default())?;
//! for rule in &compilation.rules {
//!     println!("{}", rule);
//! }
//! ```

pub mod compiler;
pub mod error;
pub mod generator;
pub mod path;
pub mod priority;
pub mod rule;
pub mod ruleset;
pub mod scenario;
pub mod topology;

pub use compiler::{compile, Compilation, Compiler, CompilerOptions, PairSummary};
pub use error::{CompileError, CompileResult, TopologyError, TopologyResult};
pub use generator::{Delivery, RuleContext, SpineTransit, DEFAULT_RULE_TIMEOUT_SECS};
pub use path::{Endpoint, Hop, Path, PathClass};
pub use priority::Priorities;
pub use rule::{
    Criterion, CriterionKind, DeviceId, FlowRule, Instruction, OutputPort, Priority, RuleError,
    TableId,
};
pub use ruleset::RuleSet;
pub use scenario::Scenario;
pub use topology::{Host, PortPeer, Switch, SwitchRole, Topology, TopologyConfig, Vlan};
