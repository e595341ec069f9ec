//! Error types for topology loading and rule compilation.
//!
//! [`TopologyError`] covers defects that make the fabric model impossible
//! to build at all. [`CompileError`] covers everything found while
//! compiling: per-entry configuration errors (reported, compilation goes
//! on) and fatal errors such as ambiguous rule sets.

use fabric_types::{Ipv4Address, MacAddress, PortNumber, VlanId};
use thiserror::Error;

use crate::rule::{DeviceId, Priority, RuleError, TableId};
use crate::topology::SwitchRole;

/// Result type alias for topology construction.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Result type alias for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Structural errors in the topology description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("switch '{0}' is declared more than once")]
    DuplicateSwitch(String),

    #[error("device id '{device}' is used by both '{first}' and '{second}'")]
    DuplicateDeviceId {
        device: String,
        first: String,
        second: String,
    },

    #[error("host '{0}' is declared more than once")]
    DuplicateHost(String),

    #[error("VLAN {0} is declared more than once")]
    DuplicateVlan(VlanId),

    #[error("hosts '{first}' and '{second}' share MAC address {mac}")]
    DuplicateHostMac {
        mac: MacAddress,
        first: String,
        second: String,
    },

    #[error("hosts '{first}' and '{second}' share address {address}")]
    DuplicateHostAddress {
        address: Ipv4Address,
        first: String,
        second: String,
    },

    #[error("router MAC {0} is not a unicast station address")]
    InvalidRouterMac(MacAddress),

    #[error("host '{host}' uses the router MAC address {mac}")]
    RouterMacCollision { host: String, mac: MacAddress },

    #[error("port {port} on '{switch}' is claimed by both {existing} and {claimant}")]
    PortConflict {
        switch: String,
        port: PortNumber,
        existing: String,
        claimant: String,
    },

    #[error("{role} switch '{switch}' has {tables} table(s), needs at least {required}")]
    InsufficientTables {
        switch: String,
        role: SwitchRole,
        tables: u8,
        required: u8,
    },
}

/// Errors raised while compiling rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// An entry of the topology is incomplete or inconsistent. Only that
    /// entry is skipped.
    #[error("configuration error in {entity}: {reason}")]
    Config {
        /// The offending entity (e.g. `host ha1`, `pair ha1->hb2`).
        entity: String,
        reason: String,
    },

    /// Two rules in one table overlap at equal priority.
    #[error(
        "ambiguous match on {device} table {table} at priority {priority}: [{first}] vs [{second}]"
    )]
    AmbiguousMatch {
        device: DeviceId,
        table: TableId,
        priority: Priority,
        first: String,
        second: String,
    },

    /// A generator produced a malformed rule.
    #[error("generated rule is invalid ({rule}): {source}")]
    InvalidRule {
        rule: String,
        #[source]
        source: RuleError,
    },

    #[error("invalid priority plan: {0}")]
    InvalidPriorities(String),
}

impl CompileError {
    /// Creates a configuration error.
    pub fn config(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_priorities(message: impl Into<String>) -> Self {
        Self::InvalidPriorities(message.into())
    }

    /// Returns true if this error aborts the whole compilation rather than
    /// a single entry.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Config { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = CompileError::config("host ha1", "no attachment port");
        assert_eq!(
            err.to_string(),
            "configuration error in host ha1: no attachment port"
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_ambiguous_is_fatal() {
        let err = CompileError::AmbiguousMatch {
            device: DeviceId::new("of:0000000000000001"),
            table: 0,
            priority: 40000,
            first: "eth_dst=00:00:00:00:01:02".to_string(),
            second: "eth_type=0x0806".to_string(),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("of:0000000000000001 table 0"));
    }

    #[test]
    fn test_port_conflict_display() {
        let err = TopologyError::PortConflict {
            switch: "sa1".to_string(),
            port: PortNumber::new(2).unwrap(),
            existing: "host ha1".to_string(),
            claimant: "link to s0a".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "port 2 on 'sa1' is claimed by both host ha1 and link to s0a"
        );
    }
}
