//! Address and header-field values that flow rules match on and rewrite.
//!
//! Every type parses from the spelling used in topology files and
//! serializes to the spelling the controller expects.

mod ip;
mod mac;
mod port;
mod vlan;

pub use ip::{Ipv4Address, Ipv4Prefix};
pub use mac::MacAddress;
pub use port::{EtherType, PortNumber};
pub use vlan::VlanId;

/// A header-field value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("not a MAC address: {0:?}")]
    InvalidMacAddress(String),

    #[error("not an IPv4 address: {0:?}")]
    InvalidIpAddress(String),

    #[error("not an IPv4 prefix: {0:?}")]
    InvalidIpPrefix(String),

    #[error("VLAN {0} is outside 1..=4094")]
    InvalidVlanId(u16),

    #[error("not a switch port: {0:?}")]
    InvalidPort(String),

    #[error("not an ether type: {0:?}")]
    InvalidEtherType(String),
}
