//! Switch port numbers and Ethernet frame types.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A physical switch port number. Port 0 is not a valid data port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PortNumber(u32);

impl PortNumber {
    pub fn new(port: u32) -> Result<Self, ParseError> {
        Self::try_from(port)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PortNumber {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<u32>() {
            Ok(port) if port != 0 => Ok(PortNumber(port)),
            _ => Err(ParseError::InvalidPort(s.to_string())),
        }
    }
}

impl TryFrom<u32> for PortNumber {
    type Error = ParseError;

    fn try_from(port: u32) -> Result<Self, Self::Error> {
        if port == 0 {
            Err(ParseError::InvalidPort(port.to_string()))
        } else {
            Ok(PortNumber(port))
        }
    }
}

impl From<PortNumber> for u32 {
    fn from(port: PortNumber) -> u32 {
        port.0
    }
}

/// Ethernet frame type (the EtherType field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EtherType(u16);

impl EtherType {
    pub const IPV4: EtherType = EtherType(0x0800);

    pub const ARP: EtherType = EtherType(0x0806);

    pub const VLAN: EtherType = EtherType(0x8100);

    pub const fn new(value: u16) -> Self {
        EtherType(value)
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

impl FromStr for EtherType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ParseError::InvalidEtherType(s.to_string()))?;
        u16::from_str_radix(digits, 16)
            .map(EtherType)
            .map_err(|_| ParseError::InvalidEtherType(s.to_string()))
    }
}
