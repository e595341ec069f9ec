//! 802.1Q VLAN ids.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// VLAN id carried in the tag's 12-bit VID field.
///
/// 0 marks a priority-only tag and 4095 is reserved, so neither can name
/// a fabric VLAN.
///
/// ```
/// use fabric_types::VlanId;
///
/// let vlan: VlanId = "20".parse().unwrap();
/// assert_eq!(vlan.as_u16(), 20);
/// assert!(VlanId::new(4095).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 4094;

    pub const fn new(id: u16) -> Result<Self, ParseError> {
        match id {
            Self::MIN..=Self::MAX => Ok(Self(id)),
            _ => Err(ParseError::InvalidVlanId(id)),
        }
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for VlanId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u16>()
            .map_err(|_| ParseError::InvalidVlanId(0))
            .and_then(Self::new)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = ParseError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(vlan: VlanId) -> u16 {
        vlan.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_range() {
        assert!(VlanId::new(VlanId::MIN).is_ok());
        assert!(VlanId::new(VlanId::MAX).is_ok());
        assert_eq!(VlanId::new(0), Err(ParseError::InvalidVlanId(0)));
        assert_eq!(VlanId::new(4095), Err(ParseError::InvalidVlanId(4095)));
    }

    #[test]
    fn test_parse() {
        assert_eq!("10".parse::<VlanId>().map(|v| v.as_u16()), Ok(10));
        assert_eq!(" 20 ".parse::<VlanId>().map(|v| v.as_u16()), Ok(20));
        assert!("ten".parse::<VlanId>().is_err());
        assert!("70000".parse::<VlanId>().is_err());
    }

    #[test]
    fn test_serde_as_number() {
        let vlan: VlanId = serde_json::from_str("10").unwrap();
        assert_eq!(serde_json::to_string(&vlan).unwrap(), "10");
        assert!(serde_json::from_str::<VlanId>("4095").is_err());
    }
}
