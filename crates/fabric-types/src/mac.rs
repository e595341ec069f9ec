//! Ethernet station addresses.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 48-bit Ethernet MAC address, written `00:00:00:00:01:01`.
///
/// Dash-separated input is accepted; output always uses colons and
/// lowercase hex, which is what the controller echoes back.
///
/// ```
/// use fabric_types::MacAddress;
///
/// let mac: MacAddress = "00:00:00:00:01:01".parse().unwrap();
/// let dashed: MacAddress = "00-00-00-00-01-01".parse().unwrap();
/// assert_eq!(mac, dashed);
/// assert_eq!(dashed.to_string(), "00:00:00:00:01:01");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const BROADCAST: MacAddress = MacAddress([0xff; 6]);
    pub const ZERO: MacAddress = MacAddress([0; 6]);

    pub const fn new(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }

    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// True for an address one host or router can own: the I/G bit is
    /// clear and at least one octet is set.
    pub fn is_station(&self) -> bool {
        self.0[0] & 0x01 == 0 && !self.is_zero()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidMacAddress(s.to_string());
        let sep = if s.contains('-') { '-' } else { ':' };

        let mut octets = [0u8; 6];
        let mut fields = s.split(sep);
        for octet in octets.iter_mut() {
            let field = fields.next().ok_or_else(invalid)?;
            let hex = field.bytes().all(|b| b.is_ascii_hexdigit());
            if !hex || !(1..=2).contains(&field.len()) {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(field, 16).map_err(|_| invalid())?;
        }
        if fields.next().is_some() {
            return Err(invalid());
        }
        Ok(MacAddress(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> String {
        mac.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mac(s: &str) -> MacAddress {
        s.parse().unwrap()
    }

    #[test]
    fn test_host_addresses() {
        assert_eq!(mac("00:00:00:00:02:01").as_bytes(), &[0, 0, 0, 0, 2, 1]);
        assert_eq!(mac("00-00-00-00-02-01"), mac("00:00:00:00:02:01"));
        assert_eq!(mac("0:0:0:0:2:1"), mac("00:00:00:00:02:01"));
    }

    #[test]
    fn test_router_mac_prints_lowercase() {
        assert_eq!(mac("00:00:00:AA:BB:CC").to_string(), "00:00:00:aa:bb:cc");
    }

    #[test]
    fn test_only_stations_can_be_owned() {
        assert!(mac("00:00:00:00:01:01").is_station());
        assert!(!MacAddress::BROADCAST.is_station());
        assert!(!MacAddress::ZERO.is_station());
        assert!(!mac("33:33:00:00:00:01").is_station());
    }

    #[test]
    fn test_malformed_addresses() {
        for bad in [
            "",
            "router",
            "00:00:00:00:01",
            "00:00:00:00:01:01:01",
            "00:00:00:00:01:zz",
            "00:00:00:00:01:101",
            "00:00:00:00::01",
            "00:00-00:00:01:01",
            "+0:00:00:00:00:99",
            "00:00:00:00:00:+9",
        ] {
            assert_eq!(
                bad.parse::<MacAddress>(),
                Err(ParseError::InvalidMacAddress(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&mac("00:00:00:00:03:02")).unwrap();
        assert_eq!(json, "\"00:00:00:00:03:02\"");
        assert_eq!(serde_json::from_str::<MacAddress>(&json).unwrap(), mac("00:00:00:00:03:02"));
        assert!(serde_json::from_str::<MacAddress>("\"ff:ff\"").is_err());
    }
}
