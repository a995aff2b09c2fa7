//! Ethernet frame types and helpers.
//!
//! # Reference
//! IEEE 802.3

use core::fmt;

pub const ETH_ALEN: usize = 6;
pub const ETH_HLEN: usize = 14;
pub const ETH_MTU: usize = 1500;

/// Largest frame the stack will build or accept: header, VLAN tag, MTU and CRC.
pub const MAX_FRAME_SIZE: usize = 1522;

/// MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacAddress(pub [u8; ETH_ALEN]);

impl MacAddress {
    /// Broadcast address (ff:ff:ff:ff:ff:ff)
    pub const BROADCAST: Self = Self([0xFF; ETH_ALEN]);
    /// Zero address, used as the unknown target of an ARP request
    pub const ZERO: Self = Self([0; ETH_ALEN]);

    pub const fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        Self([a, b, c, d, e, f])
    }

    pub const fn octets(&self) -> [u8; ETH_ALEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Read an address from the first six bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; ETH_ALEN] = bytes.get(..ETH_ALEN)?.try_into().ok()?;
        Some(Self(raw))
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// Frame types carried in the link-layer header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum EtherType {
    Ipv4 = 0x0800,
    Arp = 0x0806,
}

impl EtherType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0800 => Some(Self::Ipv4),
            0x0806 => Some(Self::Arp),
            _ => None,
        }
    }
}
