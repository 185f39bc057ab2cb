// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ethertype for ethernet headers.

use std::fmt::Display;

/// An [ethertype] in network byte order.
///
/// [ethertype]: https://en.wikipedia.org/wiki/EtherType
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EthType(pub u16);

impl EthType {
    /// Ethertype for IPv4 (0x0800)
    pub const IPV4: EthType = EthType(0x0800);
    /// Ethertype for ARP (0x0806)
    pub const ARP: EthType = EthType(0x0806);
    /// Ethertype for IPv6 (0x86DD)
    pub const IPV6: EthType = EthType(0x86DD);
    /// Ethertype for VLAN-tagged frames (0x8100)
    pub const VLAN: EthType = EthType(0x8100);

    /// Build an [`EthType`] from the two octets following the source mac.
    #[must_use]
    pub fn from_be_bytes(raw: [u8; 2]) -> EthType {
        EthType(u16::from_be_bytes(raw))
    }
}

impl Display for EthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}
