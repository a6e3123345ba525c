//! IPv4 address blocks in CIDR notation.
//!
//! Provides [`AddressBlock`], an aligned base address plus prefix length, along
//! with the bit helpers the planners build on.

use crate::error::{PlanError, PlanResult};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Maximum length for an IPv4 prefix (32 bits).
pub const MAX_LENGTH: u8 = 32;

/// Addresses a cloud provider keeps back in every subnet
/// (network, router, DNS, future use, broadcast).
pub const RESERVED_HOSTS: u64 = 5;

/// Convert a CIDR prefix length to a subnet mask as u32.
///
/// # Examples
/// ```
/// use vpc_subnet_planner::models::get_cidr_mask;
/// assert_eq!(get_cidr_mask(24).unwrap(), 0xFFFFFF00);
/// ```
pub fn get_cidr_mask(len: u8) -> PlanResult<u32> {
    if len > MAX_LENGTH {
        Err(PlanError::invalid_block(
            format!("/{len}"),
            "network length is too long",
        ))
    } else {
        let right_len = MAX_LENGTH - len;
        let all_bits = u32::MAX as u64;

        let mask = (all_bits >> right_len) << right_len;

        Ok(mask as u32)
    }
}

/// Get the network address for a given IP and prefix length.
pub fn cut_addr(addr: Ipv4Addr, len: u8) -> PlanResult<Ipv4Addr> {
    let mask = get_cidr_mask(len)?;
    Ok(Ipv4Addr::from(u32::from(addr) & mask))
}

/// Calculate the broadcast address for a given IP and prefix length.
pub fn broadcast_addr(addr: Ipv4Addr, len: u8) -> PlanResult<Ipv4Addr> {
    let mask = get_cidr_mask(len)?;
    let network_bits = u32::from(addr) & mask;
    Ok(Ipv4Addr::from(network_bits | !mask))
}

/// Number of addresses in a block of the given prefix length.
pub fn block_size(len: u8) -> PlanResult<u64> {
    if len > MAX_LENGTH {
        return Err(PlanError::invalid_block(
            format!("/{len}"),
            "network length is too long",
        ));
    }
    Ok(1u64 << (MAX_LENGTH - len))
}

/// Calculate the number of usable host addresses in a cloud subnet.
pub fn usable_hosts(len: u8) -> PlanResult<u64> {
    if len >= MAX_LENGTH - 2 {
        // /29 = 8 IPs, 3 usable; anything smaller leaves nothing
        Err(PlanError::invalid_block(
            format!("/{len}"),
            "network length is too long to hold hosts",
        ))
    } else {
        Ok(block_size(len)? - RESERVED_HOSTS)
    }
}

/// An aligned IPv4 address range: base address plus prefix length.
///
/// The base never has host bits set and the prefix is always `0..=32`; every
/// constructor enforces both.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Copy, Clone, Hash)]
pub struct AddressBlock {
    addr: Ipv4Addr,
    mask: u8,
}

impl AddressBlock {
    /// Create a new [`AddressBlock`] from a CIDR string (e.g., "10.0.0.0/24").
    pub fn new(addr_cidr: &str) -> PlanResult<AddressBlock> {
        let addr_cidr = addr_cidr.trim();
        let parts: Vec<&str> = addr_cidr.split('/').collect();
        if parts.len() != 2 {
            return Err(PlanError::invalid_block(addr_cidr, "expected address/prefix"));
        }
        let addr: Ipv4Addr = parts[0]
            .parse()
            .map_err(|_| PlanError::invalid_block(addr_cidr, "invalid address"))?;
        let mask: u8 = parts[1]
            .parse()
            .map_err(|_| PlanError::invalid_block(addr_cidr, "invalid prefix length"))?;
        AddressBlock::from_parts(addr, mask)
    }

    /// Build a block from its parts, rejecting out of range prefixes and set host bits.
    pub fn from_parts(addr: Ipv4Addr, mask: u8) -> PlanResult<AddressBlock> {
        if mask > MAX_LENGTH {
            return Err(PlanError::invalid_block(
                format!("{addr}/{mask}"),
                "network length is too long",
            ));
        }
        if cut_addr(addr, mask)? != addr {
            return Err(PlanError::invalid_block(
                format!("{addr}/{mask}"),
                "host bits set in base address",
            ));
        }
        Ok(AddressBlock { addr, mask })
    }

    /// Block that starts at the given numeric address.
    pub(crate) fn from_bits(bits: u32, mask: u8) -> PlanResult<AddressBlock> {
        AddressBlock::from_parts(Ipv4Addr::from(bits), mask)
    }

    /// The default route, `0.0.0.0/0`.
    pub fn any() -> AddressBlock {
        AddressBlock {
            addr: Ipv4Addr::UNSPECIFIED,
            mask: 0,
        }
    }

    /// Base (network) address.
    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    /// Prefix length.
    pub fn prefix(&self) -> u8 {
        self.mask
    }

    /// Lowest address as a number.
    pub fn lo(&self) -> u32 {
        u32::from(self.addr)
    }

    /// Highest (broadcast) address as a number.
    pub fn hi(&self) -> u32 {
        let host_bits = ((1u64 << (MAX_LENGTH - self.mask)) - 1) as u32;
        self.lo() | host_bits
    }

    /// Get the broadcast address for this block.
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.hi())
    }

    /// Number of addresses covered.
    pub fn size(&self) -> u64 {
        1u64 << (MAX_LENGTH - self.mask)
    }
}

impl FromStr for AddressBlock {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AddressBlock::new(s)
    }
}

impl Serialize for AddressBlock {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AddressBlock {
    fn deserialize<D>(deserializer: D) -> Result<AddressBlock, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        AddressBlock::new(&s).map_err(de::Error::custom)
    }
}

impl std::fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}
