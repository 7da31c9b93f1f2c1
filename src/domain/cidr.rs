// Copyright (c) 2025 - Cowboy AI, Inc.
//! CIDR Block Value Object with Carving Arithmetic

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// CIDR validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CidrError {
    #[error("Invalid CIDR notation: {0}")]
    InvalidFormat(String),

    #[error("Invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("Invalid prefix length: {0} (must be 0-32)")]
    InvalidPrefixLength(u8),

    #[error("Host bits set in network address: {0}")]
    HostBitsSet(String),

    #[error("Sub-block prefix /{child} is shorter than parent prefix /{parent}")]
    PrefixNotNested { parent: u8, child: u8 },

    #[error("Sub-block index {index} out of range ({available} available)")]
    SubblockIndexOutOfRange { index: u64, available: u64 },
}

/// IPv4 CIDR block value object
///
/// Represents a canonical IPv4 network block. All address math in the
/// synthesizer flows through this type.
/// Invariants:
/// - Prefix length 0-32
/// - Canonical representation: all host bits are zero
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::CidrBlock;
///
/// let block = CidrBlock::new("10.0.0.0/16").unwrap();
/// assert_eq!(block.prefix_len(), 16);
/// assert_eq!(block.to_string(), "10.0.0.0/16");
///
/// // "10.0.0.1/16" has host bits set and is rejected
/// assert!(CidrBlock::new("10.0.0.1/16").is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct CidrBlock {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl CidrBlock {
    /// The unrestricted block, 0.0.0.0/0
    pub const UNRESTRICTED: CidrBlock = CidrBlock {
        network: Ipv4Addr::new(0, 0, 0, 0),
        prefix_len: 0,
    };

    /// Create a new CIDR block from notation like "10.0.0.0/16"
    ///
    /// # Invariants
    /// - Prefix length 0-32
    /// - Host bits must be zero (canonical form)
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, CidrError> {
        let cidr = cidr.as_ref();

        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| CidrError::InvalidFormat(cidr.to_string()))?;

        let network = Ipv4Addr::from_str(addr_str)
            .map_err(|_| CidrError::InvalidAddress(addr_str.to_string()))?;

        let prefix_len = prefix_str
            .parse::<u8>()
            .map_err(|_| CidrError::InvalidFormat(cidr.to_string()))?;

        Self::from_parts(network, prefix_len)
            .map_err(|err| match err {
                // Report the full notation, not just the address
                CidrError::HostBitsSet(_) => CidrError::HostBitsSet(cidr.to_string()),
                other => other,
            })
    }

    /// Create from a network address and prefix length
    ///
    /// # Invariants
    /// - Prefix length 0-32
    /// - Host bits must be zero (canonical form)
    pub fn from_parts(network: Ipv4Addr, prefix_len: u8) -> Result<Self, CidrError> {
        if prefix_len > 32 {
            return Err(CidrError::InvalidPrefixLength(prefix_len));
        }

        // Invariant: canonical form has no host bits set
        let addr = u32::from(network);
        if addr & !Self::mask(prefix_len) != 0 {
            return Err(CidrError::HostBitsSet(network.to_string()));
        }

        Ok(Self {
            network,
            prefix_len,
        })
    }

    /// Get the network address
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Get the prefix length
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Total number of addresses in this block
    pub fn address_count(&self) -> u64 {
        1u64 << (32 - self.prefix_len)
    }

    /// Check if this is the unrestricted 0.0.0.0/0 block
    pub fn is_unrestricted(&self) -> bool {
        self.prefix_len == 0
    }

    /// Check if this block fully contains another block
    pub fn contains(&self, other: &CidrBlock) -> bool {
        self.prefix_len <= other.prefix_len
            && u32::from(other.network) & Self::mask(self.prefix_len)
                == u32::from(self.network)
    }

    /// Check if this block shares any address with another block
    pub fn overlaps(&self, other: &CidrBlock) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// Number of sub-blocks of the given prefix this block divides into
    ///
    /// Returns 0 when `sub_prefix` is shorter than this block's prefix.
    pub fn subblock_count(&self, sub_prefix: u8) -> u64 {
        if sub_prefix < self.prefix_len || sub_prefix > 32 {
            return 0;
        }
        1u64 << (sub_prefix - self.prefix_len)
    }

    /// Carve out the Nth sub-block of the given prefix length
    ///
    /// Sub-blocks are ordered by address, so index 0 shares this block's
    /// network address. Carving a /16 into /20 blocks yields indices
    /// 0..16.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cim_topology::domain::CidrBlock;
    ///
    /// let base = CidrBlock::new("10.0.0.0/16").unwrap();
    /// let third = base.nth_subblock(20, 2).unwrap();
    /// assert_eq!(third.to_string(), "10.0.32.0/20");
    /// ```
    pub fn nth_subblock(&self, sub_prefix: u8, index: u64) -> Result<CidrBlock, CidrError> {
        if sub_prefix > 32 {
            return Err(CidrError::InvalidPrefixLength(sub_prefix));
        }
        if sub_prefix < self.prefix_len {
            return Err(CidrError::PrefixNotNested {
                parent: self.prefix_len,
                child: sub_prefix,
            });
        }

        let available = self.subblock_count(sub_prefix);
        if index >= available {
            return Err(CidrError::SubblockIndexOutOfRange { index, available });
        }

        let step = 1u64 << (32 - sub_prefix);
        let base = u64::from(u32::from(self.network)) + index * step;

        Ok(Self {
            network: Ipv4Addr::from(base as u32),
            prefix_len: sub_prefix,
        })
    }

    /// Get as CIDR notation string
    pub fn as_cidr(&self) -> String {
        format!("{}/{}", self.network, self.prefix_len)
    }

    fn mask(prefix_len: u8) -> u32 {
        // checked_shl returns None for a shift of 32, which is /0
        u32::MAX.checked_shl(u32::from(32 - prefix_len)).unwrap_or(0)
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for CidrBlock {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CidrBlock {
    type Error = CidrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CidrBlock> for String {
    fn from(block: CidrBlock) -> Self {
        block.as_cidr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_canonical_block() {
        let block = CidrBlock::new("10.0.0.0/16").unwrap();
        assert_eq!(block.network(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(block.prefix_len(), 16);
        assert_eq!(block.as_cidr(), "10.0.0.0/16");
        assert_eq!(block.address_count(), 65_536);
    }

    #[test]
    fn test_reject_host_bits() {
        assert!(matches!(
            CidrBlock::new("10.0.0.1/16"),
            Err(CidrError::HostBitsSet(_))
        ));
        assert!(matches!(
            CidrBlock::new("192.168.1.128/24"),
            Err(CidrError::HostBitsSet(_))
        ));
    }

    #[test_case("10.0.0.0" ; "missing prefix")]
    #[test_case("10.0.0.0/33" ; "prefix too long")]
    #[test_case("999.0.0.0/8" ; "octet out of range")]
    #[test_case("10.0.0.0/abc" ; "non-numeric prefix")]
    #[test_case("/16" ; "missing address")]
    fn test_reject_malformed(input: &str) {
        assert!(CidrBlock::new(input).is_err());
    }

    #[test]
    fn test_full_range_prefixes() {
        let all = CidrBlock::new("0.0.0.0/0").unwrap();
        assert!(all.is_unrestricted());
        assert_eq!(all.address_count(), 1u64 << 32);

        let host = CidrBlock::new("10.1.2.3/32").unwrap();
        assert_eq!(host.address_count(), 1);
        assert!(all.contains(&host));
    }

    #[test]
    fn test_contains_and_overlaps() {
        let base = CidrBlock::new("10.0.0.0/16").unwrap();
        let inner = CidrBlock::new("10.0.32.0/20").unwrap();
        let sibling = CidrBlock::new("10.1.0.0/16").unwrap();

        assert!(base.contains(&inner));
        assert!(!inner.contains(&base));
        assert!(base.overlaps(&inner));
        assert!(inner.overlaps(&base));
        assert!(!base.overlaps(&sibling));
    }

    #[test]
    fn test_carve_sixteen_slots() {
        let base = CidrBlock::new("10.0.0.0/16").unwrap();
        assert_eq!(base.subblock_count(20), 16);

        let expected = [
            "10.0.0.0/20",
            "10.0.16.0/20",
            "10.0.32.0/20",
            "10.0.48.0/20",
            "10.0.64.0/20",
            "10.0.80.0/20",
        ];
        for (i, want) in expected.iter().enumerate() {
            let sub = base.nth_subblock(20, i as u64).unwrap();
            assert_eq!(sub.as_cidr(), *want);
            assert!(base.contains(&sub));
        }
    }

    #[test]
    fn test_carve_index_out_of_range() {
        let base = CidrBlock::new("10.0.0.0/16").unwrap();
        assert!(matches!(
            base.nth_subblock(20, 16),
            Err(CidrError::SubblockIndexOutOfRange {
                index: 16,
                available: 16
            })
        ));
    }

    #[test]
    fn test_carve_prefix_not_nested() {
        let base = CidrBlock::new("10.0.0.0/24").unwrap();
        assert!(matches!(
            base.nth_subblock(16, 0),
            Err(CidrError::PrefixNotNested {
                parent: 24,
                child: 16
            })
        ));
    }

    #[test]
    fn test_carved_siblings_never_overlap() {
        let base = CidrBlock::new("172.16.0.0/12").unwrap();
        let a = base.nth_subblock(16, 3).unwrap();
        let b = base.nth_subblock(16, 4).unwrap();
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_serde_as_notation_string() {
        let block = CidrBlock::new("10.0.0.0/16").unwrap();
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, "\"10.0.0.0/16\"");

        let back: CidrBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);

        let bad: Result<CidrBlock, _> = serde_json::from_str("\"10.0.0.1/16\"");
        assert!(bad.is_err());
    }
}
