// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network, Subnet, and Routing Value Objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::cidr::CidrBlock;
use super::environment::{AvailabilityZone, EnvironmentError};

/// Logical network segment with a fixed reachability policy
///
/// Tiers are ordered: carving assigns public blocks first, then private,
/// then data, so the derived `Ord` is the carving order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SubnetTier {
    Public,
    Private,
    Data,
}

impl SubnetTier {
    /// All tiers in carving order
    pub const ALL: [SubnetTier; 3] = [SubnetTier::Public, SubnetTier::Private, SubnetTier::Data];

    /// Get the tier as its canonical lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            SubnetTier::Public => "public",
            SubnetTier::Private => "private",
            SubnetTier::Data => "data",
        }
    }

    /// The routing target this tier receives
    ///
    /// Public subnets face the internet gateway, private subnets egress
    /// through NAT, data subnets keep no default route at all.
    pub fn default_route(&self) -> RouteTarget {
        match self {
            SubnetTier::Public => RouteTarget::InternetGateway,
            SubnetTier::Private => RouteTarget::NatGateway,
            SubnetTier::Data => RouteTarget::LocalOnly,
        }
    }
}

impl fmt::Display for SubnetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubnetTier {
    type Err = EnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(SubnetTier::Public),
            "private" => Ok(SubnetTier::Private),
            "data" => Ok(SubnetTier::Data),
            other => Err(EnvironmentError::UnknownTier(other.to_string())),
        }
    }
}

/// Where a subnet's default route points
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum RouteTarget {
    /// Default route to the internet gateway
    InternetGateway,
    /// Egress-only route through a per-zone NAT gateway
    NatGateway,
    /// No default route; local traffic only
    LocalOnly,
}

impl RouteTarget {
    /// Get the target as its canonical kebab-case label
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteTarget::InternetGateway => "internet-gateway",
            RouteTarget::NatGateway => "nat-gateway",
            RouteTarget::LocalOnly => "local-only",
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One carved subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// Tier label controlling reachability
    pub tier: SubnetTier,
    /// Availability zone this subnet lives in
    pub zone: AvailabilityZone,
    /// Address block carved out of the network's base block
    pub block: CidrBlock,
    /// Default routing target
    pub route: RouteTarget,
}

impl Subnet {
    /// Canonical label, e.g. "private-az2"
    pub fn label(&self) -> String {
        format!("{}-{}", self.tier, self.zone)
    }
}

/// A synthesized virtual network: base block plus ordered subnets
///
/// Subnet order is the stable carving order (tier-major, zone-minor),
/// never re-sorted after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Base address block all subnets are carved from
    pub base_block: CidrBlock,
    /// Subnets in carving order
    pub subnets: Vec<Subnet>,
}

impl Network {
    /// Create an empty network over a base block
    pub fn new(base_block: CidrBlock) -> Self {
        Self {
            base_block,
            subnets: Vec::new(),
        }
    }

    /// Subnets belonging to one tier, in carving order
    pub fn tier_subnets(&self, tier: SubnetTier) -> impl Iterator<Item = &Subnet> {
        self.subnets.iter().filter(move |s| s.tier == tier)
    }

    /// Distinct zones covered by one tier
    pub fn tier_zone_coverage(&self, tier: SubnetTier) -> BTreeSet<&AvailabilityZone> {
        self.tier_subnets(tier).map(|s| &s.zone).collect()
    }

    /// All pairs of subnets whose blocks intersect
    ///
    /// Carving guarantees this comes back empty; kept as a check for
    /// hand-assembled networks.
    pub fn overlapping_pairs(&self) -> Vec<(&Subnet, &Subnet)> {
        let mut pairs = Vec::new();
        for (i, a) in self.subnets.iter().enumerate() {
            for b in &self.subnets[i + 1..] {
                if a.block.overlaps(&b.block) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// All subnets whose blocks escape the base block
    pub fn escaping_subnets(&self) -> Vec<&Subnet> {
        self.subnets
            .iter()
            .filter(|s| !self.base_block.contains(&s.block))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet(tier: SubnetTier, zone: &str, block: &str) -> Subnet {
        Subnet {
            tier,
            zone: AvailabilityZone::new(zone).unwrap(),
            block: CidrBlock::new(block).unwrap(),
            route: tier.default_route(),
        }
    }

    #[test]
    fn test_tier_carving_order() {
        assert!(SubnetTier::Public < SubnetTier::Private);
        assert!(SubnetTier::Private < SubnetTier::Data);
        assert_eq!(
            SubnetTier::ALL,
            [SubnetTier::Public, SubnetTier::Private, SubnetTier::Data]
        );
    }

    #[test]
    fn test_default_routes_per_tier() {
        assert_eq!(
            SubnetTier::Public.default_route(),
            RouteTarget::InternetGateway
        );
        assert_eq!(SubnetTier::Private.default_route(), RouteTarget::NatGateway);
        assert_eq!(SubnetTier::Data.default_route(), RouteTarget::LocalOnly);
    }

    #[test]
    fn test_subnet_label() {
        let s = subnet(SubnetTier::Private, "az2", "10.0.32.0/20");
        assert_eq!(s.label(), "private-az2");
    }

    #[test]
    fn test_overlap_detection() {
        let mut network = Network::new(CidrBlock::new("10.0.0.0/16").unwrap());
        network.subnets.push(subnet(SubnetTier::Public, "az1", "10.0.0.0/20"));
        network.subnets.push(subnet(SubnetTier::Public, "az2", "10.0.16.0/20"));
        assert!(network.overlapping_pairs().is_empty());

        // A /19 covering both /20s collides with each
        network.subnets.push(subnet(SubnetTier::Data, "az1", "10.0.0.0/19"));
        assert_eq!(network.overlapping_pairs().len(), 2);
    }

    #[test]
    fn test_escaping_subnets() {
        let mut network = Network::new(CidrBlock::new("10.0.0.0/16").unwrap());
        network.subnets.push(subnet(SubnetTier::Public, "az1", "10.0.0.0/20"));
        network.subnets.push(subnet(SubnetTier::Data, "az1", "10.1.0.0/20"));
        let escaping = network.escaping_subnets();
        assert_eq!(escaping.len(), 1);
        assert_eq!(escaping[0].block.to_string(), "10.1.0.0/20");
    }

    #[test]
    fn test_tier_zone_coverage() {
        let mut network = Network::new(CidrBlock::new("10.0.0.0/16").unwrap());
        network.subnets.push(subnet(SubnetTier::Private, "az1", "10.0.32.0/20"));
        network.subnets.push(subnet(SubnetTier::Private, "az2", "10.0.48.0/20"));
        network.subnets.push(subnet(SubnetTier::Data, "az1", "10.0.64.0/20"));

        assert_eq!(network.tier_zone_coverage(SubnetTier::Private).len(), 2);
        assert_eq!(network.tier_zone_coverage(SubnetTier::Data).len(), 1);
        assert_eq!(network.tier_zone_coverage(SubnetTier::Public).len(), 0);
    }
}
