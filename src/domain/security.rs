// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Group and Filter Rule Value Objects
//!
//! Two independent enforcement layers share these types: stateful
//! security groups (rule lists with group-to-group references) and
//! stateless per-subnet filter rules (priority-ordered allow/deny).
//! The validator later checks the two layers agree on every declared
//! flow.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::cidr::CidrBlock;
use super::network::SubnetTier;

/// Security rule validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecurityError {
    #[error("Invalid port range: {from}-{to} (from must not exceed to)")]
    InvalidPortRange { from: u16, to: u16 },

    #[error("Security group id is empty")]
    EmptyGroupId,

    #[error("Security group id exceeds maximum length of 64 characters: {0}")]
    GroupIdTooLong(usize),

    #[error("Invalid character in security group id: {0}")]
    InvalidGroupIdCharacter(char),
}

/// Network protocol selector
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    /// Matches any protocol
    Any,
}

impl Protocol {
    /// Get the protocol as its canonical lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::Any => "any",
        }
    }

    /// Check whether a rule with this protocol applies to traffic of
    /// another protocol
    pub fn covers(&self, other: Protocol) -> bool {
        *self == Protocol::Any || *self == other
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive port range value object
///
/// Invariants:
/// - `from <= to`
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::PortRange;
///
/// let https = PortRange::single(443);
/// assert!(https.contains(443));
/// assert!(!https.contains(80));
///
/// assert!(PortRange::new(2048, 1024).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PortRange {
    from: u16,
    to: u16,
}

impl PortRange {
    /// The ephemeral return-port range stateless filters must admit
    pub const EPHEMERAL: PortRange = PortRange {
        from: 1024,
        to: 65535,
    };

    /// Create a new port range with validation
    ///
    /// # Invariants
    /// - `from <= to`
    pub fn new(from: u16, to: u16) -> Result<Self, SecurityError> {
        if from > to {
            return Err(SecurityError::InvalidPortRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// Range covering a single port
    pub fn single(port: u16) -> Self {
        Self {
            from: port,
            to: port,
        }
    }

    /// Range covering every port
    pub fn all() -> Self {
        Self { from: 0, to: 65535 }
    }

    /// Lower bound (inclusive)
    pub fn from(&self) -> u16 {
        self.from
    }

    /// Upper bound (inclusive)
    pub fn to(&self) -> u16 {
        self.to
    }

    /// Check whether a port falls inside this range
    pub fn contains(&self, port: u16) -> bool {
        self.from <= port && port <= self.to
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

/// Security group identifier value object
///
/// Invariants:
/// - Non-empty, at most 64 characters
/// - Lowercase alphanumerics and hyphens only
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Maximum id length
    pub const MAX_LENGTH: usize = 64;

    /// Create a new group id with validation
    pub fn new(id: impl Into<String>) -> Result<Self, SecurityError> {
        let id = id.into();

        if id.is_empty() {
            return Err(SecurityError::EmptyGroupId);
        }
        if id.len() > Self::MAX_LENGTH {
            return Err(SecurityError::GroupIdTooLong(id.len()));
        }
        for ch in id.chars() {
            if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && ch != '-' {
                return Err(SecurityError::InvalidGroupIdCharacter(ch));
            }
        }

        Ok(Self(id))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GroupId {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The logical role a security group plays in the least-privilege template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupRole {
    /// Blanket group for one subnet tier
    Tier(SubnetTier),
    /// Public entry point accepting external traffic
    LoadBalancer,
    /// Application fleet, reachable only from the load balancer
    Compute,
    /// Persistent store, reachable only from compute
    DataStore,
    /// Cache layer, reachable only from compute
    Cache,
}

impl GroupRole {
    /// Canonical label, e.g. "tier-public" or "data-store"
    pub fn label(&self) -> String {
        match self {
            GroupRole::Tier(tier) => format!("tier-{tier}"),
            GroupRole::LoadBalancer => "load-balancer".to_string(),
            GroupRole::Compute => "compute".to_string(),
            GroupRole::DataStore => "data-store".to_string(),
            GroupRole::Cache => "cache".to_string(),
        }
    }

    /// The subnet tier workloads with this role live in
    pub fn tier(&self) -> SubnetTier {
        match self {
            GroupRole::Tier(tier) => *tier,
            GroupRole::LoadBalancer => SubnetTier::Public,
            GroupRole::Compute => SubnetTier::Private,
            GroupRole::DataStore | GroupRole::Cache => SubnetTier::Data,
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The source or destination of a security rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulePeer {
    /// A literal address block
    Cidr(CidrBlock),
    /// A reference to another security group
    Group(GroupId),
}

impl RulePeer {
    /// Check whether this peer is the unrestricted 0.0.0.0/0 block
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, RulePeer::Cidr(block) if block.is_unrestricted())
    }

    /// The referenced group id, if this peer is a group reference
    pub fn group(&self) -> Option<&GroupId> {
        match self {
            RulePeer::Group(id) => Some(id),
            RulePeer::Cidr(_) => None,
        }
    }
}

/// One allow rule inside a security group
///
/// Direction is implied by the list holding the rule (`ingress` or
/// `egress` on [`SecurityGroup`]). Groups are default-deny, so rules
/// only ever allow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRule {
    pub protocol: Protocol,
    pub ports: PortRange,
    pub peer: RulePeer,
}

impl SecurityRule {
    /// Allow traffic from/to another group on a port range
    pub fn from_group(protocol: Protocol, ports: PortRange, group: GroupId) -> Self {
        Self {
            protocol,
            ports,
            peer: RulePeer::Group(group),
        }
    }

    /// Allow traffic from/to an address block on a port range
    pub fn from_cidr(protocol: Protocol, ports: PortRange, block: CidrBlock) -> Self {
        Self {
            protocol,
            ports,
            peer: RulePeer::Cidr(block),
        }
    }
}

/// A named security group with ordered ingress/egress rule lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub id: GroupId,
    pub role: GroupRole,
    pub ingress: Vec<SecurityRule>,
    pub egress: Vec<SecurityRule>,
}

impl SecurityGroup {
    /// Create an empty group
    pub fn new(id: GroupId, role: GroupRole) -> Self {
        Self {
            id,
            role,
            ingress: Vec::new(),
            egress: Vec::new(),
        }
    }

    /// Groups this group authorizes inbound traffic from
    ///
    /// These references form the least-privilege graph whose acyclicity
    /// keeps evaluation decidable.
    pub fn ingress_group_refs(&self) -> impl Iterator<Item = &GroupId> {
        self.ingress.iter().filter_map(|rule| rule.peer.group())
    }

    /// Check whether any ingress rule admits the unrestricted block
    pub fn has_unrestricted_ingress(&self) -> bool {
        self.ingress.iter().any(|rule| rule.peer.is_unrestricted())
    }
}

/// Filter rule action
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    Allow,
    Deny,
}

/// Traffic direction relative to a subnet
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Ingress,
    Egress,
}

impl FlowDirection {
    /// Get the direction as its canonical lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowDirection::Ingress => "ingress",
            FlowDirection::Egress => "egress",
        }
    }
}

impl fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One stateless perimeter filter rule
///
/// Rules are evaluated lowest priority number first; the first match
/// decides. Priorities must be unique within one subnet scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub priority: u16,
    pub direction: FlowDirection,
    pub action: FilterAction,
    pub protocol: Protocol,
    pub ports: PortRange,
    pub source: CidrBlock,
    pub destination: CidrBlock,
}

impl FilterRule {
    /// Check whether this rule applies to a flow
    pub fn matches(&self, flow: &Flow) -> bool {
        self.direction == flow.direction
            && self.protocol.covers(flow.protocol)
            && self.ports.contains(flow.port)
            && self.source.contains(&flow.source)
            && self.destination.contains(&flow.destination)
    }
}

/// A concrete traffic flow, used to compare the two enforcement layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    pub direction: FlowDirection,
    pub protocol: Protocol,
    pub port: u16,
    pub source: CidrBlock,
    pub destination: CidrBlock,
}

/// Evaluate an ordered filter rule set against a flow
///
/// Lowest matching priority wins. `None` means no rule matched, which
/// a well-formed rule set prevents with a catch-all deny.
pub fn evaluate_filters(rules: &[FilterRule], flow: &Flow) -> Option<FilterAction> {
    rules
        .iter()
        .filter(|rule| rule.matches(flow))
        .min_by_key(|rule| rule.priority)
        .map(|rule| rule.action)
}
