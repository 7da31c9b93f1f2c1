// Copyright (c) 2025 - Cowboy AI, Inc.
//! Environment Value Objects and Compliance Profiles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::cidr::CidrBlock;
use super::fleet::FleetIntent;

/// Environment validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("Environment name is empty")]
    EmptyName,

    #[error("Environment name exceeds maximum length of 32 characters: {0}")]
    NameTooLong(usize),

    #[error("Invalid character in environment name: {0}")]
    InvalidNameCharacter(char),

    #[error("Environment name cannot start or end with hyphen: {0}")]
    InvalidNameFormat(String),

    #[error("Unknown environment tier: {0} (expected dev, staging, or prod)")]
    UnknownTier(String),

    #[error("Availability zone label is empty")]
    EmptyZoneLabel,

    #[error("Availability zone label exceeds maximum length of 24 characters: {0}")]
    ZoneLabelTooLong(String),

    #[error("Invalid character in availability zone label: {0}")]
    InvalidZoneCharacter(char),
}

/// Environment name value object
///
/// Names become part of every node key in the synthesized graph, so the
/// representation is kept canonical.
/// Invariants:
/// - Non-empty, at most 32 characters
/// - Lowercase ASCII alphanumerics and hyphens only
/// - Cannot start or end with a hyphen
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::EnvironmentName;
///
/// let name = EnvironmentName::new("prod-us").unwrap();
/// assert_eq!(name.as_str(), "prod-us");
///
/// assert!(EnvironmentName::new("").is_err());
/// assert!(EnvironmentName::new("Prod").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentName(String);

impl EnvironmentName {
    /// Maximum name length
    pub const MAX_LENGTH: usize = 32;

    /// Create a new environment name with validation
    ///
    /// # Invariants
    /// - Non-empty, at most 32 characters
    /// - Lowercase alphanumerics and hyphens, no edge hyphens
    pub fn new(name: impl Into<String>) -> Result<Self, EnvironmentError> {
        let name = name.into();

        if name.is_empty() {
            return Err(EnvironmentError::EmptyName);
        }
        if name.len() > Self::MAX_LENGTH {
            return Err(EnvironmentError::NameTooLong(name.len()));
        }
        for ch in name.chars() {
            if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && ch != '-' {
                return Err(EnvironmentError::InvalidNameCharacter(ch));
            }
        }
        if name.starts_with('-') || name.ends_with('-') {
            return Err(EnvironmentError::InvalidNameFormat(name));
        }

        Ok(Self(name))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EnvironmentName {
    type Err = EnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for EnvironmentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Environment tier
///
/// The tier selects the compliance profile: minimum retention, encryption,
/// and availability requirements tighten from dev through prod.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EnvTier {
    Dev,
    Staging,
    Prod,
}

impl EnvTier {
    /// Get the tier as its canonical lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvTier::Dev => "dev",
            EnvTier::Staging => "staging",
            EnvTier::Prod => "prod",
        }
    }

    /// Check if this is the production tier
    pub fn is_production(&self) -> bool {
        matches!(self, EnvTier::Prod)
    }

    /// The compliance floor associated with this tier
    pub fn compliance_profile(&self) -> ComplianceProfile {
        match self {
            EnvTier::Dev => ComplianceProfile {
                min_retention_days: 7,
                retention_target_days: 30,
                encryption_at_rest_required: false,
                high_availability_required: false,
                min_key_deletion_window_days: 7,
                audit_all_management_events: false,
            },
            EnvTier::Staging => ComplianceProfile {
                min_retention_days: 30,
                retention_target_days: 90,
                encryption_at_rest_required: true,
                high_availability_required: true,
                min_key_deletion_window_days: 7,
                audit_all_management_events: false,
            },
            EnvTier::Prod => ComplianceProfile {
                min_retention_days: 90,
                retention_target_days: 365,
                encryption_at_rest_required: true,
                high_availability_required: true,
                min_key_deletion_window_days: 30,
                audit_all_management_events: true,
            },
        }
    }
}

impl fmt::Display for EnvTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EnvTier {
    type Err = EnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(EnvTier::Dev),
            "staging" => Ok(EnvTier::Staging),
            "prod" => Ok(EnvTier::Prod),
            other => Err(EnvironmentError::UnknownTier(other.to_string())),
        }
    }
}

/// Availability zone label value object
///
/// Invariants:
/// - Non-empty, at most 24 characters
/// - Lowercase alphanumerics and hyphens only
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilityZone(String);

impl AvailabilityZone {
    /// Maximum label length
    pub const MAX_LENGTH: usize = 24;

    /// Create a new zone label with validation
    pub fn new(label: impl Into<String>) -> Result<Self, EnvironmentError> {
        let label = label.into();

        if label.is_empty() {
            return Err(EnvironmentError::EmptyZoneLabel);
        }
        if label.len() > Self::MAX_LENGTH {
            return Err(EnvironmentError::ZoneLabelTooLong(label));
        }
        for ch in label.chars() {
            if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && ch != '-' {
                return Err(EnvironmentError::InvalidZoneCharacter(ch));
            }
        }

        Ok(Self(label))
    }

    /// Default label for the zone at a given index: "az1", "az2", ..
    pub fn numbered(index: usize) -> Self {
        Self(format!("az{}", index + 1))
    }

    /// Get the label as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AvailabilityZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AvailabilityZone {
    type Err = EnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Compliance floor for an environment tier
///
/// Minimums only; the validator compares synthesized values against these
/// and reports shortfalls, it never repairs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceProfile {
    /// Minimum audit-log retention in days
    pub min_retention_days: u32,
    /// Best-practice retention target (advisory, not blocking)
    pub retention_target_days: u32,
    /// Whether encryption at rest is mandatory
    pub encryption_at_rest_required: bool,
    /// Whether every tier must span at least two availability zones
    pub high_availability_required: bool,
    /// Minimum key deletion window in days
    pub min_key_deletion_window_days: u32,
    /// Whether audit must cover all management-plane events
    pub audit_all_management_events: bool,
}

/// A fully resolved environment, the root input of one synthesis pipeline
///
/// Built once by the config loader with defaults applied; immutable
/// thereafter. Synthesis stages read it and return graph fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Unique environment name
    pub name: EnvironmentName,
    /// Tier selecting the compliance profile
    pub tier: EnvTier,
    /// Region this environment is placed in
    pub region: String,
    /// Base address block the topology is carved from
    pub base_block: CidrBlock,
    /// Availability zones in configured order
    pub zones: Vec<AvailabilityZone>,
    /// Compliance floor for the tier
    pub profile: ComplianceProfile,
    /// Resolved compute fleet intent
    pub fleet: FleetIntent,
    /// Audit-log retention in days, as configured or tier default
    pub retention_days: u32,
    /// Whether encryption at rest was requested or tier-mandated
    pub encryption_required: bool,
    /// Regions this environment must never be placed in
    pub blocked_regions: Vec<String>,
    /// Optional perimeter request throttle, requests per window
    pub rate_limit_per_window: Option<u32>,
}

impl Environment {
    /// Number of availability zones
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }
}
