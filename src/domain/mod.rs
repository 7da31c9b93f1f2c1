// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Domain Models
//!
//! Validated value objects for the synthesis pipeline. Every type here
//! is immutable once constructed and enforces its own invariants at the
//! constructor, so synthesis stages never re-check basic shape.
//!
//! # Value Objects with Invariants
//!
//! - [`CidrBlock`] - canonical IPv4 blocks with carving arithmetic
//! - [`EnvironmentName`] / [`AvailabilityZone`] - graph-key-safe labels
//! - [`EnvTier`] - dev/staging/prod with compliance profiles
//! - [`SubnetTier`] / [`RouteTarget`] - segment reachability policy
//! - [`PortRange`] / [`GroupId`] - security rule building blocks
//! - [`ScalingBounds`] - min/desired/max with midpoint defaulting
//! - [`KeyRef`] - weak reference to an encryption key

pub mod cidr;
pub mod encryption;
pub mod environment;
pub mod fleet;
pub mod network;
pub mod security;

use thiserror::Error;

// Re-export value objects
pub use cidr::{CidrBlock, CidrError};
pub use encryption::{AuditBinding, EncryptionError, KeyPolicy, KeyRef};
pub use environment::{
    AvailabilityZone, ComplianceProfile, EnvTier, Environment, EnvironmentError,
    EnvironmentName,
};
pub use fleet::{
    FleetError, FleetIntent, FleetSpec, HealthCheckPath, InstanceShape, LoadBalancerSpec,
    ScalingBounds, ScalingMetric, ScalingPolicy, ScheduleDays, ScheduledAction,
    TargetGroupSpec,
};
pub use network::{Network, RouteTarget, Subnet, SubnetTier};
pub use security::{
    evaluate_filters, FilterAction, FilterRule, Flow, FlowDirection, GroupId, GroupRole,
    PortRange, Protocol, RulePeer, SecurityError, SecurityGroup, SecurityRule,
};

/// Umbrella error over every domain value-object validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Cidr(#[from] CidrError),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Fleet(#[from] FleetError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}
