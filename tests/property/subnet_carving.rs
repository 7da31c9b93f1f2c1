// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Subnet Carving
//!
//! The carving stage must never emit overlapping or escaping subnets,
//! must fill every tier-zone slot when the base block has room, and
//! must degrade to a partial carve plus a finding when it does not.

use cim_topology::domain::{
    AvailabilityZone, CidrBlock, EnvTier, Environment, EnvironmentName, FleetIntent,
    HealthCheckPath, InstanceShape, ScalingBounds, ScalingMetric, SubnetTier,
};
use cim_topology::synthesis::topology::{self, CARVE_PREFIX_OFFSET, MIN_SUBNET_PREFIX};
use cim_topology::FindingCode;
use proptest::prelude::*;
use std::net::Ipv4Addr;

// ============================================================================
// Environment Fixture
// ============================================================================

fn environment(prefix: u8, zones: usize) -> Environment {
    // 10.0.0.0 is canonical for every prefix of 8 or longer
    let base = CidrBlock::from_parts(Ipv4Addr::new(10, 0, 0, 0), prefix).unwrap();
    Environment {
        name: EnvironmentName::new("carving").unwrap(),
        tier: EnvTier::Staging,
        region: "us-east-1".to_string(),
        base_block: base,
        zones: (0..zones).map(AvailabilityZone::numbered).collect(),
        profile: EnvTier::Staging.compliance_profile(),
        fleet: FleetIntent {
            shape: InstanceShape::new("m5.large").unwrap(),
            bounds: ScalingBounds::resolve(1, None, 3).unwrap(),
            health_check_path: HealthCheckPath::new("/healthz").unwrap(),
            scaling_metric: ScalingMetric::default(),
        },
        retention_days: 90,
        encryption_required: true,
        blocked_regions: Vec::new(),
        rate_limit_per_window: Some(100),
    }
}

fn carve_inputs() -> impl Strategy<Value = (u8, usize)> {
    (8u8..=28, 1usize..=5)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: carved subnets never overlap and never escape the base
    #[test]
    fn prop_carve_is_disjoint_and_contained((prefix, zones) in carve_inputs()) {
        let output = topology::build(&environment(prefix, zones)).unwrap();
        prop_assert!(output.network.overlapping_pairs().is_empty());
        prop_assert!(output.network.escaping_subnets().is_empty());
    }

    /// Property: every carved subnet carries the clamped prefix
    #[test]
    fn prop_subnet_prefix_is_clamped((prefix, zones) in carve_inputs()) {
        let expected = prefix.saturating_add(CARVE_PREFIX_OFFSET).min(MIN_SUBNET_PREFIX);
        let output = topology::build(&environment(prefix, zones)).unwrap();
        for subnet in &output.network.subnets {
            prop_assert_eq!(subnet.block.prefix_len(), expected);
        }
    }

    /// Property: enough room means a full carve, no exhaustion finding;
    /// too little room means a partial carve plus the finding
    #[test]
    fn prop_exhaustion_is_detected_exactly((prefix, zones) in carve_inputs()) {
        let env = environment(prefix, zones);
        let sub = prefix.saturating_add(CARVE_PREFIX_OFFSET).min(MIN_SUBNET_PREFIX);
        let available = env.base_block.subblock_count(sub);
        let needed = (3 * zones) as u64;

        let output = topology::build(&env).unwrap();
        let exhausted = output
            .findings
            .iter()
            .any(|f| f.code == FindingCode::AddressSpaceExhausted);

        if available >= needed {
            prop_assert_eq!(output.network.subnets.len() as u64, needed);
            prop_assert!(!exhausted);
        } else {
            prop_assert_eq!(output.network.subnets.len() as u64, available);
            prop_assert!(exhausted);
        }
    }

    /// Property: carving order is tier-major, zone-minor
    #[test]
    fn prop_carve_order_is_tier_major((prefix, zones) in carve_inputs()) {
        let output = topology::build(&environment(prefix, zones)).unwrap();
        for (i, subnet) in output.network.subnets.iter().enumerate() {
            prop_assert_eq!(subnet.tier, SubnetTier::ALL[i / zones]);
            prop_assert_eq!(&subnet.zone, &AvailabilityZone::numbered(i % zones));
        }
    }

    /// Property: carving the same environment twice yields the same plan
    #[test]
    fn prop_carve_is_deterministic((prefix, zones) in carve_inputs()) {
        let a = topology::build(&environment(prefix, zones)).unwrap();
        let b = topology::build(&environment(prefix, zones)).unwrap();
        prop_assert_eq!(a.network, b.network);
    }
}
