// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Fleet Sizing
//!
//! Bounds resolution and scaling policy synthesis must keep every
//! capacity number inside the declared envelope for all valid inputs.

use cim_topology::domain::{
    AvailabilityZone, CidrBlock, EnvTier, Environment, EnvironmentName, FleetIntent,
    HealthCheckPath, InstanceShape, ScalingBounds, ScalingMetric,
};
use cim_topology::{synthesize_environment, FindingCode};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// An ordered (min, max) pair
fn bounds_inputs() -> impl Strategy<Value = (u32, u32)> {
    (0u32..=100, 0u32..=100).prop_map(|(a, b)| (a.min(b), a.max(b)))
}

fn metric() -> impl Strategy<Value = ScalingMetric> {
    prop_oneof![
        Just(ScalingMetric::CpuUtilization),
        Just(ScalingMetric::RequestCountPerTarget),
    ]
}

fn staging_environment(min: u32, max: u32, scaling_metric: ScalingMetric) -> Environment {
    Environment {
        name: EnvironmentName::new("sizing").unwrap(),
        tier: EnvTier::Staging,
        region: "us-east-1".to_string(),
        base_block: CidrBlock::new("10.0.0.0/16").unwrap(),
        zones: (0..2).map(AvailabilityZone::numbered).collect(),
        profile: EnvTier::Staging.compliance_profile(),
        fleet: FleetIntent {
            shape: InstanceShape::new("m5.large").unwrap(),
            bounds: ScalingBounds::resolve(min, None, max).unwrap(),
            health_check_path: HealthCheckPath::new("/healthz").unwrap(),
            scaling_metric,
        },
        retention_days: 90,
        encryption_required: true,
        blocked_regions: Vec::new(),
        rate_limit_per_window: Some(100),
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: unset desired resolves inside the bounds, toward min
    #[test]
    fn prop_resolved_desired_within_bounds((min, max) in bounds_inputs()) {
        let bounds = &ScalingBounds::resolve(min, None, max).unwrap();
        prop_assert!(bounds.admits(bounds.desired()));
        prop_assert_eq!(bounds.desired(), min + (max - min) / 2);
        // Floor midpoint sits no further from min than from max
        prop_assert!(bounds.desired() - bounds.min() <= bounds.max() - bounds.desired());
    }

    /// Property: an explicit in-range desired is kept verbatim
    #[test]
    fn prop_explicit_desired_kept((min, max) in bounds_inputs(), seed in any::<u32>()) {
        let desired = min + seed % (max - min + 1);
        let bounds = ScalingBounds::resolve(min, Some(desired), max).unwrap();
        prop_assert_eq!(bounds.desired(), desired);
    }

    /// Property: a desired outside the envelope is rejected
    #[test]
    fn prop_out_of_range_desired_rejected((min, max) in bounds_inputs()) {
        prop_assert!(ScalingBounds::resolve(min, Some(max + 1), max).is_err());
        if min > 0 {
            prop_assert!(ScalingBounds::resolve(min, Some(min - 1), max).is_err());
        }
    }

    /// Property: inverted bounds are rejected
    #[test]
    fn prop_inverted_bounds_rejected((min, max) in bounds_inputs()) {
        if min < max {
            prop_assert!(ScalingBounds::resolve(max, None, min).is_err());
        }
    }

    /// Property: growing max never shrinks the resolved desired
    #[test]
    fn prop_desired_monotone_in_max((min, max) in bounds_inputs(), extra in 0u32..=50) {
        let a = ScalingBounds::resolve(min, None, max).unwrap();
        let b = ScalingBounds::resolve(min, None, max + extra).unwrap();
        prop_assert!(b.desired() >= a.desired());
    }

    /// Property: synthesized scaling policies keep thresholds ordered and
    /// every schedule override inside the bounds envelope
    #[test]
    fn prop_synthesized_policy_honors_envelope(
        (min, max) in bounds_inputs(),
        scaling_metric in metric(),
    ) {
        let env = staging_environment(min, max, scaling_metric);
        let synthesis = synthesize_environment(&env).unwrap();

        let (_, policy) = synthesis.graph.scaling_policies().next().unwrap();
        prop_assert!(policy.scale_up_threshold > policy.scale_down_threshold);
        for schedule in &policy.schedules {
            prop_assert!(policy.bounds.admits(schedule.min_override));
            prop_assert!(policy.bounds.admits(schedule.desired_override));
            prop_assert!(schedule.min_override <= schedule.desired_override);
        }

        let out_of_bounds = synthesis
            .report
            .findings()
            .iter()
            .any(|f| f.code == FindingCode::ScheduleOverrideOutOfBounds);
        prop_assert!(!out_of_bounds);
    }
}
