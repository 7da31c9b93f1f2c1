// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute Fleet Stage
//!
//! Turns the resolved fleet intent into fleet, load balancer, target
//! group, and scaling policy nodes. The fleet lives in the private tier
//! behind the load balancer; the load balancer terminates the external
//! listener in the public tier and forwards to the service port through
//! the target group.

use tracing::debug;

use crate::domain::{
    Environment, FleetSpec, GroupRole, LoadBalancerSpec, Network, ScalingMetric, ScalingPolicy,
    ScheduleDays, ScheduledAction, SubnetTier, TargetGroupSpec,
};
use crate::errors::InternalInvariantError;
use crate::graph::{Relation, ResourceGraph, ResourceNode};

use super::security::{group_id, LISTENER_PORT, SERVICE_PORT};
use super::{construction_error, keys};

/// Hour non-production fleets scale in for the night, UTC
pub const SCALE_IN_HOUR_UTC: u8 = 20;

/// Hour non-production fleets scale back out, UTC
pub const SCALE_OUT_HOUR_UTC: u8 = 6;

// Request-count thresholds sit far apart so short bursts do not flap
// the fleet
const REQUEST_COUNT_SCALE_UP: u32 = 1000;
const REQUEST_COUNT_SCALE_DOWN: u32 = 100;

/// Synthesize the compute fleet and its entry path for an environment
pub fn synthesize(
    env: &Environment,
    network: &Network,
) -> Result<ResourceGraph, InternalInvariantError> {
    let mut fragment = ResourceGraph::new();
    let intent = &env.fleet;

    let fleet_key = keys::fleet(&env.name);
    fragment.insert(
        fleet_key.clone(),
        ResourceNode::Fleet(FleetSpec {
            shape: intent.shape.clone(),
            attached_groups: vec![group_id(env, &GroupRole::Compute)?],
        }),
    )?;
    fragment.connect(
        fleet_key.clone(),
        keys::security_group(&env.name, &GroupRole::Compute),
        Relation::AttachedTo,
    );
    fragment.connect(
        fleet_key.clone(),
        keys::encryption_key(&env.name),
        Relation::EncryptedBy,
    );
    for subnet in network.tier_subnets(SubnetTier::Private) {
        fragment.connect(
            fleet_key.clone(),
            keys::subnet(&env.name, subnet.tier, &subnet.zone),
            Relation::PlacedIn,
        );
    }

    let lb_key = keys::load_balancer(&env.name);
    fragment.insert(
        lb_key.clone(),
        ResourceNode::LoadBalancer(LoadBalancerSpec {
            listener_port: LISTENER_PORT,
            rate_limit_per_window: env.rate_limit_per_window,
        }),
    )?;
    fragment.connect(
        lb_key.clone(),
        keys::security_group(&env.name, &GroupRole::LoadBalancer),
        Relation::AttachedTo,
    );
    for subnet in network.tier_subnets(SubnetTier::Public) {
        fragment.connect(
            lb_key.clone(),
            keys::subnet(&env.name, subnet.tier, &subnet.zone),
            Relation::PlacedIn,
        );
    }

    let tg_key = keys::target_group(&env.name);
    fragment.insert(
        tg_key.clone(),
        ResourceNode::TargetGroup(TargetGroupSpec {
            port: SERVICE_PORT,
            health_check_path: intent.health_check_path.clone(),
        }),
    )?;
    fragment.connect(lb_key, tg_key.clone(), Relation::ForwardsTo);
    fragment.connect(tg_key, fleet_key.clone(), Relation::ForwardsTo);

    let scaling_key = keys::scaling_policy(&env.name);
    fragment.insert(
        scaling_key.clone(),
        ResourceNode::ScalingPolicy(scaling_policy(env)?),
    )?;
    fragment.connect(scaling_key, fleet_key, Relation::AttachedTo);

    debug!(
        environment = %env.name,
        shape = %intent.shape,
        bounds = %intent.bounds,
        "synthesized compute fleet"
    );
    Ok(fragment)
}

/// Build the scaling policy for an environment's fleet intent
///
/// Production fleets keep their capacity around the clock. Everything
/// else scales in to minimum at 20:00 UTC on weekdays and back out to
/// desired at 06:00, whole hours only.
fn scaling_policy(env: &Environment) -> Result<ScalingPolicy, InternalInvariantError> {
    let intent = &env.fleet;
    let (up, down) = match intent.scaling_metric {
        ScalingMetric::CpuUtilization => (
            ScalingPolicy::DEFAULT_SCALE_UP,
            ScalingPolicy::DEFAULT_SCALE_DOWN,
        ),
        ScalingMetric::RequestCountPerTarget => (REQUEST_COUNT_SCALE_UP, REQUEST_COUNT_SCALE_DOWN),
    };
    let mut policy = ScalingPolicy::new(intent.bounds, intent.scaling_metric, up, down)
        .map_err(construction_error("scaling policy"))?;

    if !env.tier.is_production() {
        let bounds = &intent.bounds;
        policy.schedules.push(
            ScheduledAction::new(
                "overnight-scale-in",
                ScheduleDays::Weekdays,
                SCALE_IN_HOUR_UTC,
                bounds.min(),
                bounds.min(),
            )
            .map_err(construction_error("scheduled action"))?,
        );
        policy.schedules.push(
            ScheduledAction::new(
                "morning-scale-out",
                ScheduleDays::Weekdays,
                SCALE_OUT_HOUR_UTC,
                bounds.min(),
                bounds.desired(),
            )
            .map_err(construction_error("scheduled action"))?,
        );
    }

    Ok(policy)
}
