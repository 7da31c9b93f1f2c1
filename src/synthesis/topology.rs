// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Topology Stage
//!
//! Carves the environment's base block into per-tier, per-zone subnets
//! and wires the routing skeleton: internet gateway for the public tier,
//! one NAT gateway per zone for private egress, no default route in the
//! data tier.

use std::collections::BTreeSet;
use tracing::debug;

use crate::compliance::{Finding, FindingCode};
use crate::domain::{AvailabilityZone, Environment, Network, RouteTarget, Subnet, SubnetTier};
use crate::errors::InternalInvariantError;
use crate::graph::{Relation, ResourceGraph, ResourceNode};

use super::{construction_error, keys};

/// Prefix length added to the base block when sizing subnets
pub const CARVE_PREFIX_OFFSET: u8 = 4;

/// Longest (smallest) prefix a subnet may carry
pub const MIN_SUBNET_PREFIX: u8 = 28;

/// What the topology stage hands the rest of the pipeline
#[derive(Debug, Clone)]
pub struct TopologyOutput {
    /// Carved subnet plan in tier-major, zone-minor order
    pub network: Network,
    /// Graph fragment: network, subnets, gateways, routing edges
    pub fragment: ResourceGraph,
    /// Findings raised during carving
    pub findings: Vec<Finding>,
}

/// Carve the subnet plan and routing skeleton for an environment
///
/// Subnet blocks are consecutive subblocks of the base, sized
/// `base prefix + CARVE_PREFIX_OFFSET` but never longer than
/// `MIN_SUBNET_PREFIX`, assigned tier-major then zone-minor. A base
/// block too small for one subnet per tier and zone keeps the subnets
/// that fit and reports the exhaustion as a blocking finding.
pub fn build(env: &Environment) -> Result<TopologyOutput, InternalInvariantError> {
    let base = env.base_block;
    let mut findings = Vec::new();

    let sub_prefix = base
        .prefix_len()
        .saturating_add(CARVE_PREFIX_OFFSET)
        .min(MIN_SUBNET_PREFIX);
    let needed = (SubnetTier::ALL.len() * env.zone_count()) as u64;
    let available = base.subblock_count(sub_prefix);

    if needed > available {
        findings.push(Finding::blocking(
            FindingCode::AddressSpaceExhausted,
            format!(
                "base block {base} holds {available} /{sub_prefix} slots but the plan needs {needed}"
            ),
        ));
    }

    let mut network = Network::new(base);
    let mut index = 0u64;
    'carve: for tier in SubnetTier::ALL {
        for zone in &env.zones {
            if index >= available {
                break 'carve;
            }
            let block = base
                .nth_subblock(sub_prefix, index)
                .map_err(construction_error("subnet block"))?;
            index += 1;
            network.subnets.push(Subnet {
                tier,
                zone: zone.clone(),
                block,
                route: tier.default_route(),
            });
        }
    }

    let mut fragment = ResourceGraph::new();
    let network_key = keys::network(&env.name);
    fragment.insert(network_key.clone(), ResourceNode::Network { base_block: base })?;
    fragment.connect(
        network_key.clone(),
        keys::encryption_key(&env.name),
        Relation::EncryptedBy,
    );

    let igw_key = keys::internet_gateway(&env.name);
    if network.tier_subnets(SubnetTier::Public).next().is_some() {
        fragment.insert(igw_key.clone(), ResourceNode::InternetGateway)?;
    }

    // One NAT gateway per zone, hosted in that zone's public subnet
    let nat_zones: BTreeSet<AvailabilityZone> = network
        .tier_zone_coverage(SubnetTier::Public)
        .into_iter()
        .cloned()
        .collect();
    for zone in &nat_zones {
        let nat_key = keys::nat_gateway(&env.name, zone);
        fragment.insert(
            nat_key.clone(),
            ResourceNode::NatGateway { zone: zone.clone() },
        )?;
        fragment.connect(
            nat_key,
            keys::subnet(&env.name, SubnetTier::Public, zone),
            Relation::PlacedIn,
        );
    }

    for subnet in &network.subnets {
        let subnet_key = keys::subnet(&env.name, subnet.tier, &subnet.zone);
        fragment.insert(subnet_key.clone(), ResourceNode::Subnet(subnet.clone()))?;
        fragment.connect(subnet_key.clone(), network_key.clone(), Relation::PlacedIn);
        match subnet.route {
            RouteTarget::InternetGateway => {
                fragment.connect(subnet_key, igw_key.clone(), Relation::RoutesTo);
            }
            RouteTarget::NatGateway => {
                // A zone without a public subnet has no NAT to route to;
                // the validator reports the missing egress path
                if nat_zones.contains(&subnet.zone) {
                    fragment.connect(
                        subnet_key,
                        keys::nat_gateway(&env.name, &subnet.zone),
                        Relation::RoutesTo,
                    );
                }
            }
            RouteTarget::LocalOnly => {}
        }
    }

    debug!(
        environment = %env.name,
        base = %base,
        subnets = network.subnets.len(),
        "carved network topology"
    );

    Ok(TopologyOutput {
        network,
        fragment,
        findings,
    })
}
