// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Policy Composition Stage
//!
//! Builds the least-privilege security group template and the stateless
//! per-subnet filter sets, and proves the group reference graph acyclic.
//! The two layers are constructed to agree; the validator re-derives the
//! declared flows afterwards and checks that they do.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::domain::{
    CidrBlock, Environment, FilterAction, FilterRule, FlowDirection, GroupId, GroupRole,
    Network, PortRange, Protocol, SecurityGroup, SecurityRule, SubnetTier,
};
use crate::errors::InternalInvariantError;
use crate::graph::{NodeKey, Relation, ResourceGraph, ResourceNode};

use super::{construction_error, keys};

/// External listener port on the load balancer
pub const LISTENER_PORT: u16 = 443;

/// Port the application fleet serves on
pub const SERVICE_PORT: u16 = 8080;

/// Data store port
pub const DATA_STORE_PORT: u16 = 5432;

/// Cache port
pub const CACHE_PORT: u16 = 6379;

/// Priority distance between generated filter rules
pub const RULE_PRIORITY_STEP: u16 = 100;

/// Priority of the trailing catch-all deny
pub const CATCH_ALL_PRIORITY: u16 = 32700;

/// Compose security groups and filter sets for an environment
///
/// The template is fixed per environment; only group ids and subnet
/// blocks vary with the input. A reference cycle aborts synthesis
/// outright instead of becoming a report finding, since the template
/// producing one is a bug, not a configuration problem.
pub fn compose(
    env: &Environment,
    network: &Network,
) -> Result<ResourceGraph, InternalInvariantError> {
    let groups = group_template(env)?;
    verify_acyclic(&groups)?;

    let mut fragment = ResourceGraph::new();
    let network_key = keys::network(&env.name);

    let mut keys_by_id: BTreeMap<GroupId, NodeKey> = BTreeMap::new();
    for group in &groups {
        keys_by_id.insert(
            group.id.clone(),
            keys::security_group(&env.name, &group.role),
        );
    }

    for group in groups {
        let node_key = keys::security_group(&env.name, &group.role);
        for referenced in group.ingress_group_refs() {
            if let Some(target) = keys_by_id.get(referenced) {
                fragment.connect(node_key.clone(), target.clone(), Relation::DependsOn);
            }
        }
        fragment.connect(node_key.clone(), network_key.clone(), Relation::AttachedTo);
        fragment.insert(node_key, ResourceNode::SecurityGroup(group))?;
    }

    let private_blocks: Vec<CidrBlock> = network
        .tier_subnets(SubnetTier::Private)
        .map(|s| s.block)
        .collect();
    for subnet in &network.subnets {
        let rules = filter_rules_for(subnet.tier, env.base_block, &private_blocks);
        let filter_key = keys::filter_set(&env.name, &subnet.label());
        fragment.insert(filter_key.clone(), ResourceNode::FilterSet { rules })?;
        fragment.connect(
            filter_key,
            keys::subnet(&env.name, subnet.tier, &subnet.zone),
            Relation::AttachedTo,
        );
    }

    debug!(
        environment = %env.name,
        groups = keys_by_id.len(),
        filter_sets = network.subnets.len(),
        "composed security policy"
    );
    Ok(fragment)
}

/// The id a template group carries, "sg-{environment}-{role}"
pub(crate) fn group_id(
    env: &Environment,
    role: &GroupRole,
) -> Result<GroupId, InternalInvariantError> {
    GroupId::new(format!("sg-{}-{}", env.name, role.label()))
        .map_err(construction_error("security group id"))
}

/// The fixed least-privilege group template
///
/// Workload groups chain admission: the load balancer takes the listener
/// port from anywhere, compute takes the service port from the load
/// balancer only, data store and cache take their ports from compute
/// only. Tier groups restate the same reachability per subnet tier.
fn group_template(env: &Environment) -> Result<Vec<SecurityGroup>, InternalInvariantError> {
    let lb_id = group_id(env, &GroupRole::LoadBalancer)?;
    let compute_id = group_id(env, &GroupRole::Compute)?;
    let data_id = group_id(env, &GroupRole::DataStore)?;
    let cache_id = group_id(env, &GroupRole::Cache)?;
    let tier_public_id = group_id(env, &GroupRole::Tier(SubnetTier::Public))?;
    let tier_private_id = group_id(env, &GroupRole::Tier(SubnetTier::Private))?;
    let tier_data_id = group_id(env, &GroupRole::Tier(SubnetTier::Data))?;

    let listener = PortRange::single(LISTENER_PORT);
    let service = PortRange::single(SERVICE_PORT);
    let data_port = PortRange::single(DATA_STORE_PORT);
    let cache_port = PortRange::single(CACHE_PORT);

    let mut lb = SecurityGroup::new(lb_id.clone(), GroupRole::LoadBalancer);
    lb.ingress.push(SecurityRule::from_cidr(
        Protocol::Tcp,
        listener,
        CidrBlock::UNRESTRICTED,
    ));
    lb.egress.push(SecurityRule::from_group(
        Protocol::Tcp,
        service,
        compute_id.clone(),
    ));

    let mut compute = SecurityGroup::new(compute_id.clone(), GroupRole::Compute);
    compute
        .ingress
        .push(SecurityRule::from_group(Protocol::Tcp, service, lb_id));
    compute.egress.push(SecurityRule::from_group(
        Protocol::Tcp,
        data_port,
        data_id.clone(),
    ));
    compute.egress.push(SecurityRule::from_group(
        Protocol::Tcp,
        cache_port,
        cache_id.clone(),
    ));
    compute.egress.push(SecurityRule::from_cidr(
        Protocol::Tcp,
        listener,
        CidrBlock::UNRESTRICTED,
    ));

    let mut data_store = SecurityGroup::new(data_id, GroupRole::DataStore);
    data_store.ingress.push(SecurityRule::from_group(
        Protocol::Tcp,
        data_port,
        compute_id.clone(),
    ));

    let mut cache = SecurityGroup::new(cache_id, GroupRole::Cache);
    cache.ingress.push(SecurityRule::from_group(
        Protocol::Tcp,
        cache_port,
        compute_id,
    ));

    let mut tier_public =
        SecurityGroup::new(tier_public_id.clone(), GroupRole::Tier(SubnetTier::Public));
    tier_public.ingress.push(SecurityRule::from_cidr(
        Protocol::Tcp,
        listener,
        CidrBlock::UNRESTRICTED,
    ));

    let mut tier_private =
        SecurityGroup::new(tier_private_id.clone(), GroupRole::Tier(SubnetTier::Private));
    tier_private.ingress.push(SecurityRule::from_group(
        Protocol::Tcp,
        service,
        tier_public_id,
    ));

    let mut tier_data = SecurityGroup::new(tier_data_id, GroupRole::Tier(SubnetTier::Data));
    tier_data.ingress.push(SecurityRule::from_group(
        Protocol::Tcp,
        data_port,
        tier_private_id.clone(),
    ));
    tier_data.ingress.push(SecurityRule::from_group(
        Protocol::Tcp,
        cache_port,
        tier_private_id,
    ));

    Ok(vec![
        lb,
        compute,
        data_store,
        cache,
        tier_public,
        tier_private,
        tier_data,
    ])
}

/// Stateless filter rules for one subnet tier
///
/// Priorities start at `RULE_PRIORITY_STEP` and step by it; the
/// catch-all deny sits at `CATCH_ALL_PRIORITY`. Internet-facing tiers
/// take the ephemeral return-port allowance a stateless layer needs.
/// The data tier instead enumerates each service port per private
/// block, so nothing outside the private tier ever matches an allow.
fn filter_rules_for(
    tier: SubnetTier,
    base: CidrBlock,
    private_blocks: &[CidrBlock],
) -> Vec<FilterRule> {
    let mut rules = Vec::new();

    match tier {
        SubnetTier::Public => {
            rules.push(ingress_allow(
                RULE_PRIORITY_STEP,
                PortRange::single(LISTENER_PORT),
                CidrBlock::UNRESTRICTED,
            ));
            rules.push(ingress_allow(
                2 * RULE_PRIORITY_STEP,
                PortRange::EPHEMERAL,
                CidrBlock::UNRESTRICTED,
            ));
        }
        SubnetTier::Private => {
            rules.push(ingress_allow(RULE_PRIORITY_STEP, PortRange::all(), base));
            rules.push(ingress_allow(
                2 * RULE_PRIORITY_STEP,
                PortRange::EPHEMERAL,
                CidrBlock::UNRESTRICTED,
            ));
        }
        SubnetTier::Data => {
            let mut priority = RULE_PRIORITY_STEP;
            for port in [DATA_STORE_PORT, CACHE_PORT] {
                for block in private_blocks {
                    rules.push(ingress_allow(priority, PortRange::single(port), *block));
                    priority += RULE_PRIORITY_STEP;
                }
            }
        }
    }

    rules.push(FilterRule {
        priority: CATCH_ALL_PRIORITY,
        direction: FlowDirection::Ingress,
        action: FilterAction::Deny,
        protocol: Protocol::Any,
        ports: PortRange::all(),
        source: CidrBlock::UNRESTRICTED,
        destination: CidrBlock::UNRESTRICTED,
    });
    rules.push(FilterRule {
        priority: RULE_PRIORITY_STEP,
        direction: FlowDirection::Egress,
        action: FilterAction::Allow,
        protocol: Protocol::Any,
        ports: PortRange::all(),
        source: CidrBlock::UNRESTRICTED,
        destination: CidrBlock::UNRESTRICTED,
    });
    rules.push(FilterRule {
        priority: CATCH_ALL_PRIORITY,
        direction: FlowDirection::Egress,
        action: FilterAction::Deny,
        protocol: Protocol::Any,
        ports: PortRange::all(),
        source: CidrBlock::UNRESTRICTED,
        destination: CidrBlock::UNRESTRICTED,
    });

    rules
}

fn ingress_allow(priority: u16, ports: PortRange, source: CidrBlock) -> FilterRule {
    FilterRule {
        priority,
        direction: FlowDirection::Ingress,
        action: FilterAction::Allow,
        protocol: Protocol::Tcp,
        ports,
        source,
        destination: CidrBlock::UNRESTRICTED,
    }
}

/// Prove the group-to-group reference graph acyclic
///
/// Ingress references order creation: a rule admitting traffic from
/// another group needs that group to exist first. Kahn's algorithm over
/// those references yields the creation order, smallest id first among
/// the ready set; groups left with unsatisfied references form a cycle.
/// Egress references do not gate creation and are ignored, as are
/// references to groups outside the given set.
pub fn verify_acyclic<'a>(
    groups: impl IntoIterator<Item = &'a SecurityGroup>,
) -> Result<Vec<GroupId>, InternalInvariantError> {
    let groups: Vec<&SecurityGroup> = groups.into_iter().collect();
    let known: BTreeSet<&GroupId> = groups.iter().map(|g| &g.id).collect();

    let mut in_degree: BTreeMap<&GroupId, usize> = BTreeMap::new();
    let mut referenced_by: BTreeMap<&GroupId, BTreeSet<&GroupId>> = BTreeMap::new();
    for group in &groups {
        let refs: BTreeSet<&GroupId> = group
            .ingress_group_refs()
            .filter(|id| known.contains(id))
            .collect();
        in_degree.insert(&group.id, refs.len());
        for referenced in refs {
            referenced_by
                .entry(referenced)
                .or_default()
                .insert(&group.id);
        }
    }

    let mut ready: BTreeSet<&GroupId> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(groups.len());

    loop {
        let Some(id) = ready.iter().next().copied() else {
            break;
        };
        ready.remove(id);
        order.push(id.clone());
        if let Some(dependents) = referenced_by.get(id) {
            for &dependent in dependents {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }
    }

    if order.len() != groups.len() {
        let remaining: Vec<String> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(id, _)| id.to_string())
            .collect();
        return Err(InternalInvariantError::SecurityGroupCycle { groups: remaining });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        evaluate_filters, AvailabilityZone, EnvTier, EnvironmentName, FleetIntent, Flow,
        HealthCheckPath, InstanceShape, ScalingBounds, ScalingMetric,
    };
    use crate::synthesis::topology;

    fn env() -> Environment {
        let tier = EnvTier::Dev;
        Environment {
            name: EnvironmentName::new("dev").unwrap(),
            tier,
            region: "us-east-1".to_string(),
            base_block: CidrBlock::new("10.0.0.0/16").unwrap(),
            zones: vec![AvailabilityZone::numbered(0), AvailabilityZone::numbered(1)],
            profile: tier.compliance_profile(),
            fleet: FleetIntent {
                shape: InstanceShape::new("m5.large").unwrap(),
                bounds: ScalingBounds::new(2, 4, 8).unwrap(),
                health_check_path: HealthCheckPath::new("/healthz").unwrap(),
                scaling_metric: ScalingMetric::CpuUtilization,
            },
            retention_days: 7,
            encryption_required: false,
            blocked_regions: Vec::new(),
            rate_limit_per_window: None,
        }
    }

    fn composed() -> ResourceGraph {
        let environment = env();
        let network = topology::build(&environment).unwrap().network;
        compose(&environment, &network).unwrap()
    }

    #[test]
    fn test_template_has_seven_groups() {
        let fragment = composed();
        let ids: Vec<&str> = fragment
            .security_groups()
            .map(|(_, g)| g.id.as_str())
            .collect();
        assert_eq!(ids.len(), 7);
        assert!(ids.contains(&"sg-dev-load-balancer"));
        assert!(ids.contains(&"sg-dev-compute"));
        assert!(ids.contains(&"sg-dev-tier-data"));
    }

    #[test]
    fn test_only_perimeter_groups_take_unrestricted_ingress() {
        let fragment = composed();
        for (_, group) in fragment.security_groups() {
            let perimeter = matches!(
                group.role,
                GroupRole::LoadBalancer | GroupRole::Tier(SubnetTier::Public)
            );
            assert_eq!(group.has_unrestricted_ingress(), perimeter, "{}", group.id);
        }
    }

    #[test]
    fn test_creation_order_respects_references() {
        let environment = env();
        let network = topology::build(&environment).unwrap().network;
        let fragment = compose(&environment, &network).unwrap();

        let groups: Vec<&SecurityGroup> =
            fragment.security_groups().map(|(_, g)| g).collect();
        let order = verify_acyclic(groups.iter().copied()).unwrap();
        let position = |id: &str| {
            order
                .iter()
                .position(|g| g.as_str() == format!("sg-dev-{id}"))
                .unwrap()
        };

        assert!(position("load-balancer") < position("compute"));
        assert!(position("compute") < position("data-store"));
        assert!(position("compute") < position("cache"));
        assert!(position("tier-public") < position("tier-private"));
        assert!(position("tier-private") < position("tier-data"));
    }

    #[test]
    fn test_mutual_ingress_references_form_a_cycle() {
        let a_id = GroupId::new("sg-a").unwrap();
        let b_id = GroupId::new("sg-b").unwrap();
        let mut a = SecurityGroup::new(a_id.clone(), GroupRole::Compute);
        a.ingress.push(SecurityRule::from_group(
            Protocol::Tcp,
            PortRange::single(443),
            b_id.clone(),
        ));
        let mut b = SecurityGroup::new(b_id, GroupRole::DataStore);
        b.ingress.push(SecurityRule::from_group(
            Protocol::Tcp,
            PortRange::single(443),
            a_id,
        ));

        let err = verify_acyclic([&a, &b]).unwrap_err();
        match err {
            InternalInvariantError::SecurityGroupCycle { groups } => {
                assert_eq!(groups, vec!["sg-a".to_string(), "sg-b".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_data_filters_deny_public_sources() {
        let fragment = composed();
        let (_, rules) = fragment
            .filter_sets()
            .find(|(key, _)| key.as_str().ends_with("data-az1"))
            .unwrap();

        // From a private block the data store port is open
        let allowed = Flow {
            direction: FlowDirection::Ingress,
            protocol: Protocol::Tcp,
            port: DATA_STORE_PORT,
            source: CidrBlock::new("10.0.32.0/20").unwrap(),
            destination: CidrBlock::new("10.0.64.0/20").unwrap(),
        };
        assert_eq!(evaluate_filters(rules, &allowed), Some(FilterAction::Allow));

        // From the public tier it falls through to the catch-all deny
        let denied = Flow {
            source: CidrBlock::new("10.0.0.0/20").unwrap(),
            ..allowed.clone()
        };
        assert_eq!(evaluate_filters(rules, &denied), Some(FilterAction::Deny));
    }

    #[test]
    fn test_every_subnet_gets_a_filter_set() {
        let fragment = composed();
        assert_eq!(fragment.filter_sets().count(), 6);
        for (filter_key, _) in fragment.filter_sets() {
            assert!(fragment
                .outgoing(filter_key)
                .any(|e| e.relation == Relation::AttachedTo));
        }
    }

    #[test]
    fn test_filter_priorities_unique_per_direction() {
        let fragment = composed();
        for (key, rules) in fragment.filter_sets() {
            let mut seen = BTreeSet::new();
            for rule in rules {
                assert!(
                    seen.insert((rule.direction, rule.priority)),
                    "duplicate priority {} in {}",
                    rule.priority,
                    key
                );
            }
        }
    }
}
