// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compliance Validation
//!
//! Read-only inspection of a synthesized graph against the environment's
//! tier profile. The validator never repairs anything: each violation
//! becomes a finding, blocking findings fail the run, advisory ones ride
//! along in the report. Checks that synthesis itself cannot violate still
//! run here, because graphs also arrive deserialized from disk.

pub mod report;

pub use report::{Finding, FindingCode, Report, Severity};

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::domain::{
    evaluate_filters, AvailabilityZone, CidrBlock, Environment, FilterAction, FilterRule,
    Flow, FlowDirection, GroupId, Protocol, RouteTarget, RulePeer, SecurityGroup, Subnet,
    SubnetTier,
};
use crate::graph::{NodeKey, Relation, ResourceGraph, ResourceNode};
use crate::synthesis::security::{verify_acyclic, DATA_STORE_PORT};

/// Validate a synthesized graph against an environment's compliance profile
///
/// Pure: the same graph and environment always produce the same report,
/// findings in check order.
pub fn validate(graph: &ResourceGraph, env: &Environment) -> Report {
    let mut report = Report::new();

    check_placement(env, &mut report);
    check_topology(graph, env, &mut report);
    check_security(graph, &mut report);
    check_fleet(graph, &mut report);
    check_protection(graph, env, &mut report);

    debug!(
        environment = %env.name,
        blocking = report.blocking_count(),
        advisory = report.advisory_count(),
        "compliance validation finished"
    );

    report
}

/// Region residency
fn check_placement(env: &Environment, report: &mut Report) {
    if env.blocked_regions.iter().any(|r| r == &env.region) {
        report.push(Finding::blocking(
            FindingCode::BlockedRegionPlacement,
            format!(
                "environment {} is placed in blocked region {}",
                env.name, env.region
            ),
        ));
    }
}

/// Topology invariants: overlap, containment, routing posture, zone spread
fn check_topology(graph: &ResourceGraph, env: &Environment, report: &mut Report) {
    let subnets: Vec<(&NodeKey, &Subnet)> = graph.subnets().collect();

    for (i, (key, subnet)) in subnets.iter().enumerate() {
        for (_, other) in &subnets[i + 1..] {
            if subnet.block.overlaps(&other.block) {
                report.push(Finding::blocking_at(
                    FindingCode::SubnetOverlap,
                    format!(
                        "subnet {} ({}) overlaps subnet {} ({})",
                        subnet.label(),
                        subnet.block,
                        other.label(),
                        other.block
                    ),
                    (*key).clone(),
                ));
            }
        }
    }

    for (key, subnet) in graph.subnets() {
        if !env.base_block.contains(&subnet.block) {
            report.push(Finding::blocking_at(
                FindingCode::SubnetEscapesNetwork,
                format!(
                    "subnet {} ({}) escapes base block {}",
                    subnet.label(),
                    subnet.block,
                    env.base_block
                ),
                key.clone(),
            ));
        }
        if subnet.tier == SubnetTier::Data && subnet.route != RouteTarget::LocalOnly {
            report.push(Finding::blocking_at(
                FindingCode::DataTierInternetRoute,
                format!(
                    "data subnet {} carries a {} route",
                    subnet.label(),
                    subnet.route
                ),
                key.clone(),
            ));
        }
        if subnet.tier == SubnetTier::Private
            && !graph.outgoing(key).any(|e| e.relation == Relation::RoutesTo)
        {
            report.push(Finding::blocking_at(
                FindingCode::PrivateEgressPathMissing,
                format!("private subnet {} has no egress route", subnet.label()),
                key.clone(),
            ));
        }
    }

    if env.profile.high_availability_required {
        let mut coverage: BTreeMap<SubnetTier, BTreeSet<&AvailabilityZone>> = BTreeMap::new();
        for (_, subnet) in graph.subnets() {
            coverage.entry(subnet.tier).or_default().insert(&subnet.zone);
        }
        for tier in SubnetTier::ALL {
            let zones = coverage.get(&tier).map_or(0, |z| z.len());
            if zones < 2 {
                report.push(Finding::blocking(
                    FindingCode::MissingHaZoneCoverage,
                    format!(
                        "{tier} tier covers {zones} zone(s); the tier profile requires at least 2"
                    ),
                ));
            }
        }
    }
}

/// Security invariants across both enforcement layers
fn check_security(graph: &ResourceGraph, report: &mut Report) {
    if let Err(err) = verify_acyclic(graph.security_groups().map(|(_, g)| g)) {
        report.push(Finding::blocking(
            FindingCode::SecurityGroupCycle,
            err.to_string(),
        ));
    }

    // Data-adjacent groups must never admit the unrestricted block
    for (key, group) in graph.security_groups() {
        if group.role.tier() == SubnetTier::Data && group.has_unrestricted_ingress() {
            report.push(Finding::blocking_at(
                FindingCode::DataTierUnrestrictedIngress,
                format!("group {} admits ingress from 0.0.0.0/0", group.id),
                key.clone(),
            ));
        }
    }

    // Filter priorities must be unique per direction within one set
    for (key, rules) in graph.filter_sets() {
        let mut counts: BTreeMap<(FlowDirection, u16), u32> = BTreeMap::new();
        for rule in rules {
            *counts.entry((rule.direction, rule.priority)).or_insert(0) += 1;
        }
        for ((direction, priority), count) in counts {
            if count > 1 {
                report.push(Finding::blocking_at(
                    FindingCode::DuplicateFilterPriority,
                    format!("priority {priority} assigned to {count} {direction} rules"),
                    key.clone(),
                ));
            }
        }
    }

    let subnet_filters = attached_filters(graph);

    // The perimeter layer repeats the data-tier posture
    for (subnet_key, subnet) in graph.subnets() {
        if subnet.tier != SubnetTier::Data {
            continue;
        }
        let Some(rules) = subnet_filters.get(subnet_key) else {
            continue;
        };
        for rule in rules.iter() {
            if rule.direction == FlowDirection::Ingress
                && rule.action == FilterAction::Allow
                && rule.source.is_unrestricted()
            {
                report.push(Finding::blocking_at(
                    FindingCode::DataTierUnrestrictedIngress,
                    format!(
                        "data subnet {} filter allows ports {} from 0.0.0.0/0",
                        subnet.label(),
                        rule.ports
                    ),
                    subnet_key.clone(),
                ));
            }
        }
    }

    check_flow_agreement(graph, &subnet_filters, report);
}

/// Map each subnet key to the filter rules attached to it
fn attached_filters(graph: &ResourceGraph) -> BTreeMap<&NodeKey, &[FilterRule]> {
    let mut map = BTreeMap::new();
    for (filter_key, rules) in graph.filter_sets() {
        for edge in graph.outgoing(filter_key) {
            if edge.relation == Relation::AttachedTo {
                map.insert(&edge.to, rules);
            }
        }
    }
    map
}

/// Check the two enforcement layers agree on every declared flow
///
/// Each group ingress rule is expanded into concrete flows (group peers
/// resolve to the subnet blocks of the peer role's tier) which the
/// destination subnet's filters must allow. A subnet with no filter set
/// at all is flagged once. Finally the data store port is probed from
/// every public block and must come back denied.
fn check_flow_agreement(
    graph: &ResourceGraph,
    subnet_filters: &BTreeMap<&NodeKey, &[FilterRule]>,
    report: &mut Report,
) {
    let mut tier_blocks: BTreeMap<SubnetTier, Vec<CidrBlock>> = BTreeMap::new();
    for (_, subnet) in graph.subnets() {
        tier_blocks.entry(subnet.tier).or_default().push(subnet.block);
    }
    let groups_by_id: BTreeMap<&GroupId, &SecurityGroup> =
        graph.security_groups().map(|(_, g)| (&g.id, g)).collect();

    for (subnet_key, subnet) in graph.subnets() {
        if !subnet_filters.contains_key(subnet_key) {
            report.push(Finding::blocking_at(
                FindingCode::FilterLayerMismatch,
                format!("subnet {} has no filter set attached", subnet.label()),
                subnet_key.clone(),
            ));
        }
    }

    for (_, group) in graph.security_groups() {
        let dest_tier = group.role.tier();
        for rule in &group.ingress {
            let sources: Vec<CidrBlock> = match &rule.peer {
                RulePeer::Cidr(block) => vec![*block],
                RulePeer::Group(id) => groups_by_id
                    .get(id)
                    .and_then(|peer| tier_blocks.get(&peer.role.tier()))
                    .cloned()
                    .unwrap_or_default(),
            };
            for (subnet_key, subnet) in graph.subnets() {
                if subnet.tier != dest_tier {
                    continue;
                }
                let Some(rules) = subnet_filters.get(subnet_key) else {
                    continue;
                };
                for source in &sources {
                    let flow = Flow {
                        direction: FlowDirection::Ingress,
                        protocol: rule.protocol,
                        port: rule.ports.from(),
                        source: *source,
                        destination: subnet.block,
                    };
                    if evaluate_filters(rules, &flow) != Some(FilterAction::Allow) {
                        report.push(Finding::blocking_at(
                            FindingCode::FilterLayerMismatch,
                            format!(
                                "group {} admits {} port {} from {} but subnet {} filters disagree",
                                group.id,
                                rule.protocol,
                                rule.ports.from(),
                                source,
                                subnet.label()
                            ),
                            subnet_key.clone(),
                        ));
                    }
                }
            }
        }
    }

    let public_blocks = tier_blocks
        .get(&SubnetTier::Public)
        .cloned()
        .unwrap_or_default();
    for (subnet_key, subnet) in graph.subnets() {
        if subnet.tier != SubnetTier::Data {
            continue;
        }
        let Some(rules) = subnet_filters.get(subnet_key) else {
            continue;
        };
        for source in &public_blocks {
            let probe = Flow {
                direction: FlowDirection::Ingress,
                protocol: Protocol::Tcp,
                port: DATA_STORE_PORT,
                source: *source,
                destination: subnet.block,
            };
            if evaluate_filters(rules, &probe) == Some(FilterAction::Allow) {
                report.push(Finding::blocking_at(
                    FindingCode::DataTierUnrestrictedIngress,
                    format!(
                        "data subnet {} accepts the data store port from public block {}",
                        subnet.label(),
                        source
                    ),
                    subnet_key.clone(),
                ));
            }
        }
    }
}

/// Fleet placement and scaling policy invariants
fn check_fleet(graph: &ResourceGraph, report: &mut Report) {
    for (fleet_key, _) in graph.fleets() {
        let mut placements = 0usize;
        for edge in graph.outgoing(fleet_key) {
            if edge.relation != Relation::PlacedIn {
                continue;
            }
            placements += 1;
            if let Some(ResourceNode::Subnet(subnet)) = graph.node(&edge.to) {
                if subnet.tier != SubnetTier::Private {
                    report.push(Finding::blocking_at(
                        FindingCode::NonPrivateFleetPlacement,
                        format!("fleet placed in {} subnet {}", subnet.tier, subnet.label()),
                        fleet_key.clone(),
                    ));
                }
            }
        }
        if placements == 0 {
            report.push(Finding::blocking_at(
                FindingCode::NonPrivateFleetPlacement,
                "fleet has no private subnet placement",
                fleet_key.clone(),
            ));
        }
    }

    for (policy_key, policy) in graph.scaling_policies() {
        let bounds = &policy.bounds;
        // Constructor-checked during synthesis, re-checked for graphs
        // deserialized from disk
        if bounds.min() > bounds.max() || !bounds.admits(bounds.desired()) {
            report.push(Finding::blocking_at(
                FindingCode::ScalingBoundsInverted,
                format!("scaling bounds {bounds} violate min <= desired <= max"),
                policy_key.clone(),
            ));
        }
        if policy.scale_up_threshold <= policy.scale_down_threshold {
            report.push(Finding::blocking_at(
                FindingCode::ScalingThresholdOrder,
                format!(
                    "scale-up threshold {} not above scale-down threshold {}",
                    policy.scale_up_threshold, policy.scale_down_threshold
                ),
                policy_key.clone(),
            ));
        }
        for schedule in &policy.schedules {
            if !bounds.admits(schedule.min_override)
                || !bounds.admits(schedule.desired_override)
                || schedule.min_override > schedule.desired_override
            {
                report.push(Finding::blocking_at(
                    FindingCode::ScheduleOverrideOutOfBounds,
                    format!(
                        "schedule {} overrides {}/{} leave bounds {}",
                        schedule.label, schedule.min_override, schedule.desired_override, bounds
                    ),
                    policy_key.clone(),
                ));
            }
        }
    }
}

/// Encryption and audit floors from the tier profile
fn check_protection(graph: &ResourceGraph, env: &Environment, report: &mut Report) {
    let profile = &env.profile;

    for (key, policy) in graph.encryption_keys() {
        if profile.encryption_at_rest_required && !policy.rotation_enabled {
            report.push(Finding::blocking_at(
                FindingCode::KeyRotationDisabled,
                format!("key {} has rotation disabled", policy.alias),
                key.clone(),
            ));
        }
        if policy.deletion_window_days < profile.min_key_deletion_window_days {
            report.push(Finding::blocking_at(
                FindingCode::KeyDeletionWindowShort,
                format!(
                    "key deletion window {} days below minimum {}",
                    policy.deletion_window_days, profile.min_key_deletion_window_days
                ),
                key.clone(),
            ));
        }
    }

    if graph.audit_trails().next().is_none() {
        report.push(Finding::blocking(
            FindingCode::AuditCoverageGap,
            "no audit trail synthesized for this environment",
        ));
    }
    for (key, binding) in graph.audit_trails() {
        if binding.retention_days < profile.min_retention_days {
            report.push(Finding::blocking_at(
                FindingCode::AuditRetentionShortfall,
                format!(
                    "audit retention {} days below the {} tier minimum of {}",
                    binding.retention_days, env.tier, profile.min_retention_days
                ),
                key.clone(),
            ));
        } else if binding.retention_days < profile.retention_target_days {
            report.push(Finding::advisory_at(
                FindingCode::RetentionBelowTarget,
                format!(
                    "audit retention {} days below the recommended {}",
                    binding.retention_days, profile.retention_target_days
                ),
                key.clone(),
            ));
        }
        if profile.audit_all_management_events && !binding.management_events_covered {
            report.push(Finding::blocking_at(
                FindingCode::AuditCoverageGap,
                "audit trail does not cover management-plane events",
                key.clone(),
            ));
        }
    }

    if profile.encryption_at_rest_required || env.encryption_required {
        if graph.encryption_keys().next().is_none() {
            report.push(Finding::blocking(
                FindingCode::MissingEncryptionBinding,
                "encryption required but no key synthesized",
            ));
        } else {
            for (key, node) in graph.nodes() {
                let wants_binding = matches!(
                    node,
                    ResourceNode::Network { .. }
                        | ResourceNode::Fleet(_)
                        | ResourceNode::AuditTrail(_)
                );
                if wants_binding
                    && !graph
                        .outgoing(key)
                        .any(|e| e.relation == Relation::EncryptedBy)
                {
                    report.push(Finding::blocking_at(
                        FindingCode::MissingEncryptionBinding,
                        format!("{} lacks an encryption binding", node.kind()),
                        key.clone(),
                    ));
                }
            }
        }
    }

    if env.tier.is_production() {
        for (key, lb) in graph.load_balancers() {
            if lb.rate_limit_per_window.is_none() {
                report.push(Finding::advisory_at(
                    FindingCode::RateLimitUnset,
                    "production load balancer has no perimeter rate limit",
                    key.clone(),
                ));
            }
        }
    }
}
