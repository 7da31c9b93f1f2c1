// Copyright (c) 2025 - Cowboy AI, Inc.
//! Synthesis Pipeline
//!
//! Stage order is fixed: encryption binding first so later stages can
//! hang edges off the environment key, then topology, security, and the
//! compute fleet. Each stage returns a graph fragment that is merged
//! into the environment graph; edge integrity and compliance validation
//! run once after the final merge.
//!
//! Fatal errors ([`InternalInvariantError`]) abort the pipeline; policy
//! violations become report findings and never do.

pub mod encryption;
pub mod fleet;
pub mod security;
pub mod topology;

use std::fmt;

use tracing::{debug, info};

use crate::compliance::{self, Report};
use crate::domain::Environment;
use crate::errors::{InternalInvariantError, SynthesisResult};
use crate::graph::ResourceGraph;

/// Everything one environment's synthesis run produces
#[derive(Debug, Clone)]
pub struct EnvironmentSynthesis {
    /// The environment as resolved from configuration
    pub environment: Environment,
    /// The synthesized resource graph
    pub graph: ResourceGraph,
    /// Compliance findings, stage findings first
    pub report: Report,
}

/// Run the full synthesis pipeline for one environment
pub fn synthesize_environment(env: &Environment) -> SynthesisResult<EnvironmentSynthesis> {
    debug!(environment = %env.name, tier = %env.tier, "starting synthesis");

    let mut graph = ResourceGraph::new();
    let mut report = Report::new();

    graph.merge(encryption::bind(env)?)?;

    let topology = topology::build(env)?;
    report.extend(topology.findings);
    graph.merge(topology.fragment)?;

    graph.merge(security::compose(env, &topology.network)?)?;
    graph.merge(fleet::synthesize(env, &topology.network)?)?;

    graph.verify_integrity()?;
    report.merge(compliance::validate(&graph, env));

    info!(
        environment = %env.name,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        blocking = report.blocking_count(),
        advisory = report.advisory_count(),
        "environment synthesis complete"
    );

    Ok(EnvironmentSynthesis {
        environment: env.clone(),
        graph,
        report,
    })
}

/// Wrap a constructor rejection of a value synthesis itself produced
pub(crate) fn construction_error<E: fmt::Display>(
    what: &'static str,
) -> impl Fn(E) -> InternalInvariantError {
    move |err| InternalInvariantError::InvalidConstruction {
        what,
        detail: err.to_string(),
    }
}

/// Stable node key constructors
///
/// Every stage derives keys through these, so edges can point at nodes
/// another fragment contributes without sharing state.
pub mod keys {
    use crate::domain::{AvailabilityZone, EnvironmentName, GroupRole, SubnetTier};
    use crate::graph::NodeKey;

    /// "env/{name}/network"
    pub fn network(env: &EnvironmentName) -> NodeKey {
        NodeKey::scoped(env, &["network"])
    }

    /// "env/{name}/subnet/{tier}-{zone}"
    pub fn subnet(env: &EnvironmentName, tier: SubnetTier, zone: &AvailabilityZone) -> NodeKey {
        let label = format!("{tier}-{zone}");
        NodeKey::scoped(env, &["subnet", &label])
    }

    /// "env/{name}/igw"
    pub fn internet_gateway(env: &EnvironmentName) -> NodeKey {
        NodeKey::scoped(env, &["igw"])
    }

    /// "env/{name}/nat/{zone}"
    pub fn nat_gateway(env: &EnvironmentName, zone: &AvailabilityZone) -> NodeKey {
        NodeKey::scoped(env, &["nat", zone.as_str()])
    }

    /// "env/{name}/sg/{role}"
    pub fn security_group(env: &EnvironmentName, role: &GroupRole) -> NodeKey {
        NodeKey::scoped(env, &["sg", &role.label()])
    }

    /// "env/{name}/filter/{subnet label}"
    pub fn filter_set(env: &EnvironmentName, subnet_label: &str) -> NodeKey {
        NodeKey::scoped(env, &["filter", subnet_label])
    }

    /// "env/{name}/fleet"
    pub fn fleet(env: &EnvironmentName) -> NodeKey {
        NodeKey::scoped(env, &["fleet"])
    }

    /// "env/{name}/lb"
    pub fn load_balancer(env: &EnvironmentName) -> NodeKey {
        NodeKey::scoped(env, &["lb"])
    }

    /// "env/{name}/tg"
    pub fn target_group(env: &EnvironmentName) -> NodeKey {
        NodeKey::scoped(env, &["tg"])
    }

    /// "env/{name}/scaling"
    pub fn scaling_policy(env: &EnvironmentName) -> NodeKey {
        NodeKey::scoped(env, &["scaling"])
    }

    /// "env/{name}/key"
    pub fn encryption_key(env: &EnvironmentName) -> NodeKey {
        NodeKey::scoped(env, &["key"])
    }

    /// "env/{name}/audit"
    pub fn audit_trail(env: &EnvironmentName) -> NodeKey {
        NodeKey::scoped(env, &["audit"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AvailabilityZone, CidrBlock, EnvTier, EnvironmentName, FleetIntent, HealthCheckPath,
        InstanceShape, ScalingBounds, ScalingMetric,
    };

    fn env(tier: EnvTier) -> Environment {
        Environment {
            name: EnvironmentName::new("checkout").unwrap(),
            tier,
            region: "us-east-1".to_string(),
            base_block: CidrBlock::new("10.4.0.0/16").unwrap(),
            zones: vec![
                AvailabilityZone::numbered(0),
                AvailabilityZone::numbered(1),
                AvailabilityZone::numbered(2),
            ],
            profile: tier.compliance_profile(),
            fleet: FleetIntent {
                shape: InstanceShape::new("c6g.xlarge").unwrap(),
                bounds: ScalingBounds::new(3, 7, 12).unwrap(),
                health_check_path: HealthCheckPath::new("/healthz").unwrap(),
                scaling_metric: ScalingMetric::CpuUtilization,
            },
            retention_days: 365,
            encryption_required: true,
            blocked_regions: Vec::new(),
            rate_limit_per_window: Some(5000),
        }
    }

    #[test]
    fn test_pipeline_produces_clean_prod_run() {
        let synthesis = synthesize_environment(&env(EnvTier::Prod)).unwrap();

        assert!(!synthesis.report.has_blocking(), "{:?}", synthesis.report);
        // network + igw + 9 subnets + 3 NATs + 7 groups + 9 filter sets
        // + fleet + lb + tg + scaling + key + audit
        assert_eq!(synthesis.graph.node_count(), 36);
        synthesis.graph.verify_integrity().unwrap();
    }

    #[test]
    fn test_every_edge_endpoint_resolves() {
        let synthesis = synthesize_environment(&env(EnvTier::Dev)).unwrap();
        for edge in synthesis.graph.edges() {
            assert!(synthesis.graph.node(&edge.from).is_some(), "{}", edge.from);
            assert!(synthesis.graph.node(&edge.to).is_some(), "{}", edge.to);
        }
    }

    #[test]
    fn test_stage_findings_precede_validator_findings() {
        let mut environment = env(EnvTier::Dev);
        // A /27 yields two /28 slots against the nine the plan needs
        environment.base_block = CidrBlock::new("10.4.0.32/27").unwrap();

        let synthesis = synthesize_environment(&environment).unwrap();
        let first = &synthesis.report.findings()[0];
        assert_eq!(
            first.code,
            crate::compliance::FindingCode::AddressSpaceExhausted
        );
    }
}
