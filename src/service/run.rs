// Copyright (c) 2025 - Cowboy AI, Inc.
//! Multi-Environment Synthesis Runs
//!
//! Orchestrates synthesis across every environment a manifest declares.
//! Environments are independent by construction (every node key carries
//! the environment name), so each one synthesizes on its own blocking
//! task and the results join back in manifest order.
//!
//! # Run Semantics
//!
//! 1. Resolve the manifest into typed environments
//! 2. Spawn one synthesis task per environment
//! 3. Join tasks in manifest order
//! 4. Merge graphs and reports into one [`RunSummary`]
//!
//! Joining in manifest order keeps the combined output independent of
//! how the scheduler interleaves the tasks: the merged graph and the
//! aggregate report depend only on the manifest, never on timing.
//!
//! Run identity (`run_id`, completion time) lives on the summary, not
//! in the graph, so repeated runs over the same manifest still produce
//! byte-identical graph serializations.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info};
use uuid::Uuid;

use crate::compliance::Report;
use crate::config::Manifest;
use crate::domain::{EnvTier, Environment, EnvironmentName};
use crate::errors::{ConfigError, InternalInvariantError, SynthesisError};
use crate::graph::ResourceGraph;
use crate::synthesis::synthesize_environment;

/// Service layer result type
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service layer errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Manifest was rejected before any synthesis started
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Synthesis failed for one environment
    #[error("environment {environment}: {source}")]
    Environment {
        environment: String,
        #[source]
        source: SynthesisError,
    },

    /// A synthesis task was cancelled or panicked
    #[error("synthesis task for environment {0} did not complete")]
    TaskFailed(String),

    /// Combining per-environment results violated a graph invariant
    #[error(transparent)]
    Internal(#[from] InternalInvariantError),
}

/// What one environment contributed to a run
#[derive(Debug, Clone)]
pub struct EnvironmentOutcome {
    pub name: EnvironmentName,
    pub tier: EnvTier,
    /// Nodes this environment added to the combined graph
    pub node_count: usize,
    pub blocking_findings: usize,
    pub advisory_findings: usize,
}

/// The result of synthesizing a whole manifest
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Identifies this run in logs; never enters the graph
    pub run_id: Uuid,
    /// When the run finished
    pub completed_at: DateTime<Utc>,
    /// Per-environment outcomes in manifest order
    pub outcomes: Vec<EnvironmentOutcome>,
    /// Every environment's resources in one graph
    pub graph: ResourceGraph,
    /// Aggregate findings across every environment
    pub report: Report,
}

impl RunSummary {
    /// Whether any environment produced a blocking finding
    pub fn has_blocking(&self) -> bool {
        self.report.has_blocking()
    }
}

/// Synthesize every environment a manifest declares
pub async fn run_manifest(manifest: &Manifest) -> ServiceResult<RunSummary> {
    let environments = manifest.resolve()?;
    run_environments(environments).await
}

/// Synthesize a list of already-resolved environments
///
/// Synthesis is pure computation, so each environment runs on a
/// blocking worker rather than the async reactor. A failure in any
/// environment fails the whole run; partial combined graphs are never
/// returned.
pub async fn run_environments(environments: Vec<Environment>) -> ServiceResult<RunSummary> {
    let run_id = Uuid::now_v7();
    debug!(%run_id, environments = environments.len(), "starting synthesis run");

    let mut names = Vec::with_capacity(environments.len());
    let mut handles = Vec::with_capacity(environments.len());
    for environment in environments {
        names.push(environment.name.clone());
        handles.push(tokio::task::spawn_blocking(move || {
            synthesize_environment(&environment)
        }));
    }
    // join_all preserves input order, so the merge below is manifest order
    let joined = join_all(handles).await;

    let mut graph = ResourceGraph::new();
    let mut report = Report::new();
    let mut outcomes = Vec::with_capacity(names.len());
    for (name, task_result) in names.into_iter().zip(joined) {
        let synthesis = task_result
            .map_err(|_| ServiceError::TaskFailed(name.to_string()))?
            .map_err(|source| ServiceError::Environment {
                environment: name.to_string(),
                source,
            })?;

        outcomes.push(EnvironmentOutcome {
            name: synthesis.environment.name.clone(),
            tier: synthesis.environment.tier,
            node_count: synthesis.graph.node_count(),
            blocking_findings: synthesis.report.blocking_count(),
            advisory_findings: synthesis.report.advisory_count(),
        });
        graph.merge(synthesis.graph)?;
        report.merge(synthesis.report);
    }

    // Keys are environment-scoped so the merge cannot collide; integrity
    // re-checks every edge against the combined node set.
    graph.verify_integrity()?;

    info!(
        %run_id,
        environments = outcomes.len(),
        nodes = graph.node_count(),
        blocking = report.blocking_count(),
        advisory = report.advisory_count(),
        "synthesis run complete"
    );

    Ok(RunSummary {
        run_id,
        completed_at: Utc::now(),
        outcomes,
        graph,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_env_manifest() -> Manifest {
        Manifest::from_json(
            r#"{
                "environments": [
                    {
                        "environment_name": "dev",
                        "tier": "dev",
                        "base_block": "10.0.0.0/16",
                        "az_count": 1,
                        "instance_shape": "t3.medium",
                        "min_size": 1,
                        "max_size": 2
                    },
                    {
                        "environment_name": "prod",
                        "tier": "prod",
                        "base_block": "10.1.0.0/16",
                        "az_count": 3,
                        "instance_shape": "m5.large",
                        "min_size": 3,
                        "max_size": 12,
                        "rate_limit_per_window": 2000
                    }
                ]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_joins_in_manifest_order() {
        let summary = run_manifest(&two_env_manifest()).await.unwrap();
        let names: Vec<&str> = summary.outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["dev", "prod"]);
    }

    #[tokio::test]
    async fn test_run_merges_graphs_and_reports() {
        let summary = run_manifest(&two_env_manifest()).await.unwrap();

        // One zone carves 3 subnets; three zones carve 9 with a NAT each.
        assert_eq!(summary.outcomes[0].node_count, 22);
        assert_eq!(summary.outcomes[1].node_count, 36);

        let total: usize = summary.outcomes.iter().map(|o| o.node_count).sum();
        assert_eq!(summary.graph.node_count(), total);
        assert!(!summary.has_blocking());
    }

    #[tokio::test]
    async fn test_environment_keys_never_collide() {
        let summary = run_manifest(&two_env_manifest()).await.unwrap();
        let dev_nodes = summary
            .graph
            .nodes()
            .filter(|(key, _)| key.as_str().starts_with("env/dev/"))
            .count();
        let prod_nodes = summary
            .graph
            .nodes()
            .filter(|(key, _)| key.as_str().starts_with("env/prod/"))
            .count();
        assert_eq!(dev_nodes, summary.outcomes[0].node_count);
        assert_eq!(prod_nodes, summary.outcomes[1].node_count);
    }

    #[tokio::test]
    async fn test_empty_manifest_is_config_error() {
        let manifest = Manifest::from_json(r#"{"environments": []}"#).unwrap();
        let err = run_manifest(&manifest).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Config(ConfigError::EmptyManifest)
        ));
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::TaskFailed("prod".into());
        assert!(err.to_string().contains("prod"));
    }
}
