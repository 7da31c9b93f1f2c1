// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer Integration Tests
//!
//! Exercises whole synthesis runs through the public service API:
//! - Aggregation of findings across independently synthesized environments
//! - Per-environment outcome attribution in the run summary
//! - Reconciliation walks over the combined graph

use anyhow::{Context, Result};

use cim_topology::service::{reconcile, run_manifest, DryRunReconciler};
use cim_topology::{FindingCode, Manifest, Severity};

fn mixed_manifest() -> Manifest {
    // "prod-short" declares 30 retention days against the prod minimum of 90
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
                    "environment_name": "prod-short",
                    "tier": "prod",
                    "base_block": "10.1.0.0/16",
                    "az_count": 2,
                    "instance_shape": "m5.large",
                    "min_size": 3,
                    "max_size": 12,
                    "retention_days": 30,
                    "rate_limit_per_window": 2000
                }
            ]
        }"#,
    )
    .unwrap()
}

#[tokio::test]
async fn test_blocking_findings_attribute_to_their_environment() -> Result<()> {
    let summary = run_manifest(&mixed_manifest()).await?;

    assert!(summary.has_blocking());
    assert_eq!(summary.outcomes[0].blocking_findings, 0);
    assert_eq!(summary.outcomes[1].blocking_findings, 1);

    let finding = summary
        .report
        .blocking()
        .next()
        .context("no blocking finding in aggregate report")?;
    assert_eq!(finding.severity, Severity::Blocking);
    assert_eq!(finding.code, FindingCode::AuditRetentionShortfall);
    let node = finding.node_ref.as_ref().context("finding lacks a node")?;
    assert!(node.as_str().starts_with("env/prod-short/"));
    Ok(())
}

#[tokio::test]
async fn test_one_environment_blocking_still_yields_full_graph() -> Result<()> {
    let summary = run_manifest(&mixed_manifest()).await?;

    // Both environments synthesize completely; findings never truncate
    let total: usize = summary.outcomes.iter().map(|o| o.node_count).sum();
    assert_eq!(summary.graph.node_count(), total);
    summary.graph.verify_integrity()?;
    Ok(())
}

#[tokio::test]
async fn test_reconcile_walks_the_combined_graph() -> Result<()> {
    let summary = run_manifest(&mixed_manifest()).await?;

    let stats = reconcile(&summary.graph, &DryRunReconciler).await?;
    assert_eq!(stats.total(), summary.graph.node_count());
    assert_eq!(stats.unchanged, summary.graph.node_count());
    assert!(stats.is_clean());
    Ok(())
}
