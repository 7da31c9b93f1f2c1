// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Synthesis CLI
//!
//! Reads an environment manifest, synthesizes every declared environment,
//! and writes the canonical graph serialization.
//!
//! Run with: cargo run --bin synthesize -- --config environments.json --out graph.json
//!
//! Exit codes:
//! - 0: synthesis succeeded with no blocking findings
//! - 1: the manifest was rejected or synthesis itself failed; no graph is written
//! - 2: blocking findings were reported; the graph is still written for inspection

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use cim_topology::graph::serialize::{to_mermaid, SerializedGraph};
use cim_topology::service::run_manifest;
use cim_topology::Manifest;

#[derive(Parser, Debug)]
#[command(
    name = "synthesize",
    version,
    about = "Synthesize environment topology and security policy from a manifest"
)]
struct Args {
    /// Environment manifest to synthesize
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    /// Where to write the canonical graph serialization
    #[arg(long, value_name = "FILE")]
    out: PathBuf,

    /// Also write a Mermaid rendering of the combined graph
    #[arg(long, value_name = "FILE")]
    mermaid: Option<PathBuf>,

    /// Also write the findings report as JSON
    #[arg(long, value_name = "FILE")]
    report_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Diagnostics go to stderr; stdout carries the findings report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let manifest = Manifest::from_file(&args.config)
        .with_context(|| format!("loading manifest {}", args.config.display()))?;

    let summary = run_manifest(&manifest).await.context("synthesis failed")?;

    // The graph is written even when findings block: inspecting the
    // planned output is how a blocking finding gets fixed.
    let graph_json = SerializedGraph::from_graph(&summary.graph)
        .to_canonical_json()
        .context("serializing resource graph")?;
    fs::write(&args.out, graph_json)
        .with_context(|| format!("writing graph to {}", args.out.display()))?;

    if let Some(path) = &args.mermaid {
        fs::write(path, to_mermaid(&summary.graph))
            .with_context(|| format!("writing diagram to {}", path.display()))?;
    }

    if let Some(path) = &args.report_json {
        let mut report_json =
            serde_json::to_string_pretty(&summary.report).context("serializing report")?;
        report_json.push('\n');
        fs::write(path, report_json)
            .with_context(|| format!("writing report to {}", path.display()))?;
    }

    for outcome in &summary.outcomes {
        println!(
            "{} ({}): {} nodes, {} blocking, {} advisory",
            outcome.name,
            outcome.tier,
            outcome.node_count,
            outcome.blocking_findings,
            outcome.advisory_findings
        );
    }
    print!("{}", summary.report.render_text());

    if summary.has_blocking() {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
