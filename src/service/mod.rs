// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for Topology Synthesis
//!
//! This module orchestrates whole synthesis runs: many environments in,
//! one combined graph and compliance report out.
//!
//! # Architecture
//!
//! ```text
//! Manifest (JSON)
//!     ↓
//! Service Layer (this module)
//!     ↓
//! Per-Environment Synthesis (parallel tasks)
//!     ↓
//! Combined Graph + Aggregate Report
//!     ↓
//! Reconciler (optional apply seam)
//! ```
//!
//! # Design Principles
//!
//! 1. **Determinism**: results join in manifest order, never task order
//! 2. **Isolation**: one environment's failure fails the run whole
//! 3. **Pure Synthesis**: services coordinate; stages stay pure functions
//! 4. **Plan, Don't Provision**: applying a graph is behind [`Reconciler`]
//!
//! # Example
//!
//! ```rust,ignore
//! use cim_topology::config::Manifest;
//! use cim_topology::service::run_manifest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manifest = Manifest::from_file("environments.json")?;
//!     let summary = run_manifest(&manifest).await?;
//!
//!     println!("{}", summary.report.render_text());
//!
//!     Ok(())
//! }
//! ```

pub mod reconcile;
pub mod run;

pub use reconcile::{reconcile, ApplyStatus, DryRunReconciler, ReconcileStats, Reconciler};
pub use run::{
    run_environments, run_manifest, EnvironmentOutcome, RunSummary, ServiceError, ServiceResult,
};
