//! Declarative synthesis of environment topology and security policy
//!
//! A manifest of environment intents goes in; a deterministic resource
//! graph and a compliance report come out. Synthesis is pure planning:
//! subnets are carved, security policy composed, fleets sized, and
//! protection bound, with every objection surfaced as a report finding
//! rather than a provisioning surprise.
//!
//! The pipeline per environment:
//!
//! ```text
//! Manifest → Environment → encryption → topology → security → fleet
//!                                                     ↓
//!                                        compliance validation → Report
//! ```
//!
//! Running the same manifest twice yields byte-identical graph output;
//! see [`graph::serialize`].

pub mod compliance;
pub mod config;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod service;
pub mod synthesis;

// Re-export commonly used types
pub use compliance::{Finding, FindingCode, Report, Severity};
pub use config::Manifest;
pub use errors::{ConfigError, InternalInvariantError, SynthesisError, SynthesisResult};
pub use graph::serialize::SerializedGraph;
pub use graph::{Edge, NodeKey, Relation, ResourceGraph, ResourceNode};
pub use service::{run_environments, run_manifest, RunSummary};
pub use synthesis::{synthesize_environment, EnvironmentSynthesis};
