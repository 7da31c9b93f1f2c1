//! Error types for topology synthesis
//!
//! Two failure families are fatal and surface as Rust errors: rejected
//! input (`ConfigError`) and defects in the synthesis algorithms
//! themselves (`InternalInvariantError`). Everything else a run can
//! object to is collected as a `compliance::Finding` in the report and
//! never aborts synthesis.

use thiserror::Error;

use crate::domain::cidr::CidrError;
use crate::domain::DomainError;

/// Errors raised while loading and resolving the environment manifest.
///
/// All of these abort the run before any synthesis happens; no graph
/// is produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Manifest file could not be read
    #[error("cannot read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid JSON or does not match the schema
    #[error("manifest parse error: {0}")]
    Parse(String),

    /// Manifest declares no environments
    #[error("manifest declares no environments")]
    EmptyManifest,

    /// Two environments share a name
    #[error("duplicate environment name: {0}")]
    DuplicateEnvironment(String),

    /// Base address block is not a valid canonical CIDR
    #[error("malformed address block {value}: {source}")]
    MalformedAddressBlock {
        value: String,
        #[source]
        source: CidrError,
    },

    /// Availability zone count must be at least 1
    #[error("az_count must be at least 1, got {0}")]
    InvalidZoneCount(u32),

    /// Explicit zone list disagrees with az_count
    #[error("zones lists {declared} labels but az_count is {az_count}")]
    ZoneListMismatch { declared: usize, az_count: u32 },

    /// Fleet scaling bounds are inverted
    #[error("min_size {min} exceeds max_size {max}")]
    InvalidScalingBounds { min: u32, max: u32 },

    /// A manifest field failed value-object validation
    #[error("invalid {field}: {source}")]
    InvalidField {
        field: &'static str,
        #[source]
        source: DomainError,
    },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Defects in the synthesis algorithms themselves.
///
/// Never expected from any input, valid or not, and never caught
/// internally: these propagate out as a bug signal, distinct from
/// user-fixable findings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InternalInvariantError {
    /// Two synthesis stages produced the same node key
    #[error("duplicate node key in resource graph: {0}")]
    DuplicateNode(String),

    /// An edge references a node absent from the graph
    #[error("edge endpoint missing from graph: {0}")]
    DanglingEdge(String),

    /// Merging graph fragments collided on a node key
    #[error("graph fragment merge collision on key: {0}")]
    MergeCollision(String),

    /// The security-group reference graph contains a cycle
    #[error("security group reference cycle among: {}", groups.join(", "))]
    SecurityGroupCycle { groups: Vec<String> },

    /// A stage built a domain value that failed its own validation
    #[error("synthesis produced an invalid {what}: {detail}")]
    InvalidConstruction { what: &'static str, detail: String },
}

/// Top-level synthesis failure
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Input was rejected before synthesis began
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A synthesis algorithm violated one of its own invariants
    #[error(transparent)]
    Internal(#[from] InternalInvariantError),

    /// Graph serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SynthesisError {
    fn from(err: serde_json::Error) -> Self {
        SynthesisError::Serialization(err.to_string())
    }
}

/// Result type for synthesis operations
pub type SynthesisResult<T> = Result<T, SynthesisError>;
