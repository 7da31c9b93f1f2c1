// Copyright (c) 2025 - Cowboy AI, Inc.
//! Environment Manifest Loading and Resolution
//!
//! The manifest is the single input of a synthesis run: a JSON document
//! declaring one or more environments. Loading is a pure parse with
//! eager validation: every malformed field fails here with a precise
//! `ConfigError` instead of surfacing somewhere mid-pipeline. Unknown
//! fields are rejected so a typo never silently becomes a default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

use crate::domain::{
    AvailabilityZone, CidrBlock, EnvTier, Environment, EnvironmentName, FleetIntent,
    HealthCheckPath, InstanceShape, ScalingBounds, ScalingMetric,
};
use crate::errors::ConfigError;

/// Region applied when the manifest leaves `region` unset
pub const DEFAULT_REGION: &str = "us-east-1";

/// Health check path applied when the manifest leaves it unset
pub const DEFAULT_HEALTH_CHECK_PATH: &str = "/healthz";

/// The top-level manifest: one entry per environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub environments: Vec<EnvironmentConfig>,
}

/// One environment's declared intent, before resolution
///
/// Required fields have no serde default; everything else falls back to
/// a tier-derived or fixed default during [`resolve`].
///
/// [`resolve`]: EnvironmentConfig::resolve
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    pub environment_name: String,
    pub tier: EnvTier,
    pub base_block: String,
    pub az_count: u32,
    /// Explicit zone labels; length must equal `az_count`
    #[serde(default)]
    pub zones: Option<Vec<String>>,
    #[serde(default)]
    pub region: Option<String>,
    pub instance_shape: String,
    pub min_size: u32,
    #[serde(default)]
    pub desired_size: Option<u32>,
    pub max_size: u32,
    /// Audit retention in days; defaults to the tier minimum
    #[serde(default)]
    pub retention_days: Option<u32>,
    /// Defaults to the tier's encryption requirement
    #[serde(default)]
    pub encryption_required: Option<bool>,
    #[serde(default)]
    pub blocked_regions: Vec<String>,
    #[serde(default)]
    pub rate_limit_per_window: Option<u32>,
    #[serde(default)]
    pub health_check_path: Option<String>,
    #[serde(default)]
    pub scaling_metric: Option<ScalingMetric>,
}

impl Manifest {
    /// Parse a manifest from JSON text
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a manifest file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Resolve every entry into a typed [`Environment`]
    ///
    /// Entries resolve in manifest order; that order is also the
    /// aggregation order for multi-environment synthesis.
    pub fn resolve(&self) -> Result<Vec<Environment>, ConfigError> {
        if self.environments.is_empty() {
            return Err(ConfigError::EmptyManifest);
        }

        let mut seen = BTreeSet::new();
        let mut environments = Vec::with_capacity(self.environments.len());
        for config in &self.environments {
            let environment = config.resolve()?;
            if !seen.insert(environment.name.clone()) {
                return Err(ConfigError::DuplicateEnvironment(
                    environment.name.to_string(),
                ));
            }
            debug!(
                name = %environment.name,
                tier = %environment.tier,
                zones = environment.zone_count(),
                "resolved environment"
            );
            environments.push(environment);
        }
        Ok(environments)
    }
}

impl EnvironmentConfig {
    /// Resolve this entry into a typed [`Environment`] with defaults applied
    pub fn resolve(&self) -> Result<Environment, ConfigError> {
        let name = EnvironmentName::new(&self.environment_name).map_err(|source| {
            ConfigError::InvalidField {
                field: "environment_name",
                source: source.into(),
            }
        })?;

        let base_block =
            CidrBlock::new(&self.base_block).map_err(|source| ConfigError::MalformedAddressBlock {
                value: self.base_block.clone(),
                source,
            })?;

        if self.az_count < 1 {
            return Err(ConfigError::InvalidZoneCount(self.az_count));
        }

        let zones = match &self.zones {
            Some(labels) => {
                if labels.len() != self.az_count as usize {
                    return Err(ConfigError::ZoneListMismatch {
                        declared: labels.len(),
                        az_count: self.az_count,
                    });
                }
                labels
                    .iter()
                    .map(AvailabilityZone::new)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|source| ConfigError::InvalidField {
                        field: "zones",
                        source: source.into(),
                    })?
            }
            None => (0..self.az_count as usize)
                .map(AvailabilityZone::numbered)
                .collect(),
        };

        if self.min_size > self.max_size {
            return Err(ConfigError::InvalidScalingBounds {
                min: self.min_size,
                max: self.max_size,
            });
        }
        let bounds = ScalingBounds::resolve(self.min_size, self.desired_size, self.max_size)
            .map_err(|source| ConfigError::InvalidField {
                field: "desired_size",
                source: source.into(),
            })?;

        let shape = InstanceShape::new(&self.instance_shape).map_err(|source| {
            ConfigError::InvalidField {
                field: "instance_shape",
                source: source.into(),
            }
        })?;

        let health_check_path = HealthCheckPath::new(
            self.health_check_path
                .as_deref()
                .unwrap_or(DEFAULT_HEALTH_CHECK_PATH),
        )
        .map_err(|source| ConfigError::InvalidField {
            field: "health_check_path",
            source: source.into(),
        })?;

        let profile = self.tier.compliance_profile();

        Ok(Environment {
            name,
            tier: self.tier,
            region: self
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            base_block,
            zones,
            profile,
            fleet: FleetIntent {
                shape,
                bounds,
                health_check_path,
                scaling_metric: self.scaling_metric.unwrap_or_default(),
            },
            retention_days: self.retention_days.unwrap_or(profile.min_retention_days),
            encryption_required: self
                .encryption_required
                .unwrap_or(profile.encryption_at_rest_required),
            blocked_regions: self.blocked_regions.clone(),
            rate_limit_per_window: self.rate_limit_per_window,
        })
    }
}
