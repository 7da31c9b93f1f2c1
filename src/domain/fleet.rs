// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute Fleet, Scaling, and Load Balancer Value Objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::security::GroupId;

/// Fleet validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FleetError {
    #[error("Scaling bounds inverted: min {min} exceeds max {max}")]
    BoundsInverted { min: u32, max: u32 },

    #[error("Desired size {desired} outside bounds {min}..={max}")]
    DesiredOutOfBounds { desired: u32, min: u32, max: u32 },

    #[error("Scale-up threshold {up} must be strictly greater than scale-down threshold {down}")]
    ThresholdsNotOrdered { up: u32, down: u32 },

    #[error("Instance shape is empty")]
    EmptyInstanceShape,

    #[error("Invalid character in instance shape: {0}")]
    InvalidInstanceShapeCharacter(char),

    #[error("Health check path must start with '/': {0}")]
    InvalidHealthCheckPath(String),

    #[error("Schedule hour {0} out of range (0-23)")]
    InvalidScheduleHour(u8),
}

/// Instance shape value object, e.g. "m5.large"
///
/// Invariants:
/// - Non-empty, at most 32 characters
/// - Lowercase alphanumerics, dots, and hyphens only
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceShape(String);

impl InstanceShape {
    /// Maximum shape length
    pub const MAX_LENGTH: usize = 32;

    /// Create a new instance shape with validation
    pub fn new(shape: impl Into<String>) -> Result<Self, FleetError> {
        let shape = shape.into();

        if shape.is_empty() || shape.len() > Self::MAX_LENGTH {
            return Err(FleetError::EmptyInstanceShape);
        }
        for ch in shape.chars() {
            if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && ch != '.' && ch != '-' {
                return Err(FleetError::InvalidInstanceShapeCharacter(ch));
            }
        }

        Ok(Self(shape))
    }

    /// Get the shape as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstanceShape {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Health check path value object
///
/// Invariants:
/// - Starts with '/'
/// - No whitespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthCheckPath(String);

impl HealthCheckPath {
    /// Create a new health check path with validation
    pub fn new(path: impl Into<String>) -> Result<Self, FleetError> {
        let path = path.into();

        if !path.starts_with('/') || path.chars().any(|c| c.is_whitespace()) {
            return Err(FleetError::InvalidHealthCheckPath(path));
        }

        Ok(Self(path))
    }

    /// Get the path as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HealthCheckPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HealthCheckPath {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The metric a target-tracking scaling rule follows
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum ScalingMetric {
    #[default]
    CpuUtilization,
    RequestCountPerTarget,
}

impl ScalingMetric {
    /// Get the metric as its canonical kebab-case label
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingMetric::CpuUtilization => "cpu-utilization",
            ScalingMetric::RequestCountPerTarget => "request-count-per-target",
        }
    }
}

impl fmt::Display for ScalingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated fleet capacity bounds
///
/// Invariants:
/// - `min <= desired <= max`
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::ScalingBounds;
///
/// // Unset desired defaults to the midpoint, rounded toward min
/// let bounds = ScalingBounds::resolve(3, None, 12).unwrap();
/// assert_eq!(bounds.desired(), 7);
///
/// assert!(ScalingBounds::new(5, 2, 10).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ScalingBounds {
    min: u32,
    desired: u32,
    max: u32,
}

impl ScalingBounds {
    /// Create bounds with validation
    ///
    /// # Invariants
    /// - `min <= desired <= max`
    pub fn new(min: u32, desired: u32, max: u32) -> Result<Self, FleetError> {
        if min > max {
            return Err(FleetError::BoundsInverted { min, max });
        }
        if desired < min || desired > max {
            return Err(FleetError::DesiredOutOfBounds { desired, min, max });
        }
        Ok(Self { min, desired, max })
    }

    /// Create bounds, defaulting an unset desired size
    ///
    /// The default is `min + (max - min) / 2`: the midpoint with integer
    /// division, so an odd span rounds toward `min`.
    pub fn resolve(min: u32, desired: Option<u32>, max: u32) -> Result<Self, FleetError> {
        if min > max {
            return Err(FleetError::BoundsInverted { min, max });
        }
        let desired = desired.unwrap_or(min + (max - min) / 2);
        Self::new(min, desired, max)
    }

    /// Minimum instance count
    pub fn min(&self) -> u32 {
        self.min
    }

    /// Desired instance count
    pub fn desired(&self) -> u32 {
        self.desired
    }

    /// Maximum instance count
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Check whether a capacity value lies inside the bounds
    pub fn admits(&self, capacity: u32) -> bool {
        self.min <= capacity && capacity <= self.max
    }
}

impl fmt::Display for ScalingBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.min, self.desired, self.max)
    }
}

/// Days a scheduled action fires on
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleDays {
    Weekdays,
    Weekends,
    Daily,
}

impl ScheduleDays {
    /// Get the day set as its canonical lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleDays::Weekdays => "weekdays",
            ScheduleDays::Weekends => "weekends",
            ScheduleDays::Daily => "daily",
        }
    }
}

impl fmt::Display for ScheduleDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A time-windowed capacity override
///
/// Schedules are UTC only, at whole-hour granularity. Overrides must
/// stay inside the policy's bounds (validator-checked).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAction {
    /// Short label, e.g. "overnight-scale-in"
    pub label: String,
    pub days: ScheduleDays,
    /// Hour of day, UTC, 0-23
    pub hour_utc: u8,
    pub min_override: u32,
    pub desired_override: u32,
}

impl ScheduledAction {
    /// Create a scheduled action with validation
    ///
    /// # Invariants
    /// - `hour_utc` 0-23
    pub fn new(
        label: impl Into<String>,
        days: ScheduleDays,
        hour_utc: u8,
        min_override: u32,
        desired_override: u32,
    ) -> Result<Self, FleetError> {
        if hour_utc > 23 {
            return Err(FleetError::InvalidScheduleHour(hour_utc));
        }
        Ok(Self {
            label: label.into(),
            days,
            hour_utc,
            min_override,
            desired_override,
        })
    }
}

/// A complete scaling policy: bounds, target-tracking rule, schedules
///
/// Invariants:
/// - Scale-up threshold strictly greater than scale-down threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingPolicy {
    pub bounds: ScalingBounds,
    pub metric: ScalingMetric,
    /// Metric value above which the fleet grows
    pub scale_up_threshold: u32,
    /// Metric value below which the fleet shrinks
    pub scale_down_threshold: u32,
    pub scale_up_cooldown_secs: u32,
    pub scale_down_cooldown_secs: u32,
    /// Time-windowed capacity overrides, UTC whole hours
    pub schedules: Vec<ScheduledAction>,
}

impl ScalingPolicy {
    /// Default scale-up threshold (percent CPU)
    pub const DEFAULT_SCALE_UP: u32 = 70;

    /// Default scale-down threshold (percent CPU)
    pub const DEFAULT_SCALE_DOWN: u32 = 30;

    /// Default cooldown after scaling out, in seconds
    pub const DEFAULT_UP_COOLDOWN_SECS: u32 = 180;

    /// Default cooldown after scaling in, in seconds
    pub const DEFAULT_DOWN_COOLDOWN_SECS: u32 = 300;

    /// Create a policy with validation
    ///
    /// # Invariants
    /// - `scale_up_threshold > scale_down_threshold`
    pub fn new(
        bounds: ScalingBounds,
        metric: ScalingMetric,
        scale_up_threshold: u32,
        scale_down_threshold: u32,
    ) -> Result<Self, FleetError> {
        if scale_up_threshold <= scale_down_threshold {
            return Err(FleetError::ThresholdsNotOrdered {
                up: scale_up_threshold,
                down: scale_down_threshold,
            });
        }
        Ok(Self {
            bounds,
            metric,
            scale_up_threshold,
            scale_down_threshold,
            scale_up_cooldown_secs: Self::DEFAULT_UP_COOLDOWN_SECS,
            scale_down_cooldown_secs: Self::DEFAULT_DOWN_COOLDOWN_SECS,
            schedules: Vec::new(),
        })
    }
}

/// Fleet intent as resolved from configuration
///
/// Carried on the resolved `Environment`; the fleet synthesizer turns
/// it into concrete graph nodes. Bounds arrive already validated, with
/// an unset desired size defaulted by [`ScalingBounds::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetIntent {
    pub shape: InstanceShape,
    pub bounds: ScalingBounds,
    pub health_check_path: HealthCheckPath,
    pub scaling_metric: ScalingMetric,
}

/// Fleet node payload: the launch specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSpec {
    pub shape: InstanceShape,
    /// Security groups the fleet instances attach
    pub attached_groups: Vec<GroupId>,
}

/// Load balancer node payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerSpec {
    pub listener_port: u16,
    /// Optional perimeter request throttle, requests per window
    pub rate_limit_per_window: Option<u32>,
}

/// Target group node payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroupSpec {
    pub port: u16,
    pub health_check_path: HealthCheckPath,
}
