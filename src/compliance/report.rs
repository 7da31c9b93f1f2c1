// Copyright (c) 2025 - Cowboy AI, Inc.
//! Findings and the Compliance Report
//!
//! Findings are data, not errors: the pipeline accumulates every one it
//! encounters across all stages and returns them together, so a single
//! run surfaces every problem instead of forcing a fix-one/rerun loop.
//! Synthesis as a whole fails iff the report holds at least one
//! blocking finding.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::graph::NodeKey;

/// Finding severity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Violates a hard invariant; fails the run
    Blocking,
    /// Soft recommendation not met; never fails the run
    Advisory,
}

impl Severity {
    /// Get the severity as its canonical lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Blocking => "blocking",
            Severity::Advisory => "advisory",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable machine-readable finding codes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum FindingCode {
    // Topology
    AddressSpaceExhausted,
    SubnetOverlap,
    SubnetEscapesNetwork,
    DataTierInternetRoute,
    MissingHaZoneCoverage,
    PrivateEgressPathMissing,
    // Security
    DataTierUnrestrictedIngress,
    SecurityGroupCycle,
    DuplicateFilterPriority,
    FilterLayerMismatch,
    // Fleet
    NonPrivateFleetPlacement,
    ScalingBoundsInverted,
    ScalingThresholdOrder,
    ScheduleOverrideOutOfBounds,
    // Encryption and audit
    AuditRetentionShortfall,
    AuditCoverageGap,
    KeyRotationDisabled,
    KeyDeletionWindowShort,
    MissingEncryptionBinding,
    // Placement
    BlockedRegionPlacement,
    // Advisory
    RetentionBelowTarget,
    RateLimitUnset,
}

impl FindingCode {
    /// Get the code as its canonical kebab-case label
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCode::AddressSpaceExhausted => "address-space-exhausted",
            FindingCode::SubnetOverlap => "subnet-overlap",
            FindingCode::SubnetEscapesNetwork => "subnet-escapes-network",
            FindingCode::DataTierInternetRoute => "data-tier-internet-route",
            FindingCode::MissingHaZoneCoverage => "missing-ha-zone-coverage",
            FindingCode::PrivateEgressPathMissing => "private-egress-path-missing",
            FindingCode::DataTierUnrestrictedIngress => "data-tier-unrestricted-ingress",
            FindingCode::SecurityGroupCycle => "security-group-cycle",
            FindingCode::DuplicateFilterPriority => "duplicate-filter-priority",
            FindingCode::FilterLayerMismatch => "filter-layer-mismatch",
            FindingCode::NonPrivateFleetPlacement => "non-private-fleet-placement",
            FindingCode::ScalingBoundsInverted => "scaling-bounds-inverted",
            FindingCode::ScalingThresholdOrder => "scaling-threshold-order",
            FindingCode::ScheduleOverrideOutOfBounds => "schedule-override-out-of-bounds",
            FindingCode::AuditRetentionShortfall => "audit-retention-shortfall",
            FindingCode::AuditCoverageGap => "audit-coverage-gap",
            FindingCode::KeyRotationDisabled => "key-rotation-disabled",
            FindingCode::KeyDeletionWindowShort => "key-deletion-window-short",
            FindingCode::MissingEncryptionBinding => "missing-encryption-binding",
            FindingCode::BlockedRegionPlacement => "blocked-region-placement",
            FindingCode::RetentionBelowTarget => "retention-below-target",
            FindingCode::RateLimitUnset => "rate-limit-unset",
        }
    }
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One finding: severity, code, human message, optional node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub code: FindingCode,
    pub message: String,
    pub node_ref: Option<NodeKey>,
}

impl Finding {
    /// A blocking finding without a node reference
    pub fn blocking(code: FindingCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Blocking,
            code,
            message: message.into(),
            node_ref: None,
        }
    }

    /// A blocking finding pinned to a node
    pub fn blocking_at(code: FindingCode, message: impl Into<String>, node: NodeKey) -> Self {
        Self {
            severity: Severity::Blocking,
            code,
            message: message.into(),
            node_ref: Some(node),
        }
    }

    /// An advisory finding without a node reference
    pub fn advisory(code: FindingCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Advisory,
            code,
            message: message.into(),
            node_ref: None,
        }
    }

    /// An advisory finding pinned to a node
    pub fn advisory_at(code: FindingCode, message: impl Into<String>, node: NodeKey) -> Self {
        Self {
            severity: Severity::Advisory,
            code,
            message: message.into(),
            node_ref: Some(node),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node_ref {
            Some(node) => write!(f, "[{}] {} ({})", self.code, self.message, node),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// The accumulated findings of one synthesis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    findings: Vec<Finding>,
}

impl Report {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one finding
    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Append findings in order
    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    /// Fold another report into this one, keeping order
    pub fn merge(&mut self, other: Report) {
        self.findings.extend(other.findings);
    }

    /// All findings in accumulation order
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Blocking findings only
    pub fn blocking(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Blocking)
    }

    /// Advisory findings only
    pub fn advisory(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Advisory)
    }

    /// Check whether any blocking finding is present
    pub fn has_blocking(&self) -> bool {
        self.blocking().next().is_some()
    }

    /// Number of blocking findings
    pub fn blocking_count(&self) -> usize {
        self.blocking().count()
    }

    /// Number of advisory findings
    pub fn advisory_count(&self) -> usize {
        self.advisory().count()
    }

    /// Check whether the report is completely empty
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Render the report grouped by severity, for CLI output
    pub fn render_text(&self) -> String {
        if self.is_clean() {
            return "no findings\n".to_string();
        }

        let mut out = String::new();
        if self.has_blocking() {
            out.push_str(&format!("BLOCKING ({}):\n", self.blocking_count()));
            for finding in self.blocking() {
                out.push_str(&format!("  {finding}\n"));
            }
        }
        if self.advisory_count() > 0 {
            out.push_str(&format!("ADVISORY ({}):\n", self.advisory_count()));
            for finding in self.advisory() {
                out.push_str(&format!("  {finding}\n"));
            }
        }
        out
    }
}

impl From<Vec<Finding>> for Report {
    fn from(findings: Vec<Finding>) -> Self {
        Self { findings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_grouping() {
        let mut report = Report::new();
        report.push(Finding::advisory(
            FindingCode::RetentionBelowTarget,
            "retention 120 below target 365",
        ));
        report.push(Finding::blocking_at(
            FindingCode::AuditRetentionShortfall,
            "retention 30 below minimum 90",
            NodeKey::new("env/prod/audit"),
        ));

        assert!(report.has_blocking());
        assert_eq!(report.blocking_count(), 1);
        assert_eq!(report.advisory_count(), 1);
        assert!(!report.is_clean());

        let text = report.render_text();
        let blocking_pos = text.find("BLOCKING (1):").unwrap();
        let advisory_pos = text.find("ADVISORY (1):").unwrap();
        assert!(blocking_pos < advisory_pos);
        assert!(text.contains("[audit-retention-shortfall]"));
        assert!(text.contains("(env/prod/audit)"));
    }

    #[test]
    fn test_clean_report() {
        let report = Report::new();
        assert!(report.is_clean());
        assert!(!report.has_blocking());
        assert_eq!(report.render_text(), "no findings\n");
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut first = Report::new();
        first.push(Finding::blocking(FindingCode::SubnetOverlap, "a"));
        let mut second = Report::new();
        second.push(Finding::blocking(FindingCode::SubnetOverlap, "b"));

        first.merge(second);
        let messages: Vec<_> = first.findings().iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b"]);
    }

    #[test]
    fn test_code_serde_kebab_case() {
        let json = serde_json::to_string(&FindingCode::DataTierInternetRoute).unwrap();
        assert_eq!(json, "\"data-tier-internet-route\"");
        assert_eq!(
            FindingCode::DataTierInternetRoute.as_str(),
            "data-tier-internet-route"
        );
    }
}
