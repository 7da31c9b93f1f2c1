// Copyright (c) 2025 - Cowboy AI, Inc.
//! Encryption and Audit Binding Stage
//!
//! Runs first in the pipeline so later stages can hang `EncryptedBy`
//! edges off the environment key. Explicit configuration wins over tier
//! defaults even when it sits below the tier floor; the validator
//! reports the shortfall instead of silently repairing it.

use tracing::debug;

use crate::domain::{AuditBinding, Environment, KeyPolicy, KeyRef};
use crate::errors::InternalInvariantError;
use crate::graph::{Relation, ResourceGraph, ResourceNode};

use super::{construction_error, keys};

/// Synthesize the encryption key and audit trail for an environment
pub fn bind(env: &Environment) -> Result<ResourceGraph, InternalInvariantError> {
    let mut fragment = ResourceGraph::new();

    let alias = KeyRef::new(format!("key/{}", env.name))
        .map_err(construction_error("key alias"))?;
    let key_node = keys::encryption_key(&env.name);
    fragment.insert(
        key_node.clone(),
        ResourceNode::EncryptionKey(KeyPolicy {
            alias,
            rotation_enabled: env.encryption_required,
            deletion_window_days: env.profile.min_key_deletion_window_days,
            multi_region: env.tier.is_production(),
        }),
    )?;

    let audit_node = keys::audit_trail(&env.name);
    fragment.insert(
        audit_node.clone(),
        ResourceNode::AuditTrail(AuditBinding {
            log_destination: format!("audit/{}/trail", env.name),
            retention_days: env.retention_days,
            management_events_covered: env.profile.audit_all_management_events,
        }),
    )?;
    fragment.connect(audit_node, key_node, Relation::EncryptedBy);

    debug!(environment = %env.name, "bound encryption key and audit trail");
    Ok(fragment)
}
