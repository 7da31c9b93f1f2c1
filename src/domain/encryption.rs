// Copyright (c) 2025 - Cowboy AI, Inc.
//! Encryption Key and Audit Binding Value Objects
//!
//! The encryption binder is the single owner of key lifecycle. Every
//! other component holds a [`KeyRef`], an alias to look up, never a
//! copy of rotation state or key material.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Encryption binding validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("Key alias is empty")]
    EmptyKeyAlias,

    #[error("Key alias exceeds maximum length of 64 characters: {0}")]
    KeyAliasTooLong(usize),

    #[error("Invalid character in key alias: {0}")]
    InvalidKeyAliasCharacter(char),

    #[error("Log destination is empty")]
    EmptyLogDestination,
}

/// Weak reference to an encryption key, by alias
///
/// Invariants:
/// - Non-empty, at most 64 characters
/// - Lowercase alphanumerics, hyphens, and '/' separators
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::KeyRef;
///
/// let key = KeyRef::new("key/prod").unwrap();
/// assert_eq!(key.as_str(), "key/prod");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyRef(String);

impl KeyRef {
    /// Maximum alias length
    pub const MAX_LENGTH: usize = 64;

    /// Create a new key reference with validation
    pub fn new(alias: impl Into<String>) -> Result<Self, EncryptionError> {
        let alias = alias.into();

        if alias.is_empty() {
            return Err(EncryptionError::EmptyKeyAlias);
        }
        if alias.len() > Self::MAX_LENGTH {
            return Err(EncryptionError::KeyAliasTooLong(alias.len()));
        }
        for ch in alias.chars() {
            if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && ch != '-' && ch != '/' {
                return Err(EncryptionError::InvalidKeyAliasCharacter(ch));
            }
        }

        Ok(Self(alias))
    }

    /// Get the alias as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for KeyRef {
    type Err = EncryptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Key management policy, one per environment
///
/// Values are synthesized as configured or tier-defaulted. Floors
/// (rotation on prod, minimum deletion window) are judged by the
/// validator, never silently repaired here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPolicy {
    /// Alias other components reference this key by
    pub alias: KeyRef,
    pub rotation_enabled: bool,
    pub deletion_window_days: u32,
    pub multi_region: bool,
}

/// Audit log binding, one per environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditBinding {
    /// Destination identifier the audit trail writes to
    pub log_destination: String,
    pub retention_days: u32,
    /// Whether all management-plane events are captured
    pub management_events_covered: bool,
}
