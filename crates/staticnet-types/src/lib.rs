//! Core shared types for the staticnet naming and event system.
//!
//! This crate defines the fundamental types used across the workspace:
//! topics, sequence nonces, timestamps, the central error enum and the
//! runtime configuration. Identifier and key types live in
//! `staticnet-crypto` because they depend on key material.

pub mod config;
pub mod lifetime;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// Pub/sub topic name.
///
/// Update topics for static identifiers are derived by
/// `staticnet_protocol::topic::derive_update_topic`; free-form topics
/// can be built from any string.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    /// Creates a topic from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the topic name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Topic {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Seqno
// ---------------------------------------------------------------------------

/// 64-bit per-message sequence nonce.
///
/// Generated randomly for every published envelope. Carries no ordering
/// meaning and is not checked against a replay window.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Seqno([u8; 8]);

impl Seqno {
    /// The fixed byte length of a sequence nonce.
    pub const LEN: usize = 8;

    /// Creates a new `Seqno` from raw bytes.
    pub fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl AsRef<[u8]> for Seqno {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Seqno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// UTC timestamp in ISO 8601 format.
///
/// Used for pointer expiry. All comparisons happen in UTC so that
/// peers in different timezones agree on validity.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a `Timestamp` representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the current time shifted forward by `lifetime`.
    ///
    /// # Errors
    ///
    /// Returns [`StaticNetError::ConfigError`] if the lifetime does not
    /// fit into a calendar date.
    pub fn after(lifetime: Duration) -> Result<Self> {
        let delta = chrono::Duration::from_std(lifetime).map_err(|e| {
            StaticNetError::ConfigError {
                reason: format!("lifetime out of range: {e}"),
            }
        })?;
        Utc::now()
            .checked_add_signed(delta)
            .map(Self)
            .ok_or_else(|| StaticNetError::ConfigError {
                reason: "lifetime overflows the calendar".into(),
            })
    }

    /// Returns `true` once the current time has reached this timestamp.
    pub fn has_passed(&self) -> bool {
        Utc::now() >= self.0
    }

    /// Returns the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the timestamp as an ISO 8601 string.
    pub fn as_str(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = StaticNetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| StaticNetError::ProtocolError {
                reason: format!("invalid ISO 8601 timestamp: {e}"),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }
}

// ---------------------------------------------------------------------------
// StaticNetError
// ---------------------------------------------------------------------------

/// Central error type for staticnet.
///
/// All crates in the workspace convert their internal errors into
/// variants of this enum. Lookup calls report absence through `Option`
/// instead of [`StaticNetError::NotFound`].
#[derive(Debug, Error)]
pub enum StaticNetError {
    /// A named key is required but the store does not hold it.
    #[error("key not found: {name}")]
    KeyNotFound {
        /// Account name or identifier that was looked up.
        name: String,
    },

    /// A string could not be parsed as a static identifier.
    #[error("invalid identifier: {reason}")]
    InvalidIdentifier {
        /// Human-readable description of the parse failure.
        reason: String,
    },

    /// No record exists for the requested identifier.
    #[error("not found: {reason}")]
    NotFound {
        /// Human-readable description of what was missing.
        reason: String,
    },

    /// A record exists but its validity window has closed.
    #[error("record expired: {reason}")]
    Expired {
        /// Human-readable description including the expiry time.
        reason: String,
    },

    /// A signature or record check failed.
    #[error("validation failure: {reason}")]
    ValidationFailure {
        /// Human-readable description of the failed check.
        reason: String,
    },

    /// A deadline-bound backend call did not answer in time.
    #[error("backend timeout: {operation} did not respond within {after_ms} ms")]
    BackendTimeout {
        /// Name of the operation that timed out.
        operation: String,
        /// Deadline in milliseconds.
        after_ms: u64,
    },

    /// Opaque failure reported by the peer-to-peer substrate.
    #[error("backend error: {reason}")]
    BackendError {
        /// Substrate error message, propagated unchanged.
        reason: String,
    },

    /// A cryptographic operation failed (key parsing, signing).
    #[error("crypto error: {reason}")]
    CryptoError {
        /// Human-readable description of the cryptographic failure.
        reason: String,
    },

    /// A protocol-level error (serialization, schema, canonical form).
    #[error("protocol error: {reason}")]
    ProtocolError {
        /// Human-readable description of the protocol failure.
        reason: String,
    },

    /// Reading or writing persisted state failed.
    #[error("storage error: {reason}")]
    StorageError {
        /// Human-readable description of the storage failure.
        reason: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`StaticNetError`].
pub type Result<T> = std::result::Result<T, StaticNetError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
