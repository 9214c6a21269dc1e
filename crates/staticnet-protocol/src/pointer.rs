//! Signed pointer records.
//!
//! A [`StaticPointer`] binds a static identifier to a content locator
//! until an expiry time. It is valid only while its signature verifies
//! against the embedded public key, that key derives to the owner, and
//! the expiry has not been reached.

use serde::{Deserialize, Serialize};
use staticnet_crypto::identity::StaticId;
use staticnet_crypto::signing::{verify, Keypair, PublicKey, Signature};
use staticnet_types::{Result, StaticNetError, Timestamp};

use crate::canonical::pointer_signing_bytes;

/// Record binding an identifier to a content locator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticPointer {
    /// Identifier the record is published under.
    pub owner: StaticId,
    /// Content locator, e.g. `/ipfs/<content id>`.
    pub value: String,
    /// End of the validity window.
    pub expiry: Timestamp,
    /// Public key of the owner.
    pub public_key: PublicKey,
    /// Signature over the canonical pointer bytes.
    pub signature: Signature,
}

impl StaticPointer {
    /// Creates a pointer owned by `keypair` and signs it.
    pub fn sign(keypair: &Keypair, value: impl Into<String>, expiry: Timestamp) -> Result<Self> {
        let public_key = keypair.public_key();
        let owner = StaticId::derive(&public_key)?;
        let value = value.into();
        let signature = keypair.sign(&pointer_signing_bytes(&owner, &value, &expiry)?);

        Ok(Self {
            owner,
            value,
            expiry,
            public_key,
            signature,
        })
    }

    /// Checks ownership and signature, ignoring expiry.
    ///
    /// # Errors
    ///
    /// Returns [`StaticNetError::ValidationFailure`] if the key does not
    /// derive to the owner or the signature does not verify.
    pub fn verify(&self) -> Result<()> {
        let derived = StaticId::derive(&self.public_key).map_err(|e| {
            StaticNetError::ValidationFailure {
                reason: format!("pointer key is unusable: {e}"),
            }
        })?;
        if derived != self.owner {
            return Err(StaticNetError::ValidationFailure {
                reason: format!("pointer key belongs to {derived}, not {}", self.owner),
            });
        }

        let bytes = pointer_signing_bytes(&self.owner, &self.value, &self.expiry)?;
        verify(&self.public_key, &bytes, &self.signature).map_err(|e| {
            StaticNetError::ValidationFailure {
                reason: format!("pointer for {}: {e}", self.owner),
            }
        })
    }

    /// Returns `true` once the validity window has closed.
    pub fn is_expired(&self) -> bool {
        self.expiry.has_passed()
    }

    /// Full validity check: [`Self::verify`], then expiry.
    ///
    /// # Errors
    ///
    /// - [`StaticNetError::ValidationFailure`] as in [`Self::verify`].
    /// - [`StaticNetError::Expired`] if the expiry has been reached.
    pub fn validate(&self) -> Result<()> {
        self.verify()?;
        if self.is_expired() {
            return Err(StaticNetError::Expired {
                reason: format!("pointer for {} expired at {}", self.owner, self.expiry),
            });
        }
        Ok(())
    }

    /// Returns the value with the storage-scheme prefix removed.
    ///
    /// Values without the prefix are returned unchanged.
    pub fn content_id(&self, scheme: &str) -> &str {
        self.value.strip_prefix(scheme).unwrap_or(&self.value)
    }

    /// Serializes the record to CBOR for storage.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| StaticNetError::ProtocolError {
            reason: format!("pointer encoding failed: {e}"),
        })?;
        Ok(buf)
    }

    /// Parses a record from CBOR. Does not validate it.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| StaticNetError::ProtocolError {
            reason: format!("malformed pointer record: {e}"),
        })
    }
}
