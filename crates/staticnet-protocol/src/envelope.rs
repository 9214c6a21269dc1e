//! Event envelope types and the wire codec.
//!
//! An [`Envelope`] carries one published event together with the
//! sender's public key and an Ed25519 signature. A [`VerifiedEnvelope`]
//! is the output of successful verification and is the only form the
//! event channel hands on to subscribers.

use serde::{Deserialize, Serialize};
use staticnet_crypto::identity::StaticId;
use staticnet_crypto::signing::{PublicKey, Signature};
use staticnet_types::{Result, Seqno, StaticNetError, Topic};

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// Signing domain of an envelope.
///
/// Each backend signs under its own prefix, so an envelope produced for
/// one backend never verifies under the other.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Domain {
    /// Local peer node with gossip pub/sub. Topics are covered by the
    /// signature.
    LocalNode,
    /// Relay/DHT client. Topics are not signed; a `<id>/<kind>` delivery
    /// topic must instead match the sender.
    Relay,
}

impl Domain {
    /// Returns the domain-separation tag prepended to signed bytes.
    pub fn prefix(&self) -> &'static [u8] {
        match self {
            Domain::LocalNode => b"libp2p-pubsub:",
            Domain::Relay => b"staticnet-relay:",
        }
    }

    /// Whether the envelope's topic list is part of the signed bytes.
    pub fn signs_topics(&self) -> bool {
        matches!(self, Domain::LocalNode)
    }

    /// Whether `<id>/<kind>` delivery topics are bound to their sender.
    pub fn binds_static_topics(&self) -> bool {
        matches!(self, Domain::Relay)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A published event as it travels over the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Identifier of the signing key.
    pub from: StaticId,
    /// Public key of the signer. Must derive to `from`.
    pub key: PublicKey,
    /// Raw payload bytes.
    pub data: Vec<u8>,
    /// Random per-message nonce.
    pub seqno: Seqno,
    /// Topics the event was published on.
    pub topics: Vec<String>,
    /// Signature over the domain-prefixed canonical bytes.
    pub signature: Signature,
}

// ---------------------------------------------------------------------------
// VerifiedEnvelope
// ---------------------------------------------------------------------------

/// Output of successful envelope verification.
///
/// Proof that the signature is valid for `public_key`, that
/// `public_key` derives to `from`, and that the delivery topic is
/// acceptable for the domain.
#[derive(Clone, Debug)]
pub struct VerifiedEnvelope {
    /// Topic the envelope was delivered on.
    pub topic: Topic,
    /// Authenticated sender.
    pub from: StaticId,
    /// The key that produced the valid signature.
    pub public_key: PublicKey,
    /// Sequence nonce, passed through unchecked.
    pub seqno: Seqno,
    /// Raw payload bytes.
    pub data: Vec<u8>,
    /// `kind` of a `<id>/<kind>` delivery topic in the relay domain.
    pub static_kind: Option<String>,
}

// ---------------------------------------------------------------------------
// Wire codec
// ---------------------------------------------------------------------------

/// Serializes an envelope to its CBOR wire form.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(envelope, &mut buf).map_err(|e| StaticNetError::ProtocolError {
        reason: format!("envelope encoding failed: {e}"),
    })?;
    Ok(buf)
}

/// Parses an envelope from its CBOR wire form.
///
/// # Errors
///
/// Returns [`StaticNetError::ProtocolError`] for anything that is not a
/// well-formed envelope.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope> {
    ciborium::from_reader(bytes).map_err(|e| StaticNetError::ProtocolError {
        reason: format!("malformed envelope: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_differ() {
        assert_ne!(Domain::LocalNode.prefix(), Domain::Relay.prefix());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_envelope(b"not cbor at all").is_err());
        assert!(decode_envelope(&[]).is_err());
    }

    #[test]
    fn wrong_shape_is_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut buf = Vec::new();
        ciborium::into_writer(&vec![1u8, 2, 3], &mut buf)?;
        assert!(decode_envelope(&buf).is_err());
        Ok(())
    }
}
