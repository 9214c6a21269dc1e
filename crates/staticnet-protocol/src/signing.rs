//! Envelope signing and verification.
//!
//! Signatures cover the domain-prefixed canonical CBOR bytes from
//! [`crate::canonical::envelope_signing_bytes`], never the wire form.
//! Verification failures are returned as
//! [`StaticNetError::ValidationFailure`]; callers on the delivery path
//! log and drop instead of propagating.

use staticnet_crypto::hash::random_seqno;
use staticnet_crypto::identity::StaticId;
use staticnet_crypto::signing::{verify, Keypair, PublicKey};
use staticnet_types::{Result, Seqno, StaticNetError, Topic};

use crate::canonical::envelope_signing_bytes;
use crate::envelope::{Domain, Envelope, VerifiedEnvelope};
use crate::topic::parse_static_topic;

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Signs `data` for publication on `topic` with a fresh random seqno.
pub fn sign_envelope(
    domain: Domain,
    keypair: &Keypair,
    topic: &Topic,
    data: Vec<u8>,
) -> Result<Envelope> {
    sign_envelope_with_seqno(domain, keypair, topic, data, random_seqno())
}

/// Signs `data` with a caller-chosen seqno.
///
/// Identical to [`sign_envelope`] otherwise. Useful for deterministic
/// fixtures.
pub fn sign_envelope_with_seqno(
    domain: Domain,
    keypair: &Keypair,
    topic: &Topic,
    data: Vec<u8>,
    seqno: Seqno,
) -> Result<Envelope> {
    let key = keypair.public_key();
    let from = StaticId::derive(&key)?;
    let topics = vec![topic.as_str().to_string()];
    let bytes = envelope_signing_bytes(domain, &from, &data, &seqno, &topics)?;
    let signature = keypair.sign(&bytes);

    Ok(Envelope {
        from,
        key,
        data,
        seqno,
        topics,
        signature,
    })
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verifies an envelope delivered on `topic` against its embedded key.
///
/// # Process
///
/// 1. The embedded key must derive to `from`.
/// 2. In the local-node domain, `topic` must be one of the signed topics.
/// 3. The signature must verify over the domain-prefixed canonical bytes.
/// 4. In the relay domain, a `<id>/<kind>` topic requires `from == id`.
///
/// # Errors
///
/// Returns [`StaticNetError::ValidationFailure`] if any step fails.
pub fn verify_envelope(domain: Domain, envelope: &Envelope, topic: &Topic) -> Result<VerifiedEnvelope> {
    verify_envelope_with_key(domain, envelope, topic, &envelope.key)
}

/// Verifies an envelope against a separately supplied public key.
///
/// Same checks as [`verify_envelope`], with `public_key` standing in for
/// the embedded key.
pub fn verify_envelope_with_key(
    domain: Domain,
    envelope: &Envelope,
    topic: &Topic,
    public_key: &PublicKey,
) -> Result<VerifiedEnvelope> {
    let derived = StaticId::derive(public_key).map_err(|e| StaticNetError::ValidationFailure {
        reason: format!("envelope key is unusable: {e}"),
    })?;
    if derived != envelope.from {
        return Err(StaticNetError::ValidationFailure {
            reason: format!("key of {derived} does not match sender {}", envelope.from),
        });
    }

    if domain.signs_topics() && !envelope.topics.iter().any(|t| t == topic.as_str()) {
        return Err(StaticNetError::ValidationFailure {
            reason: format!("envelope was not signed for topic '{topic}'"),
        });
    }

    let bytes = envelope_signing_bytes(
        domain,
        &envelope.from,
        &envelope.data,
        &envelope.seqno,
        &envelope.topics,
    )?;
    verify(public_key, &bytes, &envelope.signature).map_err(|e| {
        StaticNetError::ValidationFailure {
            reason: format!("envelope from {}: {e}", envelope.from),
        }
    })?;

    let mut static_kind = None;
    if domain.binds_static_topics() {
        if let Some((owner, kind)) = parse_static_topic(topic) {
            if owner != envelope.from {
                return Err(StaticNetError::ValidationFailure {
                    reason: format!(
                        "sender {} may not publish on topic owned by {owner}",
                        envelope.from
                    ),
                });
            }
            static_kind = Some(kind.to_string());
        }
    }

    Ok(VerifiedEnvelope {
        topic: topic.clone(),
        from: envelope.from,
        public_key: *public_key,
        seqno: envelope.seqno,
        data: envelope.data.clone(),
        static_kind,
    })
}
