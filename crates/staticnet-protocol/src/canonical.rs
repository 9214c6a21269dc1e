//! Canonical CBOR signing bytes per RFC 8949 §4.2 (Core Deterministic Encoding).
//!
//! Signatures never cover a serde-derived encoding. Each signed structure
//! is rebuilt as a CBOR map whose keys are emitted in deterministic order
//! (shorter encoded key first, then bytewise), then prefixed with a
//! domain-separation tag so that bytes signed for one purpose never
//! verify for another.
//!
//! Envelope map, key order:
//!
//! | # | Key        | CBOR type     | Encoded key prefix |
//! |---|------------|---------------|--------------------|
//! | 1 | `"data"`   | Bytes         | `0x64`             |
//! | 2 | `"from"`   | Bytes         | `0x64`             |
//! | 3 | `"seqno"`  | Bytes         | `0x65`             |
//! | 4 | `"topics"` | Array of Text | `0x66`             |
//!
//! `"topics"` is present only when the signing domain covers topics.
//!
//! Pointer map, key order:
//!
//! | # | Key        | CBOR type | Encoded key prefix |
//! |---|------------|-----------|--------------------|
//! | 1 | `"owner"`  | Bytes     | `0x65`             |
//! | 2 | `"value"`  | Text      | `0x65`             |
//! | 3 | `"expiry"` | Text      | `0x66`             |

use ciborium::Value;
use staticnet_crypto::identity::StaticId;
use staticnet_types::{Result, Seqno, StaticNetError, Timestamp};

use crate::envelope::Domain;

/// Domain-separation tag of pointer records.
pub const POINTER_PREFIX: &[u8] = b"staticnet-pointer:";

/// Builds the bytes an envelope signature covers.
///
/// Layout: `domain.prefix() || canonical_cbor({data, from, seqno[, topics]})`.
pub fn envelope_signing_bytes(
    domain: Domain,
    from: &StaticId,
    data: &[u8],
    seqno: &Seqno,
    topics: &[String],
) -> Result<Vec<u8>> {
    let mut entries: Vec<(Value, Value)> = vec![
        (Value::Text("data".into()), Value::Bytes(data.to_vec())),
        (Value::Text("from".into()), Value::Bytes(from.to_bytes())),
        (
            Value::Text("seqno".into()),
            Value::Bytes(seqno.as_bytes().to_vec()),
        ),
    ];
    if domain.signs_topics() {
        entries.push((
            Value::Text("topics".into()),
            Value::Array(topics.iter().map(|t| Value::Text(t.clone())).collect()),
        ));
    }

    prefixed(domain.prefix(), &Value::Map(entries))
}

/// Builds the bytes a pointer signature covers.
///
/// Layout: `POINTER_PREFIX || canonical_cbor({owner, value, expiry})`.
pub fn pointer_signing_bytes(owner: &StaticId, value: &str, expiry: &Timestamp) -> Result<Vec<u8>> {
    let entries: Vec<(Value, Value)> = vec![
        (Value::Text("owner".into()), Value::Bytes(owner.to_bytes())),
        (Value::Text("value".into()), Value::Text(value.into())),
        (Value::Text("expiry".into()), Value::Text(expiry.as_str())),
    ];

    prefixed(POINTER_PREFIX, &Value::Map(entries))
}

fn prefixed(prefix: &[u8], map: &Value) -> Result<Vec<u8>> {
    let mut buf = prefix.to_vec();
    ciborium::into_writer(map, &mut buf).map_err(|e| StaticNetError::ProtocolError {
        reason: format!("CBOR serialization failed: {e}"),
    })?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
