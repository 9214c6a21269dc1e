//! Static identifiers derived from Ed25519 public keys.
//!
//! A [`StaticId`] is the libp2p `PeerId` of an Ed25519 public key,
//! rendered in base58. The derivation is pure: the same public key
//! always yields the same identifier, and the identifier of a stored
//! account is never recomputed once created.

use std::fmt;
use std::str::FromStr;

use libp2p::identity;
use libp2p::PeerId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use staticnet_types::{Result, StaticNetError};

use crate::signing::PublicKey;

/// Key-derived identifier that names a mutable content pointer and an
/// event stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct StaticId(PeerId);

impl StaticId {
    /// Derives the identifier of an Ed25519 public key.
    ///
    /// # Errors
    ///
    /// Returns [`StaticNetError::CryptoError`] if the bytes are not a
    /// valid Ed25519 point.
    pub fn derive(public_key: &PublicKey) -> Result<Self> {
        let ed25519_pk = identity::ed25519::PublicKey::try_from_bytes(public_key.as_bytes())
            .map_err(|e| StaticNetError::CryptoError {
                reason: format!("failed to convert public key to libp2p ed25519 key: {e}"),
            })?;
        Ok(Self(PeerId::from(identity::PublicKey::from(ed25519_pk))))
    }

    /// Parses an identifier from its binary multihash form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        PeerId::from_bytes(bytes)
            .map(Self)
            .map_err(|e| StaticNetError::InvalidIdentifier {
                reason: format!("bad identifier bytes: {e}"),
            })
    }

    /// Returns the binary multihash form.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Returns the underlying libp2p peer id.
    pub fn peer_id(&self) -> &PeerId {
        &self.0
    }
}

impl From<PeerId> for StaticId {
    fn from(peer_id: PeerId) -> Self {
        Self(peer_id)
    }
}

impl fmt::Display for StaticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_base58())
    }
}

impl FromStr for StaticId {
    type Err = StaticNetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PeerId::from_str(s)
            .map(Self)
            .map_err(|e| StaticNetError::InvalidIdentifier {
                reason: format!("'{s}' is not a static identifier: {e}"),
            })
    }
}

impl Serialize for StaticId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_base58())
    }
}

impl<'de> Deserialize<'de> for StaticId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::Keypair;

    #[test]
    fn derive_is_deterministic() -> Result<()> {
        let pk = Keypair::from_seed(&[0xAA; 32]).public_key();
        assert_eq!(StaticId::derive(&pk)?, StaticId::derive(&pk)?);
        Ok(())
    }

    #[test]
    fn different_keys_produce_different_ids() -> Result<()> {
        let id1 = StaticId::derive(&Keypair::from_seed(&[0x01; 32]).public_key())?;
        let id2 = StaticId::derive(&Keypair::from_seed(&[0x02; 32]).public_key())?;
        assert_ne!(id1, id2);
        Ok(())
    }

    #[test]
    fn display_parses_back() -> Result<()> {
        let id = StaticId::derive(&Keypair::from_seed(&[0x42; 32]).public_key())?;
        let text = id.to_string();
        // Ed25519 peer ids use the identity multihash and render as "12D3KooW...".
        assert!(text.starts_with("12D3KooW"));
        assert_eq!(text.parse::<StaticId>()?, id);
        Ok(())
    }

    #[test]
    fn bytes_parse_back() -> Result<()> {
        let id = StaticId::derive(&Keypair::from_seed(&[0x43; 32]).public_key())?;
        assert_eq!(StaticId::from_bytes(&id.to_bytes())?, id);
        Ok(())
    }

    #[test]
    fn names_are_not_identifiers() {
        assert!("self".parse::<StaticId>().is_err());
        assert!("alice".parse::<StaticId>().is_err());
        assert!("".parse::<StaticId>().is_err());
    }

    #[test]
    fn serde_uses_base58_text() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let id = StaticId::derive(&Keypair::from_seed(&[0x44; 32]).public_key())?;
        let json = serde_json::to_string(&id)?;
        assert_eq!(json, format!("\"{id}\""));
        Ok(())
    }
}
