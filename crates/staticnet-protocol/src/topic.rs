//! Routing keys and update-topic derivation.
//!
//! Every static identifier has a routing key under which its pointer
//! record is stored, and an update topic on which bind notifications are
//! broadcast. The topic is a hash of the routing key, never the
//! identifier itself.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use staticnet_crypto::hash::sha256;
use staticnet_crypto::identity::StaticId;
use staticnet_types::Topic;

/// Namespace prepended to the identifier bytes in a routing key.
pub const ROUTING_NAMESPACE: &[u8] = b"/ipns/";

/// Prefix of every derived update topic.
pub const UPDATE_TOPIC_PREFIX: &str = "/record/";

/// Key under which an identifier's pointer record is stored.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RoutingKey(Vec<u8>);

impl RoutingKey {
    /// Builds the routing key `"/ipns/" || identifier bytes`.
    pub fn for_id(id: &StaticId) -> Self {
        let mut key = ROUTING_NAMESPACE.to_vec();
        key.extend_from_slice(&id.to_bytes());
        Self(key)
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the key as unpadded URL-safe base64, for substrates that
    /// only accept text keys.
    pub fn to_text(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }
}

/// Derives the update topic of an identifier.
///
/// `"/record/" || base64url_nopad(sha256(routing_key(id)))`. Pure: every
/// peer derives the same topic for the same identifier.
pub fn derive_update_topic(id: &StaticId) -> Topic {
    let digest = sha256(RoutingKey::for_id(id).as_bytes());
    Topic::new(format!("{UPDATE_TOPIC_PREFIX}{}", URL_SAFE_NO_PAD.encode(digest)))
}

/// Builds an owner-bound topic `"<id>/<kind>"`.
///
/// In the relay domain only `id` itself may publish on such a topic.
pub fn static_topic(id: &StaticId, kind: &str) -> Topic {
    Topic::new(format!("{id}/{kind}"))
}

/// Splits an owner-bound topic into its identifier and kind.
///
/// Returns `None` when the part before the first `/` is not an
/// identifier, which includes every derived update topic.
pub fn parse_static_topic(topic: &Topic) -> Option<(StaticId, &str)> {
    let (owner, kind) = topic.as_str().split_once('/')?;
    let owner = owner.parse().ok()?;
    Some((owner, kind))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use staticnet_crypto::signing::Keypair;
    use staticnet_types::Result;

    fn id(seed: u8) -> Result<StaticId> {
        StaticId::derive(&Keypair::from_seed(&[seed; 32]).public_key())
    }

    #[test]
    fn topic_is_deterministic() -> Result<()> {
        let a = id(0x42)?;
        assert_eq!(derive_update_topic(&a), derive_update_topic(&a));
        Ok(())
    }

    #[test]
    fn distinct_ids_get_distinct_topics() -> Result<()> {
        assert_ne!(derive_update_topic(&id(0x01)?), derive_update_topic(&id(0x02)?));
        Ok(())
    }

    #[test]
    fn topic_shape() -> Result<()> {
        let a = id(0x42)?;
        let topic = derive_update_topic(&a);
        let suffix = topic.as_str().strip_prefix(UPDATE_TOPIC_PREFIX);
        // 32-byte digest in unpadded base64 is 43 characters.
        assert_eq!(suffix.map(str::len), Some(43));
        assert!(!topic.as_str().contains(&a.to_string()));
        Ok(())
    }

    #[test]
    fn routing_key_layout() -> Result<()> {
        let a = id(0x42)?;
        let key = RoutingKey::for_id(&a);
        assert!(key.as_bytes().starts_with(ROUTING_NAMESPACE));
        assert_eq!(&key.as_bytes()[ROUTING_NAMESPACE.len()..], a.to_bytes().as_slice());
        Ok(())
    }

    #[test]
    fn static_topic_parses_back() -> Result<()> {
        let a = id(0x42)?;
        let topic = static_topic(&a, "profile");
        assert_eq!(parse_static_topic(&topic), Some((a, "profile")));
        Ok(())
    }

    #[test]
    fn plain_topics_are_not_static() -> Result<()> {
        assert_eq!(parse_static_topic(&Topic::from("news")), None);
        assert_eq!(parse_static_topic(&Topic::from("alice/profile")), None);
        assert_eq!(parse_static_topic(&derive_update_topic(&id(0x42)?)), None);
        Ok(())
    }
}
