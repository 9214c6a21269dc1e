//! Signed publish and the topic subscriber registry.
//!
//! [`EventChannel`] signs outgoing payloads under its backend's domain
//! and hands the encoded envelope to the transport. Inbound, it owns the
//! topic → callbacks registry. The first subscriber of a topic opens one
//! persistent transport subscription and spawns a listener task that,
//! per frame, runs:
//!
//! 1. Size check and envelope decode.
//! 2. Signature and sender verification for the domain.
//! 3. The payload decode chain (bytes, text, JSON, pointer).
//! 4. Every callback registered for the topic, in registration order.
//!
//! Frames failing steps 1–2 are logged and dropped; the listener keeps
//! running. A panicking callback is logged and skipped for that frame.
//! Callbacks registered while a frame is being delivered may miss that
//! frame.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use staticnet_crypto::identity::StaticId;
use staticnet_crypto::signing::PublicKey;
use staticnet_keystore::{AccountRef, KeyStore, PeerIdentity};
use staticnet_protocol::envelope::{decode_envelope, encode_envelope, Domain};
use staticnet_protocol::payload::{decode_payload, EventPayload};
use staticnet_protocol::pointer::StaticPointer;
use staticnet_protocol::signing::{sign_envelope, verify_envelope};
use staticnet_types::config::StaticNetConfig;
use staticnet_types::{Result, Seqno, StaticNetError, Topic};

use crate::substrate::{FrameReceiver, PubSubTransport};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A verified, decoded event as handed to subscribers.
#[derive(Clone, Debug)]
pub struct Event {
    /// Topic the event arrived on.
    pub topic: Topic,
    /// Authenticated sender.
    pub from: StaticId,
    /// Sender's public key.
    pub public_key: PublicKey,
    /// Sequence nonce from the envelope.
    pub seqno: Seqno,
    /// Raw payload.
    pub data: Vec<u8>,
    /// Payload as UTF-8 text, if valid.
    pub text: Option<String>,
    /// Payload text parsed as JSON, if valid.
    pub json: Option<serde_json::Value>,
    /// Payload parsed as a pointer record, if it is one.
    pub pointer: Option<StaticPointer>,
    /// Kind of an owner-bound `<id>/<kind>` topic (relay domain only).
    pub static_kind: Option<String>,
}

/// Subscriber callback.
pub type EventCallback = Arc<dyn Fn(Event) + Send + Sync>;

type Registry = RwLock<HashMap<Topic, Vec<EventCallback>>>;

// ---------------------------------------------------------------------------
// EventChannel
// ---------------------------------------------------------------------------

/// Signs, publishes and dispatches events for one backend.
pub struct EventChannel {
    domain: Domain,
    keys: Arc<KeyStore>,
    transport: Arc<dyn PubSubTransport>,
    registry: Arc<Registry>,
    max_event_size: usize,
}

impl EventChannel {
    /// Creates a channel signing under `domain`.
    pub fn new(
        domain: Domain,
        keys: Arc<KeyStore>,
        transport: Arc<dyn PubSubTransport>,
        config: &StaticNetConfig,
    ) -> Self {
        Self {
            domain,
            keys,
            transport,
            registry: Arc::new(RwLock::new(HashMap::new())),
            max_event_size: config.max_event_size,
        }
    }

    /// Signing domain of this channel.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Publishes `payload` on `topic`, signed by `"self"`.
    pub async fn publish(&self, topic: &Topic, payload: EventPayload) -> Result<()> {
        let identity = self.keys.peer_identity(&AccountRef::self_account())?;
        self.publish_as(&identity, topic, payload).await
    }

    /// Publishes `payload` on `topic`, signed by `identity`.
    ///
    /// # Errors
    ///
    /// - [`StaticNetError::ProtocolError`] if the encoded envelope
    ///   exceeds the configured maximum event size.
    /// - Any transport error, unchanged.
    pub async fn publish_as(
        &self,
        identity: &PeerIdentity,
        topic: &Topic,
        payload: EventPayload,
    ) -> Result<()> {
        let envelope = sign_envelope(self.domain, identity.keypair(), topic, payload.into_bytes())?;
        let frame = encode_envelope(&envelope)?;
        if frame.len() > self.max_event_size {
            return Err(StaticNetError::ProtocolError {
                reason: format!(
                    "event size {} exceeds maximum {}",
                    frame.len(),
                    self.max_event_size
                ),
            });
        }

        self.transport.broadcast(topic, frame).await?;
        tracing::debug!(%topic, from = %identity.id(), seqno = %envelope.seqno, "event published");
        Ok(())
    }

    /// Registers `callback` for every verified event on `topic`.
    ///
    /// The first subscriber of a topic opens the transport subscription.
    pub async fn subscribe(&self, topic: &Topic, callback: EventCallback) -> Result<()> {
        {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(callbacks) = registry.get_mut(topic) {
                callbacks.push(callback);
                return Ok(());
            }
        }

        let frames = self.transport.listen(topic).await?;

        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(callbacks) = registry.get_mut(topic) {
            // Lost a race with a concurrent first subscriber; its listener
            // serves both and `frames` is dropped here.
            callbacks.push(callback);
            return Ok(());
        }
        registry.insert(topic.clone(), vec![callback]);
        drop(registry);

        tokio::spawn(run_listener(
            self.domain,
            topic.clone(),
            frames,
            Arc::clone(&self.registry),
            self.max_event_size,
        ));
        tracing::debug!(%topic, "listener started");
        Ok(())
    }

    /// Topics with a live listener, sorted.
    pub fn subscribed_topics(&self) -> Vec<Topic> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        let mut topics: Vec<Topic> = registry.keys().cloned().collect();
        topics.sort();
        topics
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

async fn run_listener(
    domain: Domain,
    topic: Topic,
    mut frames: FrameReceiver,
    registry: Arc<Registry>,
    max_event_size: usize,
) {
    let _entry = RegistryEntry {
        topic: topic.clone(),
        registry: Arc::clone(&registry),
    };

    while let Some(frame) = frames.recv().await {
        let Some(event) = accept_frame(domain, &topic, &frame, max_event_size) else {
            continue;
        };

        let callbacks: Vec<EventCallback> = registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .cloned()
            .unwrap_or_default();
        for callback in callbacks {
            let delivered = catch_unwind(AssertUnwindSafe(|| callback(event.clone())));
            if delivered.is_err() {
                tracing::warn!(%topic, from = %event.from, "subscriber callback panicked");
            }
        }
    }
}

/// Removes a topic from the registry when its listener exits, however it
/// exits, so the next subscriber opens a fresh transport subscription.
struct RegistryEntry {
    topic: Topic,
    registry: Arc<Registry>,
}

impl Drop for RegistryEntry {
    fn drop(&mut self) {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.topic);
        tracing::debug!(topic = %self.topic, "listener closed");
    }
}

/// Runs size check, decode, verification and the decode chain on one
/// frame. Never fails; rejected frames are logged.
fn accept_frame(domain: Domain, topic: &Topic, frame: &[u8], max_event_size: usize) -> Option<Event> {
    if frame.len() > max_event_size {
        tracing::warn!(%topic, size = frame.len(), "dropping oversized event");
        return None;
    }

    let envelope = match decode_envelope(frame) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(%topic, error = %e, "dropping undecodable event");
            return None;
        }
    };

    let verified = match verify_envelope(domain, &envelope, topic) {
        Ok(verified) => verified,
        Err(e) => {
            tracing::warn!(%topic, from = %envelope.from, error = %e, "dropping unverified event");
            return None;
        }
    };

    let decoded = decode_payload(verified.data);
    Some(Event {
        topic: verified.topic,
        from: verified.from,
        public_key: verified.public_key,
        seqno: verified.seqno,
        data: decoded.data,
        text: decoded.text,
        json: decoded.json,
        pointer: decoded.pointer,
        static_kind: verified.static_kind,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use staticnet_crypto::signing::Keypair;
    use staticnet_protocol::signing::sign_envelope_with_seqno;

    fn frame(domain: Domain, topic: &Topic, data: &[u8]) -> Result<Vec<u8>> {
        let kp = Keypair::from_seed(&[0x42; 32]);
        let env = sign_envelope_with_seqno(domain, &kp, topic, data.to_vec(), Seqno::new([1; 8]))?;
        encode_envelope(&env)
    }

    #[test]
    fn accepts_valid_json_frame() -> Result<()> {
        let topic = Topic::from("news");
        let bytes = frame(Domain::LocalNode, &topic, br#"{"n":1}"#)?;
        let event = accept_frame(Domain::LocalNode, &topic, &bytes, 65_536);
        let json = event.and_then(|e| e.json);
        assert_eq!(json, Some(serde_json::json!({"n": 1})));
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        let topic = Topic::from("news");
        assert!(accept_frame(Domain::LocalNode, &topic, b"garbage", 65_536).is_none());
    }

    #[test]
    fn rejects_other_domain() -> Result<()> {
        let topic = Topic::from("news");
        let bytes = frame(Domain::Relay, &topic, b"x")?;
        assert!(accept_frame(Domain::LocalNode, &topic, &bytes, 65_536).is_none());
        Ok(())
    }

    #[test]
    fn rejects_oversized() -> Result<()> {
        let topic = Topic::from("news");
        let bytes = frame(Domain::LocalNode, &topic, &[0u8; 128])?;
        assert!(accept_frame(Domain::LocalNode, &topic, &bytes, 64).is_none());
        Ok(())
    }
}
