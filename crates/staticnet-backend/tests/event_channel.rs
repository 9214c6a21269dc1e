//! Publish / subscribe behaviour, including rejection of bad frames.
//!
//! Rejection tests send the bad frames first and a good one last, then
//! assert that the first delivered event is the good one.

mod common;

use std::sync::Arc;

use common::{collector, local_backend, next_event, relay_backend, TestResult};
use staticnet_backend::memory::{MemoryNetwork, MemoryRelayNetwork};
use staticnet_backend::substrate::{PubSubTransport, RelayClient};
use staticnet_backend::{Event, EventCallback, StaticIdBackend};
use staticnet_crypto::identity::StaticId;
use staticnet_crypto::signing::{Keypair, Signature};
use staticnet_keystore::AccountRef;
use staticnet_protocol::envelope::{encode_envelope, Domain};
use staticnet_protocol::payload::EventPayload;
use staticnet_protocol::pointer::StaticPointer;
use staticnet_protocol::signing::sign_envelope;
use staticnet_protocol::topic::{derive_update_topic, static_topic};
use staticnet_types::{Timestamp, Topic};

#[tokio::test]
async fn bind_pushes_update_to_remote_subscriber() -> TestResult {
    let network = MemoryNetwork::new();
    let publisher = local_backend(&network)?;
    let watcher = local_backend(&network)?;

    let id = publisher.current_account_id().await?;
    let (callback, mut events) = collector();
    watcher.subscribe_to_updates(&id, callback).await?;

    publisher.bind("bafy456", &AccountRef::self_account(), None).await?;

    let event = next_event(&mut events).await;
    assert_eq!(event.from, id);
    assert_eq!(event.topic, derive_update_topic(&id));
    assert_eq!(event.text.as_deref(), Some("/ipfs/bafy456"));
    assert!(event.json.is_none());
    Ok(())
}

#[tokio::test]
async fn json_payload_arrives_decoded() -> TestResult {
    let network = MemoryNetwork::new();
    let a = local_backend(&network)?;
    let b = local_backend(&network)?;
    let topic = Topic::from("chat");

    let (callback, mut events) = collector();
    b.subscribe(&topic, callback).await?;
    a.publish_event(&topic, serde_json::json!({"msg": "hi"}).into()).await?;

    let event = next_event(&mut events).await;
    assert_eq!(event.json, Some(serde_json::json!({"msg": "hi"})));
    assert_eq!(event.from, a.current_account_id().await?);
    Ok(())
}

#[tokio::test]
async fn every_subscriber_of_a_topic_is_called() -> TestResult {
    let network = MemoryNetwork::new();
    let backend = local_backend(&network)?;
    let topic = Topic::from("fanout");

    let (first, mut first_events) = collector();
    let (second, mut second_events) = collector();
    backend.subscribe(&topic, first).await?;
    backend.subscribe(&topic, second).await?;
    assert_eq!(backend.core().channel().subscribed_topics(), vec![topic.clone()]);

    backend.publish_event(&topic, "ping".into()).await?;
    assert_eq!(next_event(&mut first_events).await.text.as_deref(), Some("ping"));
    assert_eq!(next_event(&mut second_events).await.text.as_deref(), Some("ping"));
    Ok(())
}

#[tokio::test]
async fn publish_by_static_id_signs_with_that_key() -> TestResult {
    let network = MemoryNetwork::new();
    let backend = local_backend(&network)?;
    let topic = Topic::from("blog");
    let blog = backend.create_account("blog").await?;

    let (callback, mut events) = collector();
    backend.subscribe(&topic, callback).await?;
    backend
        .publish_event_by_static_id(&blog, &topic, EventPayload::Bytes(vec![0xFF, 0x00]))
        .await?;

    let event = next_event(&mut events).await;
    assert_eq!(event.from, blog);
    assert_eq!(event.data, vec![0xFF, 0x00]);
    assert!(event.text.is_none());
    Ok(())
}

#[tokio::test]
async fn oversized_publish_is_rejected() -> TestResult {
    let backend = local_backend(&MemoryNetwork::new())?;
    let result = backend
        .publish_event(&Topic::from("big"), EventPayload::Bytes(vec![0; 70_000]))
        .await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn malformed_unsigned_and_foreign_frames_are_dropped() -> TestResult {
    let network = MemoryNetwork::new();
    let backend = local_backend(&network)?;
    let topic = Topic::from("guarded");
    let (callback, mut events) = collector();
    backend.subscribe(&topic, callback).await?;

    let node = backend.node();
    let kp = Keypair::from_seed(&[0x42; 32]);

    // Not an envelope.
    node.broadcast(&topic, b"garbage".to_vec()).await?;

    // Envelope with its signature zeroed.
    let mut unsigned = sign_envelope(Domain::LocalNode, &kp, &topic, b"forged".to_vec())?;
    unsigned.signature = Signature::from_bytes([0; 64]);
    node.broadcast(&topic, encode_envelope(&unsigned)?).await?;

    // Correctly signed for the other backend.
    let foreign = sign_envelope(Domain::Relay, &kp, &topic, b"foreign".to_vec())?;
    node.broadcast(&topic, encode_envelope(&foreign)?).await?;

    // Correctly signed for a different topic.
    let elsewhere = sign_envelope(Domain::LocalNode, &kp, &Topic::from("other"), b"moved".to_vec())?;
    node.broadcast(&topic, encode_envelope(&elsewhere)?).await?;

    let good = sign_envelope(Domain::LocalNode, &kp, &topic, b"good".to_vec())?;
    node.broadcast(&topic, encode_envelope(&good)?).await?;

    let event = next_event(&mut events).await;
    assert_eq!(event.text.as_deref(), Some("good"));
    assert_eq!(event.from, StaticId::derive(&kp.public_key())?);
    Ok(())
}

#[tokio::test]
async fn relay_owner_topics_reject_other_senders() -> TestResult {
    let relay = MemoryRelayNetwork::new()?;
    let owner = relay_backend(&relay)?;
    let watcher = relay_backend(&relay)?;
    let intruder = relay.client()?;

    let owner_id = owner.current_account_id().await?;
    let topic = static_topic(&owner_id, "profile");
    let (callback, mut events) = collector();
    watcher.subscribe(&topic, callback).await?;

    let impostor = Keypair::from_seed(&[0x66; 32]);
    let forged = sign_envelope(Domain::Relay, &impostor, &topic, b"fake".to_vec())?;
    intruder.fanout(&topic, encode_envelope(&forged)?).await?;

    owner.publish_event(&topic, "real".into()).await?;

    let event = next_event(&mut events).await;
    assert_eq!(event.text.as_deref(), Some("real"));
    assert_eq!(event.static_kind.as_deref(), Some("profile"));
    Ok(())
}

#[tokio::test]
async fn relay_subscription_lists_peer() -> TestResult {
    let relay = MemoryRelayNetwork::new()?;
    let owner = relay_backend(&relay)?;
    let watcher = relay_backend(&relay)?;

    let id = owner.current_account_id().await?;
    let (callback, _events) = collector();
    watcher.subscribe_to_updates(&id, callback).await?;

    let peers = owner.static_id_peers(&id).await?;
    assert_eq!(peers, vec![watcher.client().peer_id()]);
    Ok(())
}

#[tokio::test]
async fn update_subscription_ignores_other_signers() -> TestResult {
    let network = MemoryNetwork::new();
    let owner = local_backend(&network)?;
    let watcher = local_backend(&network)?;

    let id = owner.current_account_id().await?;
    let (callback, mut events) = collector();
    watcher.subscribe_to_updates(&id, callback).await?;

    let attacker = Keypair::from_seed(&[0x66; 32]);
    let topic = derive_update_topic(&id);
    let forged = sign_envelope(Domain::LocalNode, &attacker, &topic, b"/ipfs/evil".to_vec())?;
    watcher.node().broadcast(&topic, encode_envelope(&forged)?).await?;

    owner.bind("bafy789", &AccountRef::self_account(), None).await?;

    let event = next_event(&mut events).await;
    assert_eq!(event.from, id);
    assert_eq!(event.text.as_deref(), Some("/ipfs/bafy789"));
    assert!(events.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn forged_pointer_payload_arrives_without_pointer() -> TestResult {
    let network = MemoryNetwork::new();
    let a = local_backend(&network)?;
    let b = local_backend(&network)?;
    let topic = Topic::from("pointers");
    let (callback, mut events) = collector();
    b.subscribe(&topic, callback).await?;

    let kp = Keypair::from_seed(&[0x42; 32]);
    let mut forged = StaticPointer::sign(&kp, "/ipfs/bafy", Timestamp::now())?;
    forged.value = "/ipfs/evil".to_string();
    a.publish_event(&topic, EventPayload::Bytes(forged.encode()?)).await?;

    let genuine = StaticPointer::sign(&kp, "/ipfs/bafy", Timestamp::now())?;
    a.publish_event(&topic, EventPayload::Bytes(genuine.encode()?)).await?;

    let first = next_event(&mut events).await;
    assert!(first.pointer.is_none());
    assert!(!first.data.is_empty());

    let second = next_event(&mut events).await;
    assert_eq!(second.pointer, Some(genuine));
    Ok(())
}

#[tokio::test]
async fn panicking_callback_does_not_stop_delivery() -> TestResult {
    let network = MemoryNetwork::new();
    let backend = local_backend(&network)?;
    let topic = Topic::from("fragile");

    let failing: EventCallback = Arc::new(|event: Event| {
        if event.text.as_deref() == Some("one") {
            panic!("subscriber failed on {:?}", event.text);
        }
    });
    let (steady, mut steady_events) = collector();
    backend.subscribe(&topic, failing).await?;
    backend.subscribe(&topic, steady).await?;

    backend.publish_event(&topic, "one".into()).await?;
    assert_eq!(next_event(&mut steady_events).await.text.as_deref(), Some("one"));

    let (late, mut late_events) = collector();
    backend.subscribe(&topic, late).await?;
    backend.publish_event(&topic, "two".into()).await?;
    assert_eq!(next_event(&mut steady_events).await.text.as_deref(), Some("two"));
    assert_eq!(next_event(&mut late_events).await.text.as_deref(), Some("two"));
    assert_eq!(backend.core().channel().subscribed_topics(), vec![topic]);
    Ok(())
}
