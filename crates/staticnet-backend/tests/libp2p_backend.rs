//! The local-node backend driving a real libp2p swarm on loopback.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{collector, next_event, TestResult};
use libp2p::multiaddr::Protocol;
use libp2p::Multiaddr;
use staticnet_backend::{Libp2pNode, Libp2pNodeConfig, LocalNodeBackend, StaticIdBackend};
use staticnet_crypto::signing::Keypair;
use staticnet_keystore::{AccountRef, KeyStore};
use staticnet_types::config::StaticNetConfig;

fn loopback_backend(seed: u8) -> staticnet_types::Result<LocalNodeBackend<Libp2pNode>> {
    let config = Libp2pNodeConfig {
        listen_addrs: vec![Multiaddr::empty()
            .with(Protocol::Ip4([127, 0, 0, 1].into()))
            .with(Protocol::Tcp(0))],
        ..Libp2pNodeConfig::default()
    };
    let node = Libp2pNode::spawn(&Keypair::from_seed(&[seed; 32]), config)?;
    LocalNodeBackend::new(
        Arc::new(node),
        Arc::new(KeyStore::in_memory()),
        StaticNetConfig::default(),
    )
}

#[tokio::test]
async fn bind_and_resolve_through_kademlia() -> TestResult {
    let backend = loopback_backend(0x42)?;
    let id = backend.current_account_id().await?;

    let (callback, mut updates) = collector();
    backend.subscribe_to_updates(&id, callback).await?;
    assert_eq!(backend.pubsub_topics().await?.len(), 1);

    backend
        .bind("bafy456", &AccountRef::self_account(), None)
        .await?;

    let update = next_event(&mut updates).await;
    assert_eq!(update.from, id);
    assert_eq!(update.text.as_deref(), Some("/ipfs/bafy456"));

    let resolved = backend.resolve(&AccountRef::ById(id)).await?;
    assert_eq!(resolved.as_deref(), Some("/ipfs/bafy456"));
    Ok(())
}

#[tokio::test]
async fn node_reports_loopback_listen_address() -> TestResult {
    let backend = loopback_backend(0x43)?;

    let mut addresses = Vec::new();
    for _ in 0..100 {
        addresses = backend.node_addresses().await?;
        if !addresses.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(addresses
        .iter()
        .any(|a| a.to_string().starts_with("/ip4/127.0.0.1/tcp/")));
    assert!(backend.boot_node_list().await?.is_empty());
    Ok(())
}
