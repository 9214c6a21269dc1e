//! Shared fixtures for the backend integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use staticnet_backend::memory::{MemoryNetwork, MemoryNode, MemoryRelay, MemoryRelayNetwork};
use staticnet_backend::{Event, EventCallback, LocalNodeBackend, RelayBackend};
use staticnet_keystore::KeyStore;
use staticnet_types::config::StaticNetConfig;
use staticnet_types::Result;
use tokio::sync::mpsc;

pub type TestResult = std::result::Result<(), staticnet_types::StaticNetError>;

/// Upper bound on waiting for an expected delivery.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn local_backend(network: &MemoryNetwork) -> Result<LocalNodeBackend<MemoryNode>> {
    LocalNodeBackend::new(
        network.node()?,
        Arc::new(KeyStore::in_memory()),
        StaticNetConfig::default(),
    )
}

pub fn relay_backend(network: &MemoryRelayNetwork) -> Result<RelayBackend<MemoryRelay>> {
    RelayBackend::new(
        network.client()?,
        Arc::new(KeyStore::in_memory()),
        StaticNetConfig::default(),
    )
}

/// Callback forwarding every event into a channel.
pub fn collector() -> (EventCallback, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: EventCallback = Arc::new(move |event: Event| {
        let _ = tx.send(event);
    });
    (callback, rx)
}

/// Waits for the next event, failing the test on timeout.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    match tokio::time::timeout(DELIVERY_TIMEOUT, rx.recv()).await {
        Ok(Some(event)) => event,
        Ok(None) => panic!("event stream closed"),
        Err(_) => panic!("no event within {DELIVERY_TIMEOUT:?}"),
    }
}
