//! In-process substrates.
//!
//! [`MemoryNetwork`] hands out [`MemoryNode`]s that share one record
//! table and one gossip fabric; [`MemoryRelayNetwork`] hands out
//! [`MemoryRelay`] clients attached to one relay. Both deliver a
//! broadcast to every listener of the topic, the sender included.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use libp2p::multiaddr::Protocol;
use libp2p::{Multiaddr, PeerId};
use staticnet_crypto::identity::StaticId;
use staticnet_crypto::signing::Keypair;
use staticnet_protocol::topic::RoutingKey;
use staticnet_types::{Result, StaticNetError, Topic};
use tokio::sync::mpsc;

use crate::substrate::{
    FrameReceiver, LocalNode, PubSubTransport, RecordRouting, RelayClient, RelaySubscriber,
};

fn random_peer_id() -> Result<PeerId> {
    Ok(*StaticId::derive(&Keypair::generate().public_key())?.peer_id())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Listener table shared by both in-memory substrates.
#[derive(Default)]
struct Fabric {
    listeners: HashMap<Topic, Vec<(PeerId, mpsc::UnboundedSender<Vec<u8>>)>>,
}

impl Fabric {
    fn listen(&mut self, peer_id: PeerId, topic: &Topic) -> FrameReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.entry(topic.clone()).or_default().push((peer_id, tx));
        rx
    }

    fn broadcast(&mut self, topic: &Topic, frame: &[u8]) {
        if let Some(listeners) = self.listeners.get_mut(topic) {
            listeners.retain(|(_, tx)| tx.send(frame.to_vec()).is_ok());
        }
    }

    fn live_peers(&mut self, topic: &Topic) -> Vec<PeerId> {
        let Some(listeners) = self.listeners.get_mut(topic) else {
            return Vec::new();
        };
        listeners.retain(|(_, tx)| !tx.is_closed());
        let mut peers: Vec<PeerId> = listeners.iter().map(|(peer, _)| *peer).collect();
        peers.sort();
        peers.dedup();
        peers
    }
}

// ---------------------------------------------------------------------------
// MemoryNetwork / MemoryNode
// ---------------------------------------------------------------------------

#[derive(Default)]
struct NetworkState {
    records: HashMap<RoutingKey, Vec<u8>>,
    fabric: Fabric,
    addresses: HashSet<Multiaddr>,
    next_port: u64,
}

/// Shared fabric for [`MemoryNode`]s.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node listening on a fresh `/memory/<n>` address.
    pub fn node(&self) -> Result<Arc<MemoryNode>> {
        let peer_id = random_peer_id()?;
        let address = {
            let mut state = lock(&self.state);
            state.next_port += 1;
            let address = Multiaddr::empty().with(Protocol::Memory(state.next_port));
            state.addresses.insert(address.clone());
            address
        };

        Ok(Arc::new(MemoryNode {
            peer_id,
            address,
            network: self.clone(),
            bootstrap: Mutex::new(Vec::new()),
            connected: Mutex::new(HashSet::new()),
            unresponsive: AtomicBool::new(false),
            bootstrap_delay: Mutex::new(Duration::ZERO),
        }))
    }
}

/// In-process [`LocalNode`].
///
/// Records are a single shared table: a put replaces whatever any node
/// stored under the key.
pub struct MemoryNode {
    peer_id: PeerId,
    address: Multiaddr,
    network: MemoryNetwork,
    bootstrap: Mutex<Vec<Multiaddr>>,
    connected: Mutex<HashSet<Multiaddr>>,
    unresponsive: AtomicBool,
    bootstrap_delay: Mutex<Duration>,
}

impl MemoryNode {
    /// Peer id of this node.
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Listen address of this node.
    pub fn address(&self) -> &Multiaddr {
        &self.address
    }

    /// Makes [`LocalNode::bootstrap_list`] hang forever while set.
    pub fn set_unresponsive(&self, unresponsive: bool) {
        self.unresponsive.store(unresponsive, Ordering::SeqCst);
    }

    /// Makes [`LocalNode::bootstrap_list`] answer only after `delay`.
    pub fn set_bootstrap_delay(&self, delay: Duration) {
        *lock(&self.bootstrap_delay) = delay;
    }

    /// Addresses this node is currently connected to.
    pub fn connections(&self) -> Vec<Multiaddr> {
        let mut addrs: Vec<Multiaddr> = lock(&self.connected).iter().cloned().collect();
        addrs.sort_by_key(|a| a.to_string());
        addrs
    }
}

#[async_trait]
impl RecordRouting for MemoryNode {
    async fn put_record(&self, key: &RoutingKey, record: Vec<u8>) -> Result<()> {
        lock(&self.network.state).records.insert(key.clone(), record);
        Ok(())
    }

    async fn get_records(&self, key: &RoutingKey) -> Result<Vec<Vec<u8>>> {
        Ok(lock(&self.network.state)
            .records
            .get(key)
            .cloned()
            .into_iter()
            .collect())
    }
}

#[async_trait]
impl PubSubTransport for MemoryNode {
    async fn broadcast(&self, topic: &Topic, frame: Vec<u8>) -> Result<()> {
        lock(&self.network.state).fabric.broadcast(topic, &frame);
        Ok(())
    }

    async fn listen(&self, topic: &Topic) -> Result<FrameReceiver> {
        Ok(lock(&self.network.state).fabric.listen(self.peer_id, topic))
    }
}

#[async_trait]
impl LocalNode for MemoryNode {
    async fn topic_peers(&self, topic: &Topic) -> Result<Vec<PeerId>> {
        let peers = lock(&self.network.state).fabric.live_peers(topic);
        Ok(peers.into_iter().filter(|p| *p != self.peer_id).collect())
    }

    async fn subscribed_topics(&self) -> Result<Vec<Topic>> {
        let mut state = lock(&self.network.state);
        let topics: Vec<Topic> = state.fabric.listeners.keys().cloned().collect();
        let mut own: Vec<Topic> = topics
            .into_iter()
            .filter(|topic| state.fabric.live_peers(topic).contains(&self.peer_id))
            .collect();
        own.sort();
        Ok(own)
    }

    async fn bootstrap_list(&self) -> Result<Vec<Multiaddr>> {
        if self.unresponsive.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let delay = *lock(&self.bootstrap_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(lock(&self.bootstrap).clone())
    }

    async fn bootstrap_add(&self, addr: &Multiaddr) -> Result<Vec<Multiaddr>> {
        let mut bootstrap = lock(&self.bootstrap);
        if !bootstrap.contains(addr) {
            bootstrap.push(addr.clone());
        }
        Ok(bootstrap.clone())
    }

    async fn bootstrap_remove(&self, addr: &Multiaddr) -> Result<Vec<Multiaddr>> {
        let mut bootstrap = lock(&self.bootstrap);
        bootstrap.retain(|a| a != addr);
        Ok(bootstrap.clone())
    }

    async fn connect(&self, addr: &Multiaddr) -> Result<()> {
        if !lock(&self.network.state).addresses.contains(addr) {
            return Err(StaticNetError::BackendError {
                reason: format!("no node listening on {addr}"),
            });
        }
        lock(&self.connected).insert(addr.clone());
        Ok(())
    }

    async fn disconnect(&self, addr: &Multiaddr) -> Result<()> {
        lock(&self.connected).remove(addr);
        Ok(())
    }

    async fn listen_addresses(&self) -> Result<Vec<Multiaddr>> {
        Ok(vec![self.address.clone()])
    }
}

// ---------------------------------------------------------------------------
// MemoryRelayNetwork / MemoryRelay
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RelayState {
    registrations: HashMap<String, Vec<RelaySubscriber>>,
    fabric: Fabric,
}

/// A single in-process relay shared by [`MemoryRelay`] clients.
#[derive(Clone)]
pub struct MemoryRelayNetwork {
    relay_id: PeerId,
    state: Arc<Mutex<RelayState>>,
}

impl MemoryRelayNetwork {
    /// Creates a relay with a random peer id.
    pub fn new() -> Result<Self> {
        Ok(Self {
            relay_id: random_peer_id()?,
            state: Arc::new(Mutex::new(RelayState::default())),
        })
    }

    /// Attaches a new client.
    pub fn client(&self) -> Result<Arc<MemoryRelay>> {
        Ok(Arc::new(MemoryRelay {
            peer_id: random_peer_id()?,
            network: self.clone(),
        }))
    }

    /// Peer id of the relay.
    pub fn relay_id(&self) -> PeerId {
        self.relay_id
    }
}

/// In-process [`RelayClient`].
pub struct MemoryRelay {
    peer_id: PeerId,
    network: MemoryRelayNetwork,
}

impl MemoryRelay {
    /// Peer id of this client.
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }
}

#[async_trait]
impl RelayClient for MemoryRelay {
    fn relay_peer_id(&self) -> PeerId {
        self.network.relay_id
    }

    fn local_peer_id(&self) -> PeerId {
        self.peer_id
    }

    async fn register_value(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut state = lock(&self.network.state);
        let entries = state.registrations.entry(key.to_string()).or_default();
        match entries.iter_mut().find(|s| s.peer_id == self.peer_id) {
            Some(existing) => existing.value = value,
            None => entries.push(RelaySubscriber {
                peer_id: self.peer_id,
                relay_id: self.network.relay_id,
                value,
            }),
        }
        Ok(())
    }

    async fn find_subscribers(&self, key: &str) -> Result<Vec<RelaySubscriber>> {
        Ok(lock(&self.network.state)
            .registrations
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn fanout(&self, topic: &Topic, frame: Vec<u8>) -> Result<()> {
        lock(&self.network.state).fabric.broadcast(topic, &frame);
        Ok(())
    }

    async fn listen(&self, topic: &Topic) -> Result<FrameReceiver> {
        self.register_value(topic.as_str(), Vec::new()).await?;
        Ok(lock(&self.network.state).fabric.listen(self.peer_id, topic))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_all_listeners() -> Result<()> {
        let network = MemoryNetwork::new();
        let a = network.node()?;
        let b = network.node()?;
        let topic = Topic::from("news");
        let mut rx_a = a.listen(&topic).await?;
        let mut rx_b = b.listen(&topic).await?;

        a.broadcast(&topic, b"hi".to_vec()).await?;
        assert_eq!(rx_a.recv().await, Some(b"hi".to_vec()));
        assert_eq!(rx_b.recv().await, Some(b"hi".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn topic_peers_exclude_self_and_dropped() -> Result<()> {
        let network = MemoryNetwork::new();
        let a = network.node()?;
        let b = network.node()?;
        let topic = Topic::from("news");
        let _rx_a = a.listen(&topic).await?;
        let rx_b = b.listen(&topic).await?;

        assert_eq!(a.topic_peers(&topic).await?, vec![b.peer_id()]);
        drop(rx_b);
        assert!(a.topic_peers(&topic).await?.is_empty());
        assert_eq!(a.subscribed_topics().await?, vec![topic]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_list_answers_after_delay() -> Result<()> {
        let network = MemoryNetwork::new();
        let a = network.node()?;
        let b = network.node()?;
        a.bootstrap_add(b.address()).await?;
        a.set_bootstrap_delay(Duration::from_millis(300));

        let started = tokio::time::Instant::now();
        assert_eq!(a.bootstrap_list().await?, vec![b.address().clone()]);
        assert!(started.elapsed() >= Duration::from_millis(300));
        Ok(())
    }

    #[tokio::test]
    async fn connect_requires_known_address() -> Result<()> {
        let network = MemoryNetwork::new();
        let a = network.node()?;
        let b = network.node()?;
        a.connect(b.address()).await?;
        assert_eq!(a.connections(), vec![b.address().clone()]);

        let nowhere = Multiaddr::empty().with(Protocol::Memory(9_999));
        assert!(a.connect(&nowhere).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn relay_registration_replaces_own_value() -> Result<()> {
        let relay = MemoryRelayNetwork::new()?;
        let a = relay.client()?;
        let b = relay.client()?;
        a.register_value("k", b"1".to_vec()).await?;
        a.register_value("k", b"2".to_vec()).await?;
        b.register_value("k", b"3".to_vec()).await?;

        let values: Vec<Vec<u8>> = a
            .find_subscribers("k")
            .await?
            .into_iter()
            .map(|s| s.value)
            .collect();
        assert_eq!(values, vec![b"2".to_vec(), b"3".to_vec()]);
        Ok(())
    }

    #[tokio::test]
    async fn relay_listen_registers_subscriber() -> Result<()> {
        let relay = MemoryRelayNetwork::new()?;
        let a = relay.client()?;
        let topic = Topic::from("news");
        let _rx = a.listen(&topic).await?;
        let subscribers = a.find_subscribers("news").await?;
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers[0].peer_id, a.peer_id());
        assert_eq!(subscribers[0].relay_id, relay.relay_id());
        Ok(())
    }
}
