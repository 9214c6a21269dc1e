//! Substrate traits.
//!
//! The backends never talk to a network stack directly. They drive one
//! of two substrate shapes: a [`LocalNode`] (record routing, gossip
//! pub/sub, bootstrap list, swarm control) or a [`RelayClient`] (value
//! registration and fan-out through a relay). [`RecordRouting`] and
//! [`PubSubTransport`] are the narrow views the name service and the
//! event channel need; the relay backend adapts its client to them.

use async_trait::async_trait;
use libp2p::{Multiaddr, PeerId};
use staticnet_protocol::topic::RoutingKey;
use staticnet_types::{Result, Topic};
use tokio::sync::mpsc;

/// Stream of raw frames delivered on one topic.
pub type FrameReceiver = mpsc::UnboundedReceiver<Vec<u8>>;

// ---------------------------------------------------------------------------
// Narrow views
// ---------------------------------------------------------------------------

/// Publish and fetch pointer records by routing key.
#[async_trait]
pub trait RecordRouting: Send + Sync {
    /// Stores `record` under `key`, replacing this peer's previous record.
    async fn put_record(&self, key: &RoutingKey, record: Vec<u8>) -> Result<()>;

    /// Returns every record currently stored under `key`.
    async fn get_records(&self, key: &RoutingKey) -> Result<Vec<Vec<u8>>>;
}

/// Broadcast and receive raw frames by topic.
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    /// Sends `frame` to every listener of `topic`.
    async fn broadcast(&self, topic: &Topic, frame: Vec<u8>) -> Result<()>;

    /// Opens a persistent subscription to `topic`.
    async fn listen(&self, topic: &Topic) -> Result<FrameReceiver>;
}

// ---------------------------------------------------------------------------
// Local peer node
// ---------------------------------------------------------------------------

/// A full peer node running in or next to this process.
#[async_trait]
pub trait LocalNode: RecordRouting + PubSubTransport {
    /// Peers known to be subscribed to `topic`.
    async fn topic_peers(&self, topic: &Topic) -> Result<Vec<PeerId>>;

    /// Topics this node listens on.
    async fn subscribed_topics(&self) -> Result<Vec<Topic>>;

    /// Current bootstrap list. May answer late, or never, on an
    /// unhealthy node.
    async fn bootstrap_list(&self) -> Result<Vec<Multiaddr>>;

    /// Adds `addr` to the bootstrap list and returns the new list.
    async fn bootstrap_add(&self, addr: &Multiaddr) -> Result<Vec<Multiaddr>>;

    /// Removes `addr` from the bootstrap list and returns the new list.
    async fn bootstrap_remove(&self, addr: &Multiaddr) -> Result<Vec<Multiaddr>>;

    /// Dials `addr`.
    async fn connect(&self, addr: &Multiaddr) -> Result<()>;

    /// Hangs up on `addr`.
    async fn disconnect(&self, addr: &Multiaddr) -> Result<()>;

    /// Addresses this node listens on.
    async fn listen_addresses(&self) -> Result<Vec<Multiaddr>>;
}

// ---------------------------------------------------------------------------
// Relay client
// ---------------------------------------------------------------------------

/// One registration under a relay key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelaySubscriber {
    /// Peer that registered.
    pub peer_id: PeerId,
    /// Relay the peer is attached to.
    pub relay_id: PeerId,
    /// Registered value. Empty for plain topic subscriptions.
    pub value: Vec<u8>,
}

/// Client attached to a relay that stores registrations and fans out
/// events.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Peer id of the relay this client is attached to.
    fn relay_peer_id(&self) -> PeerId;

    /// Peer id this client registers under.
    fn local_peer_id(&self) -> PeerId;

    /// Registers `value` under `key`, replacing this client's previous
    /// registration.
    async fn register_value(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Returns all registrations under `key`.
    async fn find_subscribers(&self, key: &str) -> Result<Vec<RelaySubscriber>>;

    /// Fans `frame` out to every listener of `topic`.
    async fn fanout(&self, topic: &Topic, frame: Vec<u8>) -> Result<()>;

    /// Registers as a subscriber of `topic` and returns its frame stream.
    async fn listen(&self, topic: &Topic) -> Result<FrameReceiver>;
}
