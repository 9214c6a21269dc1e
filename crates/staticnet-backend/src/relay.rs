//! Backend over a relay/DHT client.
//!
//! Pointer records are registered as relay values under the text form
//! of the routing key; events are fanned out through the relay. Events
//! are signed in the [`Domain::Relay`] domain. The relay has no notion of
//! a local topic list, bootstrap list or listen address, so those
//! queries return empty lists.

use std::sync::Arc;

use async_trait::async_trait;
use libp2p::{Multiaddr, PeerId};
use staticnet_keystore::KeyStore;
use staticnet_protocol::envelope::Domain;
use staticnet_protocol::topic::RoutingKey;
use staticnet_types::config::StaticNetConfig;
use staticnet_types::{Result, Topic};

use crate::backend::{StaticCore, StaticIdBackend};
use crate::substrate::{FrameReceiver, PubSubTransport, RecordRouting, RelayClient};

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// [`RecordRouting`] view of a relay client.
struct RelayRouting<R>(Arc<R>);

#[async_trait]
impl<R: RelayClient + 'static> RecordRouting for RelayRouting<R> {
    async fn put_record(&self, key: &RoutingKey, record: Vec<u8>) -> Result<()> {
        self.0.register_value(&key.to_text(), record).await
    }

    async fn get_records(&self, key: &RoutingKey) -> Result<Vec<Vec<u8>>> {
        let subscribers = self.0.find_subscribers(&key.to_text()).await?;
        Ok(subscribers
            .into_iter()
            .map(|s| s.value)
            .filter(|value| !value.is_empty())
            .collect())
    }
}

/// [`PubSubTransport`] view of a relay client.
struct RelayPubSub<R>(Arc<R>);

#[async_trait]
impl<R: RelayClient + 'static> PubSubTransport for RelayPubSub<R> {
    async fn broadcast(&self, topic: &Topic, frame: Vec<u8>) -> Result<()> {
        self.0.fanout(topic, frame).await
    }

    async fn listen(&self, topic: &Topic) -> Result<FrameReceiver> {
        self.0.listen(topic).await
    }
}

// ---------------------------------------------------------------------------
// RelayBackend
// ---------------------------------------------------------------------------

/// [`StaticIdBackend`] driving a [`RelayClient`].
pub struct RelayBackend<R: RelayClient + 'static> {
    client: Arc<R>,
    core: StaticCore,
}

impl<R: RelayClient + 'static> RelayBackend<R> {
    /// Creates a backend over `client` using the accounts in `keys`.
    pub fn new(client: Arc<R>, keys: Arc<KeyStore>, config: StaticNetConfig) -> Result<Self> {
        let core = StaticCore::new(
            Domain::Relay,
            keys,
            Arc::new(RelayRouting(Arc::clone(&client))),
            Arc::new(RelayPubSub(Arc::clone(&client))),
            config,
        )?;
        Ok(Self { client, core })
    }

    /// The underlying client.
    pub fn client(&self) -> &Arc<R> {
        &self.client
    }

    /// Peer id of the relay the client is attached to.
    pub fn relay_peer_id(&self) -> PeerId {
        self.client.relay_peer_id()
    }
}

#[async_trait]
impl<R: RelayClient + 'static> StaticIdBackend for RelayBackend<R> {
    fn core(&self) -> &StaticCore {
        &self.core
    }

    async fn peers(&self, topic: &Topic) -> Result<Vec<PeerId>> {
        let own = self.client.local_peer_id();
        let subscribers = self.client.find_subscribers(topic.as_str()).await?;
        Ok(subscribers
            .into_iter()
            .map(|s| s.peer_id)
            .filter(|peer| *peer != own)
            .collect())
    }

    async fn pubsub_topics(&self) -> Result<Vec<Topic>> {
        Ok(Vec::new())
    }

    async fn boot_node_list(&self) -> Result<Vec<Multiaddr>> {
        Ok(Vec::new())
    }

    async fn add_boot_node(&self, _addr: &Multiaddr) -> Result<Vec<Multiaddr>> {
        Ok(Vec::new())
    }

    async fn remove_boot_node(&self, _addr: &Multiaddr) -> Result<Vec<Multiaddr>> {
        Ok(Vec::new())
    }

    async fn node_addresses(&self) -> Result<Vec<Multiaddr>> {
        Ok(Vec::new())
    }
}
