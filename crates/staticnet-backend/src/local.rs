//! Backend over a local peer node.
//!
//! Records go through the node's routing layer, events through its
//! gossip pub/sub, and every topology query maps onto the node. Events
//! are signed in the [`Domain::LocalNode`] domain.

use std::sync::Arc;

use async_trait::async_trait;
use libp2p::{Multiaddr, PeerId};
use staticnet_keystore::KeyStore;
use staticnet_protocol::envelope::Domain;
use staticnet_types::config::StaticNetConfig;
use staticnet_types::{Result, StaticNetError, Topic};

use crate::backend::{StaticCore, StaticIdBackend};
use crate::substrate::{LocalNode, PubSubTransport, RecordRouting};

/// [`StaticIdBackend`] driving a [`LocalNode`].
pub struct LocalNodeBackend<N: LocalNode + 'static> {
    node: Arc<N>,
    core: StaticCore,
}

impl<N: LocalNode + 'static> LocalNodeBackend<N> {
    /// Creates a backend over `node` using the accounts in `keys`.
    pub fn new(node: Arc<N>, keys: Arc<KeyStore>, config: StaticNetConfig) -> Result<Self> {
        let core = StaticCore::new(
            Domain::LocalNode,
            keys,
            Arc::clone(&node) as Arc<dyn RecordRouting>,
            Arc::clone(&node) as Arc<dyn PubSubTransport>,
            config,
        )?;
        Ok(Self { node, core })
    }

    /// The underlying node.
    pub fn node(&self) -> &Arc<N> {
        &self.node
    }
}

#[async_trait]
impl<N: LocalNode + 'static> StaticIdBackend for LocalNodeBackend<N> {
    fn core(&self) -> &StaticCore {
        &self.core
    }

    async fn peers(&self, topic: &Topic) -> Result<Vec<PeerId>> {
        self.node.topic_peers(topic).await
    }

    async fn pubsub_topics(&self) -> Result<Vec<Topic>> {
        self.node.subscribed_topics().await
    }

    /// Bounded by the configured boot-list timeout. A late answer is
    /// discarded.
    async fn boot_node_list(&self) -> Result<Vec<Multiaddr>> {
        let limit = self.core.config().boot_list_timeout();
        tokio::time::timeout(limit, self.node.bootstrap_list())
            .await
            .map_err(|_| StaticNetError::BackendTimeout {
                operation: "boot node list".into(),
                after_ms: self.core.config().boot_list_timeout_ms,
            })?
    }

    /// A failed dial after adding is only logged.
    async fn add_boot_node(&self, addr: &Multiaddr) -> Result<Vec<Multiaddr>> {
        let list = self.node.bootstrap_add(addr).await?;
        if let Err(e) = self.node.connect(addr).await {
            tracing::warn!(%addr, error = %e, "boot node added but connect failed");
        }
        Ok(list)
    }

    async fn remove_boot_node(&self, addr: &Multiaddr) -> Result<Vec<Multiaddr>> {
        self.node.disconnect(addr).await?;
        self.node.bootstrap_remove(addr).await
    }

    async fn node_addresses(&self) -> Result<Vec<Multiaddr>> {
        self.node.listen_addresses().await
    }
}
