//! The backend contract.
//!
//! [`StaticIdBackend`] is the single capability surface callers program
//! against. Account, naming and event operations have default
//! implementations over a [`StaticCore`]; each backend supplies only the
//! core and the topology queries of its substrate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use libp2p::{Multiaddr, PeerId};
use staticnet_crypto::identity::StaticId;
use staticnet_crypto::signing::PublicKey;
use staticnet_keystore::{AccountRef, KeyStore, PeerIdentity, SELF_ACCOUNT};
use staticnet_protocol::envelope::Domain;
use staticnet_protocol::payload::EventPayload;
use staticnet_protocol::pointer::StaticPointer;
use staticnet_protocol::topic::derive_update_topic;
use staticnet_types::config::StaticNetConfig;
use staticnet_types::{Result, Topic};

use crate::channel::{Event, EventCallback, EventChannel};
use crate::name::NameService;
use crate::substrate::{PubSubTransport, RecordRouting};

// ---------------------------------------------------------------------------
// StaticCore
// ---------------------------------------------------------------------------

/// Key store, name service and event channel shared by every backend.
pub struct StaticCore {
    keys: Arc<KeyStore>,
    names: NameService,
    channel: Arc<EventChannel>,
    config: StaticNetConfig,
}

impl StaticCore {
    /// Wires the shared components over a substrate's routing and
    /// transport views.
    ///
    /// # Errors
    ///
    /// Returns [`staticnet_types::StaticNetError::ConfigError`] if
    /// `config` does not validate.
    pub fn new(
        domain: Domain,
        keys: Arc<KeyStore>,
        routing: Arc<dyn RecordRouting>,
        transport: Arc<dyn PubSubTransport>,
        config: StaticNetConfig,
    ) -> Result<Self> {
        config.validate()?;
        let channel = Arc::new(EventChannel::new(domain, Arc::clone(&keys), transport, &config));
        let names = NameService::new(Arc::clone(&keys), routing, Arc::clone(&channel), &config)?;
        Ok(Self {
            keys,
            names,
            channel,
            config,
        })
    }

    /// Account keys.
    pub fn keys(&self) -> &Arc<KeyStore> {
        &self.keys
    }

    /// Name service.
    pub fn names(&self) -> &NameService {
        &self.names
    }

    /// Event channel.
    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    /// Active configuration.
    pub fn config(&self) -> &StaticNetConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// StaticIdBackend
// ---------------------------------------------------------------------------

/// Uniform contract over both peer-to-peer backends.
#[async_trait]
pub trait StaticIdBackend: Send + Sync {
    /// Shared components.
    fn core(&self) -> &StaticCore;

    /// Signing domain; identifies the backend kind.
    fn domain(&self) -> Domain {
        self.core().channel().domain()
    }

    // -- Accounts ---------------------------------------------------------

    /// Creates the account `name` if absent and returns its identifier.
    async fn create_account(&self, name: &str) -> Result<StaticId> {
        self.core().keys().get_or_create(name)
    }

    /// Removes the account `name`, if present.
    async fn remove_account(&self, name: &str) -> Result<()> {
        self.core().keys().remove(name)
    }

    /// Identifier of the account `name`.
    async fn account_id_by_name(&self, name: &str) -> Result<Option<StaticId>> {
        Ok(self.core().keys().id_by_name(name))
    }

    /// Name of the account holding `id`.
    async fn account_name_by_id(&self, id: &StaticId) -> Result<Option<String>> {
        Ok(self.core().keys().name_by_id(id))
    }

    /// Identifier of `"self"`, created on first use.
    async fn current_account_id(&self) -> Result<StaticId> {
        self.core().keys().get_or_create(SELF_ACCOUNT)
    }

    /// Signing identity of `account`.
    async fn peer_identity(&self, account: &AccountRef) -> Result<PeerIdentity> {
        self.core().keys().peer_identity(account)
    }

    /// Public key of `account`.
    async fn public_key(&self, account: &AccountRef) -> Result<PublicKey> {
        self.core().keys().public_key(account)
    }

    // -- Naming -----------------------------------------------------------

    /// Binds the identifier of `account` to `content_id`.
    async fn bind(
        &self,
        content_id: &str,
        account: &AccountRef,
        lifetime: Option<Duration>,
    ) -> Result<StaticId> {
        self.core().names().bind(content_id, account, lifetime).await
    }

    /// Current content id of `target`, if bound and unexpired.
    async fn resolve(&self, target: &AccountRef) -> Result<Option<String>> {
        self.core().names().resolve(target).await
    }

    /// Full validated pointer of `target`.
    async fn resolve_entry(&self, target: &AccountRef) -> Result<StaticPointer> {
        self.core().names().resolve_entry(target).await
    }

    // -- Events -----------------------------------------------------------

    /// Publishes `payload` on `topic` as `"self"`.
    async fn publish_event(&self, topic: &Topic, payload: EventPayload) -> Result<()> {
        self.core().channel().publish(topic, payload).await
    }

    /// Publishes `payload` on `topic` signed by `identity`.
    async fn publish_event_by_peer(
        &self,
        identity: &PeerIdentity,
        topic: &Topic,
        payload: EventPayload,
    ) -> Result<()> {
        self.core().channel().publish_as(identity, topic, payload).await
    }

    /// Publishes `payload` on `topic` signed by the held key of `id`.
    async fn publish_event_by_static_id(
        &self,
        id: &StaticId,
        topic: &Topic,
        payload: EventPayload,
    ) -> Result<()> {
        let identity = self.core().keys().peer_identity(&AccountRef::ById(*id))?;
        self.core().channel().publish_as(&identity, topic, payload).await
    }

    /// Registers `callback` for verified events on `topic`.
    async fn subscribe(&self, topic: &Topic, callback: EventCallback) -> Result<()> {
        self.core().channel().subscribe(topic, callback).await
    }

    /// Registers `callback` for bind announcements of `id`.
    ///
    /// Only events signed by `id` itself reach `callback`; anything else
    /// on the update topic is logged and dropped.
    async fn subscribe_to_updates(&self, id: &StaticId, callback: EventCallback) -> Result<()> {
        let owner = *id;
        let filtered: EventCallback = Arc::new(move |event: Event| {
            if event.from == owner {
                callback(event);
            } else {
                tracing::warn!(%owner, from = %event.from, "dropping update not signed by owner");
            }
        });
        self.subscribe(&derive_update_topic(id), filtered).await
    }

    // -- Topology ---------------------------------------------------------

    /// Peers subscribed to `topic`, never including this peer.
    async fn peers(&self, topic: &Topic) -> Result<Vec<PeerId>>;

    /// Peers subscribed to the update topic of `id`.
    async fn static_id_peers(&self, id: &StaticId) -> Result<Vec<PeerId>> {
        self.peers(&derive_update_topic(id)).await
    }

    /// Topics the underlying node listens on.
    async fn pubsub_topics(&self) -> Result<Vec<Topic>>;

    /// Bootstrap list of the underlying node.
    async fn boot_node_list(&self) -> Result<Vec<Multiaddr>>;

    /// Adds a boot node and returns the new list.
    async fn add_boot_node(&self, addr: &Multiaddr) -> Result<Vec<Multiaddr>>;

    /// Removes a boot node and returns the new list.
    async fn remove_boot_node(&self, addr: &Multiaddr) -> Result<Vec<Multiaddr>>;

    /// Addresses the underlying node listens on.
    async fn node_addresses(&self) -> Result<Vec<Multiaddr>>;
}
