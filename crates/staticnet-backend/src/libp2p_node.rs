//! [`LocalNode`] over a libp2p swarm.
//!
//! [`Libp2pNode`] is a cheap handle. [`Libp2pNode::spawn`] builds a swarm
//! (TCP + Noise + Yamux, with QUIC alongside) carrying gossipsub, Kademlia
//! and Identify, and moves it into a task that owns it. Every trait call
//! becomes a [`Command`] on a bounded channel and is answered over a
//! oneshot, so all swarm access is sequential inside the event loop.
//!
//! Pointer records are Kademlia records keyed by the routing key. Frames
//! travel as gossipsub messages on an `IdentTopic` named after the topic;
//! a broadcast also reaches this node's own listeners, since gossipsub
//! never echoes a message to its publisher. The bootstrap list is kept by
//! the event loop and mirrored into the Kademlia routing table.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use libp2p::gossipsub::{self, IdentTopic, TopicHash};
use libp2p::identity;
use libp2p::kad::{self, store::MemoryStore};
use libp2p::multiaddr::Protocol;
use libp2p::swarm::{NetworkBehaviour, SwarmEvent};
use libp2p::{identify, noise, tcp, yamux, Multiaddr, PeerId, StreamProtocol, Swarm};
use staticnet_crypto::signing::Keypair;
use staticnet_protocol::topic::RoutingKey;
use staticnet_types::{StaticNetError, Topic};
use tokio::sync::{mpsc, oneshot};

use crate::substrate::{FrameReceiver, LocalNode, PubSubTransport, RecordRouting};

/// Convenience alias; the `NetworkBehaviour` derive needs the plain
/// `Result` name free.
type NResult<T> = std::result::Result<T, StaticNetError>;

const COMMAND_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Swarm settings for a [`Libp2pNode`].
#[derive(Clone, Debug)]
pub struct Libp2pNodeConfig {
    /// Addresses to listen on. Port `0` lets the OS pick.
    pub listen_addrs: Vec<Multiaddr>,
    /// Kademlia protocol name; nodes with different names do not talk.
    pub kad_protocol: String,
    /// Number of closest peers a record is replicated to.
    pub kad_replication_factor: usize,
    /// Seconds before a Kademlia query gives up.
    pub kad_query_timeout_secs: u64,
    /// Seconds before an idle connection is closed.
    pub idle_timeout_secs: u64,
    /// Largest gossipsub message accepted or sent.
    pub max_transmit_size: usize,
}

impl Default for Libp2pNodeConfig {
    fn default() -> Self {
        Self {
            listen_addrs: vec![
                Multiaddr::empty()
                    .with(Protocol::Ip4([0, 0, 0, 0].into()))
                    .with(Protocol::Tcp(0)),
                Multiaddr::empty()
                    .with(Protocol::Ip4([0, 0, 0, 0].into()))
                    .with(Protocol::Udp(0))
                    .with(Protocol::QuicV1),
            ],
            kad_protocol: "/staticnet/kad/1.0.0".into(),
            kad_replication_factor: 20,
            kad_query_timeout_secs: 30,
            idle_timeout_secs: 60,
            max_transmit_size: 65_536,
        }
    }
}

impl Libp2pNodeConfig {
    /// Rejects settings the swarm cannot run with.
    pub fn validate(&self) -> NResult<()> {
        if self.listen_addrs.is_empty() {
            return Err(config_error("listen_addrs must not be empty"));
        }
        if !self.kad_protocol.starts_with('/') {
            return Err(config_error("kad_protocol must start with '/'"));
        }
        if self.kad_replication_factor == 0 {
            return Err(config_error("kad_replication_factor must be greater than 0"));
        }
        if self.kad_query_timeout_secs == 0 {
            return Err(config_error("kad_query_timeout_secs must be greater than 0"));
        }
        if self.idle_timeout_secs == 0 {
            return Err(config_error("idle_timeout_secs must be greater than 0"));
        }
        if self.max_transmit_size == 0 {
            return Err(config_error("max_transmit_size must be greater than 0"));
        }
        Ok(())
    }
}

fn config_error(reason: &str) -> StaticNetError {
    StaticNetError::ConfigError {
        reason: reason.to_string(),
    }
}

fn backend_error(reason: String) -> StaticNetError {
    StaticNetError::BackendError { reason }
}

// ---------------------------------------------------------------------------
// Behaviour
// ---------------------------------------------------------------------------

/// Gossip, DHT and identify, composed.
///
/// The derive generates `NodeBehaviourEvent` with one variant per field.
#[derive(NetworkBehaviour)]
pub struct NodeBehaviour {
    /// Topic pub/sub.
    pub gossip: gossipsub::Behaviour,
    /// Record routing.
    pub kademlia: kad::Behaviour<MemoryStore>,
    /// Exchanges listen addresses with connected peers.
    pub identify: identify::Behaviour,
}

fn build_behaviour(key: &identity::Keypair, config: &Libp2pNodeConfig) -> NResult<NodeBehaviour> {
    let gossip_config = gossipsub::ConfigBuilder::default()
        .max_transmit_size(config.max_transmit_size)
        .build()
        .map_err(|e| backend_error(format!("failed to build gossipsub config: {e}")))?;
    let gossip = gossipsub::Behaviour::new(
        gossipsub::MessageAuthenticity::Signed(key.clone()),
        gossip_config,
    )
    .map_err(|e| backend_error(format!("failed to create gossipsub behaviour: {e}")))?;

    let local_peer_id = key.public().to_peer_id();
    let replication = NonZeroUsize::new(config.kad_replication_factor)
        .ok_or_else(|| config_error("kad_replication_factor must be greater than 0"))?;
    let protocol = StreamProtocol::try_from_owned(config.kad_protocol.clone()).map_err(|e| {
        backend_error(format!(
            "invalid Kademlia protocol name '{}': {e}",
            config.kad_protocol
        ))
    })?;
    let mut kad_config = kad::Config::default();
    kad_config.set_protocol_names(vec![protocol]);
    kad_config.set_query_timeout(Duration::from_secs(config.kad_query_timeout_secs));
    kad_config.set_replication_factor(replication);
    let mut kademlia =
        kad::Behaviour::with_config(local_peer_id, MemoryStore::new(local_peer_id), kad_config);
    kademlia.set_mode(Some(kad::Mode::Server));

    let identify = identify::Behaviour::new(
        identify::Config::new("/staticnet/id/1.0.0".into(), key.public())
            .with_agent_version(format!("staticnet/{}", env!("CARGO_PKG_VERSION"))),
    );

    Ok(NodeBehaviour {
        gossip,
        kademlia,
        identify,
    })
}

/// Converts an account keypair into the equivalent libp2p identity, so
/// the node's peer id matches the account's static identifier.
pub fn libp2p_keypair(keypair: &Keypair) -> NResult<identity::Keypair> {
    identity::Keypair::ed25519_from_bytes(keypair.seed_bytes())
        .map_err(|e| StaticNetError::CryptoError {
            reason: format!("failed to convert keypair to libp2p identity: {e}"),
        })
}

/// Splits `/p2p/<peer>` off `addr`.
///
/// Returns `None` if the address names no peer.
fn extract_peer_id(addr: &Multiaddr) -> Option<(PeerId, Multiaddr)> {
    let mut clean = Multiaddr::empty();
    let mut peer_id = None;
    for proto in addr.iter() {
        match proto {
            Protocol::P2p(id) => peer_id = Some(id),
            other => clean.push(other),
        }
    }
    peer_id.map(|id| (id, clean))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

type Reply<T> = oneshot::Sender<NResult<T>>;

enum Command {
    PutRecord {
        key: Vec<u8>,
        value: Vec<u8>,
        reply: Reply<()>,
    },
    GetRecords {
        key: Vec<u8>,
        reply: Reply<Vec<Vec<u8>>>,
    },
    Publish {
        topic: Topic,
        frame: Vec<u8>,
        reply: Reply<()>,
    },
    Listen {
        topic: Topic,
        reply: Reply<FrameReceiver>,
    },
    TopicPeers {
        topic: Topic,
        reply: Reply<Vec<PeerId>>,
    },
    Topics {
        reply: Reply<Vec<Topic>>,
    },
    BootstrapList {
        reply: Reply<Vec<Multiaddr>>,
    },
    BootstrapAdd {
        addr: Multiaddr,
        reply: Reply<Vec<Multiaddr>>,
    },
    BootstrapRemove {
        addr: Multiaddr,
        reply: Reply<Vec<Multiaddr>>,
    },
    Dial {
        addr: Multiaddr,
        reply: Reply<()>,
    },
    HangUp {
        addr: Multiaddr,
        reply: Reply<()>,
    },
    Listeners {
        reply: Reply<Vec<Multiaddr>>,
    },
}

// ---------------------------------------------------------------------------
// Libp2pNode
// ---------------------------------------------------------------------------

/// Handle to a running libp2p swarm.
///
/// The swarm task stops once every handle is dropped.
pub struct Libp2pNode {
    peer_id: PeerId,
    commands: mpsc::Sender<Command>,
}

impl Libp2pNode {
    /// Builds a swarm for `keypair`, starts listening and spawns the event
    /// loop on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`StaticNetError::ConfigError`] if `config` does not validate.
    /// - [`StaticNetError::BackendError`] if the transport, behaviour or a
    ///   listener cannot be set up.
    pub fn spawn(keypair: &Keypair, config: Libp2pNodeConfig) -> NResult<Self> {
        config.validate()?;
        let identity = libp2p_keypair(keypair)?;
        let behaviour_config = config.clone();

        let mut swarm = libp2p::SwarmBuilder::with_existing_identity(identity)
            .with_tokio()
            .with_tcp(
                tcp::Config::default().nodelay(true),
                noise::Config::new,
                yamux::Config::default,
            )
            .map_err(|e| backend_error(format!("failed to configure TCP transport: {e}")))?
            .with_quic()
            .with_behaviour(|key| {
                build_behaviour(key, &behaviour_config)
                    .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
            })
            .map_err(|e| backend_error(format!("failed to build network behaviour: {e}")))?
            .with_swarm_config(|cfg| {
                cfg.with_idle_connection_timeout(Duration::from_secs(config.idle_timeout_secs))
            })
            .build();

        for addr in &config.listen_addrs {
            swarm
                .listen_on(addr.clone())
                .map_err(|e| backend_error(format!("failed to listen on {addr}: {e}")))?;
        }

        let peer_id = *swarm.local_peer_id();
        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);
        let event_loop = EventLoop {
            swarm,
            inbox,
            listeners: HashMap::new(),
            lookups: HashMap::new(),
            bootstrap: Vec::new(),
            connections: HashMap::new(),
        };
        tokio::spawn(event_loop.run());
        tracing::info!(%peer_id, "libp2p node started");

        Ok(Self { peer_id, commands })
    }

    /// Peer id of this node.
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> NResult<T> {
        let (reply, answer) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| node_stopped())?;
        answer.await.map_err(|_| node_stopped())?
    }
}

fn node_stopped() -> StaticNetError {
    backend_error("libp2p node event loop has stopped".into())
}

#[async_trait]
impl RecordRouting for Libp2pNode {
    async fn put_record(&self, key: &RoutingKey, record: Vec<u8>) -> NResult<()> {
        let key = key.as_bytes().to_vec();
        self.request(|reply| Command::PutRecord {
            key,
            value: record,
            reply,
        })
        .await
    }

    async fn get_records(&self, key: &RoutingKey) -> NResult<Vec<Vec<u8>>> {
        let key = key.as_bytes().to_vec();
        self.request(|reply| Command::GetRecords { key, reply }).await
    }
}

#[async_trait]
impl PubSubTransport for Libp2pNode {
    async fn broadcast(&self, topic: &Topic, frame: Vec<u8>) -> NResult<()> {
        let topic = topic.clone();
        self.request(|reply| Command::Publish {
            topic,
            frame,
            reply,
        })
        .await
    }

    async fn listen(&self, topic: &Topic) -> NResult<FrameReceiver> {
        let topic = topic.clone();
        self.request(|reply| Command::Listen { topic, reply }).await
    }
}

#[async_trait]
impl LocalNode for Libp2pNode {
    async fn topic_peers(&self, topic: &Topic) -> NResult<Vec<PeerId>> {
        let topic = topic.clone();
        self.request(|reply| Command::TopicPeers { topic, reply }).await
    }

    async fn subscribed_topics(&self) -> NResult<Vec<Topic>> {
        self.request(|reply| Command::Topics { reply }).await
    }

    async fn bootstrap_list(&self) -> NResult<Vec<Multiaddr>> {
        self.request(|reply| Command::BootstrapList { reply }).await
    }

    async fn bootstrap_add(&self, addr: &Multiaddr) -> NResult<Vec<Multiaddr>> {
        let addr = addr.clone();
        self.request(|reply| Command::BootstrapAdd { addr, reply }).await
    }

    async fn bootstrap_remove(&self, addr: &Multiaddr) -> NResult<Vec<Multiaddr>> {
        let addr = addr.clone();
        self.request(|reply| Command::BootstrapRemove { addr, reply }).await
    }

    async fn connect(&self, addr: &Multiaddr) -> NResult<()> {
        let addr = addr.clone();
        self.request(|reply| Command::Dial { addr, reply }).await
    }

    async fn disconnect(&self, addr: &Multiaddr) -> NResult<()> {
        let addr = addr.clone();
        self.request(|reply| Command::HangUp { addr, reply }).await
    }

    async fn listen_addresses(&self) -> NResult<Vec<Multiaddr>> {
        self.request(|reply| Command::Listeners { reply }).await
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// An in-flight record lookup.
struct Lookup {
    records: Vec<Vec<u8>>,
    reply: Reply<Vec<Vec<u8>>>,
}

struct EventLoop {
    swarm: Swarm<NodeBehaviour>,
    inbox: mpsc::Receiver<Command>,
    listeners: HashMap<TopicHash, (Topic, Vec<mpsc::UnboundedSender<Vec<u8>>>)>,
    lookups: HashMap<kad::QueryId, Lookup>,
    bootstrap: Vec<Multiaddr>,
    /// Remote address of each live connection.
    connections: HashMap<Multiaddr, PeerId>,
}

impl EventLoop {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.inbox.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                event = self.swarm.select_next_some() => self.handle_swarm_event(event),
            }
        }
        tracing::info!(peer_id = %self.swarm.local_peer_id(), "libp2p node stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::PutRecord { key, value, reply } => {
                let record = kad::Record::new(kad::RecordKey::new(&key), value);
                let result = self
                    .swarm
                    .behaviour_mut()
                    .kademlia
                    .put_record(record, kad::Quorum::One)
                    .map(|id| tracing::debug!(?id, "record stored, replicating"))
                    .map_err(|e| StaticNetError::StorageError {
                        reason: format!("failed to store record: {e:?}"),
                    });
                let _ = reply.send(result);
            }
            Command::GetRecords { key, reply } => {
                let id = self
                    .swarm
                    .behaviour_mut()
                    .kademlia
                    .get_record(kad::RecordKey::new(&key));
                self.lookups.insert(
                    id,
                    Lookup {
                        records: Vec::new(),
                        reply,
                    },
                );
            }
            Command::Publish {
                topic,
                frame,
                reply,
            } => {
                let _ = reply.send(self.publish(&topic, frame));
            }
            Command::Listen { topic, reply } => {
                let _ = reply.send(self.listen(topic));
            }
            Command::TopicPeers { topic, reply } => {
                let hash = IdentTopic::new(topic.as_str()).hash();
                let mut peers: Vec<PeerId> = self
                    .swarm
                    .behaviour()
                    .gossip
                    .all_peers()
                    .filter(|(_, topics)| topics.contains(&&hash))
                    .map(|(peer, _)| *peer)
                    .collect();
                peers.sort();
                let _ = reply.send(Ok(peers));
            }
            Command::Topics { reply } => {
                let mut topics: Vec<Topic> = self
                    .swarm
                    .behaviour()
                    .gossip
                    .topics()
                    .map(|hash| Topic::from(hash.as_str()))
                    .collect();
                topics.sort();
                let _ = reply.send(Ok(topics));
            }
            Command::BootstrapList { reply } => {
                let _ = reply.send(Ok(self.bootstrap.clone()));
            }
            Command::BootstrapAdd { addr, reply } => {
                let _ = reply.send(Ok(self.bootstrap_add(addr)));
            }
            Command::BootstrapRemove { addr, reply } => {
                self.bootstrap.retain(|a| *a != addr);
                if let Some((peer, clean)) = extract_peer_id(&addr) {
                    self.swarm.behaviour_mut().kademlia.remove_address(&peer, &clean);
                }
                let _ = reply.send(Ok(self.bootstrap.clone()));
            }
            Command::Dial { addr, reply } => {
                let result = self
                    .swarm
                    .dial(addr.clone())
                    .map_err(|e| backend_error(format!("failed to dial {addr}: {e}")));
                let _ = reply.send(result);
            }
            Command::HangUp { addr, reply } => {
                let peer = extract_peer_id(&addr)
                    .map(|(peer, _)| peer)
                    .or_else(|| self.connections.get(&addr).copied());
                if let Some(peer) = peer {
                    // Not being connected is already the wanted state.
                    let _ = self.swarm.disconnect_peer_id(peer);
                }
                let _ = reply.send(Ok(()));
            }
            Command::Listeners { reply } => {
                let _ = reply.send(Ok(self.swarm.listeners().cloned().collect()));
            }
        }
    }

    fn publish(&mut self, topic: &Topic, frame: Vec<u8>) -> NResult<()> {
        let hash = IdentTopic::new(topic.as_str()).hash();
        if let Some((_, senders)) = self.listeners.get_mut(&hash) {
            senders.retain(|tx| tx.send(frame.clone()).is_ok());
        }

        match self
            .swarm
            .behaviour_mut()
            .gossip
            .publish(IdentTopic::new(topic.as_str()), frame)
        {
            Ok(id) => {
                tracing::debug!(%topic, %id, "frame published");
                Ok(())
            }
            Err(gossipsub::PublishError::InsufficientPeers) => {
                tracing::debug!(%topic, "no remote peers for topic");
                Ok(())
            }
            Err(e) => Err(backend_error(format!("failed to publish to '{topic}': {e}"))),
        }
    }

    fn listen(&mut self, topic: Topic) -> NResult<FrameReceiver> {
        let ident = IdentTopic::new(topic.as_str());
        self.swarm
            .behaviour_mut()
            .gossip
            .subscribe(&ident)
            .map_err(|e| backend_error(format!("failed to subscribe to '{topic}': {e}")))?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .entry(ident.hash())
            .or_insert_with(|| (topic, Vec::new()))
            .1
            .push(tx);
        Ok(rx)
    }

    fn bootstrap_add(&mut self, addr: Multiaddr) -> Vec<Multiaddr> {
        if !self.bootstrap.contains(&addr) {
            self.bootstrap.push(addr.clone());
        }
        if let Some((peer, clean)) = extract_peer_id(&addr) {
            let kademlia = &mut self.swarm.behaviour_mut().kademlia;
            kademlia.add_address(&peer, clean);
            if let Err(e) = kademlia.bootstrap() {
                tracing::debug!(%addr, ?e, "Kademlia bootstrap not started");
            }
        } else {
            tracing::warn!(%addr, "boot node address has no /p2p/ component");
        }
        self.bootstrap.clone()
    }

    fn deliver(&mut self, topic: &TopicHash, data: Vec<u8>) {
        let Some((name, senders)) = self.listeners.get_mut(topic) else {
            return;
        };
        senders.retain(|tx| tx.send(data.clone()).is_ok());
        if senders.is_empty() {
            let ident = IdentTopic::new(name.as_str());
            tracing::debug!(topic = %name, "last listener gone, unsubscribing");
            self.listeners.remove(topic);
            if let Err(e) = self.swarm.behaviour_mut().gossip.unsubscribe(&ident) {
                tracing::warn!(?e, "failed to unsubscribe");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Swarm events
    // -----------------------------------------------------------------------

    fn handle_swarm_event(&mut self, event: SwarmEvent<NodeBehaviourEvent>) {
        match event {
            SwarmEvent::NewListenAddr { address, .. } => {
                tracing::info!(%address, "new listen address");
            }
            SwarmEvent::ConnectionEstablished {
                peer_id, endpoint, ..
            } => {
                tracing::debug!(%peer_id, ?endpoint, "connection established");
                self.connections
                    .insert(endpoint.get_remote_address().clone(), peer_id);
            }
            SwarmEvent::ConnectionClosed {
                peer_id,
                cause,
                num_established,
                ..
            } => {
                tracing::debug!(%peer_id, ?cause, num_established, "connection closed");
                if num_established == 0 {
                    self.connections.retain(|_, peer| *peer != peer_id);
                }
            }
            SwarmEvent::OutgoingConnectionError { peer_id, error, .. } => {
                tracing::warn!(?peer_id, %error, "outgoing connection error");
            }
            SwarmEvent::Behaviour(NodeBehaviourEvent::Gossip(event)) => {
                self.handle_gossip_event(event);
            }
            SwarmEvent::Behaviour(NodeBehaviourEvent::Kademlia(event)) => {
                self.handle_kademlia_event(event);
            }
            SwarmEvent::Behaviour(NodeBehaviourEvent::Identify(event)) => {
                self.handle_identify_event(event);
            }
            other => {
                tracing::trace!(?other, "unhandled swarm event");
            }
        }
    }

    fn handle_gossip_event(&mut self, event: gossipsub::Event) {
        match event {
            gossipsub::Event::Message {
                propagation_source,
                message,
                ..
            } => {
                tracing::trace!(%propagation_source, topic = %message.topic, "gossip frame");
                self.deliver(&message.topic, message.data);
            }
            gossipsub::Event::Subscribed { peer_id, topic } => {
                tracing::debug!(%peer_id, %topic, "peer subscribed");
            }
            gossipsub::Event::Unsubscribed { peer_id, topic } => {
                tracing::debug!(%peer_id, %topic, "peer unsubscribed");
            }
            _ => {}
        }
    }

    fn handle_kademlia_event(&mut self, event: kad::Event) {
        let (id, result, step) = match event {
            kad::Event::OutboundQueryProgressed {
                id, result, step, ..
            } => (id, result, step),
            kad::Event::RoutingUpdated {
                peer, addresses, ..
            } => {
                tracing::debug!(%peer, ?addresses, "Kademlia routing table updated");
                return;
            }
            other => {
                tracing::trace!(?other, "Kademlia event");
                return;
            }
        };

        match result {
            kad::QueryResult::GetRecord(Ok(kad::GetRecordOk::FoundRecord(kad::PeerRecord {
                record,
                ..
            }))) => {
                if let Some(lookup) = self.lookups.get_mut(&id) {
                    lookup.records.push(record.value);
                }
                if step.last {
                    self.finish_lookup(id, Ok(()));
                }
            }
            kad::QueryResult::GetRecord(Ok(kad::GetRecordOk::FinishedWithNoAdditionalRecord {
                ..
            })) => {
                self.finish_lookup(id, Ok(()));
            }
            kad::QueryResult::GetRecord(Err(kad::GetRecordError::NotFound { .. })) => {
                self.finish_lookup(id, Ok(()));
            }
            kad::QueryResult::GetRecord(Err(e)) => {
                tracing::warn!(?id, ?e, "record lookup failed");
                self.finish_lookup(id, Err(e));
            }
            kad::QueryResult::PutRecord(Ok(kad::PutRecordOk { key })) => {
                tracing::debug!(?id, ?key, "record replicated");
            }
            kad::QueryResult::PutRecord(Err(e)) => {
                tracing::debug!(?id, ?e, "record replication incomplete");
            }
            kad::QueryResult::Bootstrap(Ok(kad::BootstrapOk {
                peer,
                num_remaining,
            })) => {
                tracing::debug!(?id, %peer, num_remaining, "Kademlia bootstrap progress");
            }
            other => {
                tracing::trace!(?id, ?step, ?other, "other Kademlia query result");
            }
        }
    }

    /// Answers a lookup with what it collected. A failed query that still
    /// found records counts as a success.
    fn finish_lookup(
        &mut self,
        id: kad::QueryId,
        outcome: std::result::Result<(), kad::GetRecordError>,
    ) {
        let Some(lookup) = self.lookups.remove(&id) else {
            return;
        };
        let answer = match outcome {
            Err(_) if lookup.records.is_empty() => {
                Err(backend_error("record lookup failed without results".into()))
            }
            _ => Ok(lookup.records),
        };
        let _ = lookup.reply.send(answer);
    }

    fn handle_identify_event(&mut self, event: identify::Event) {
        if let identify::Event::Received { peer_id, info, .. } = event {
            tracing::debug!(%peer_id, agent = %info.agent_version, "identified peer");
            let kademlia = &mut self.swarm.behaviour_mut().kademlia;
            for addr in info.listen_addrs {
                kademlia.add_address(&peer_id, addr);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
