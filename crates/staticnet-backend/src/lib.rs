//! Static naming and signed events over peer-to-peer backends.
//!
//! A static identifier is derived from an account key. Binding points it
//! at a content id for a limited time; resolving follows it back. Events
//! published under an identifier are signed and verified end to end, and
//! every bind announces itself on the identifier's update topic.
//!
//! Two backends implement the same [`backend::StaticIdBackend`] contract
//! over different substrates. They share key handling, naming and event
//! delivery, but sign under different domains, so their envelopes never
//! cross-verify.
//!
//! # Modules
//!
//! - [`substrate`]: traits the backends drive (`LocalNode`, `RelayClient`)
//! - [`name`]: bind / resolve of pointer records
//! - [`channel`]: signed publish and subscriber registry
//! - [`backend`]: the `StaticIdBackend` contract and shared core
//! - [`local`]: backend over a local peer node
//! - [`relay`]: backend over a relay/DHT client
//! - [`libp2p_node`]: `LocalNode` over a libp2p swarm (gossipsub, Kademlia)
//! - [`memory`]: in-process substrates for embedding and tests

pub mod backend;
pub mod channel;
pub mod libp2p_node;
pub mod local;
pub mod memory;
pub mod name;
pub mod relay;
pub mod substrate;

pub use backend::{StaticCore, StaticIdBackend};
pub use channel::{Event, EventCallback, EventChannel};
pub use libp2p_node::{Libp2pNode, Libp2pNodeConfig};
pub use local::LocalNodeBackend;
pub use name::NameService;
pub use relay::RelayBackend;
