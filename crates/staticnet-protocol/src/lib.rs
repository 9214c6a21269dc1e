//! Wire protocol for staticnet.
//!
//! Defines the signed event envelope and its domain-separated canonical
//! encoding, the signed pointer record that binds a static identifier to
//! a content locator, update-topic derivation, and the payload decode
//! chain applied to every delivered event.
//!
//! # Modules
//!
//! - [`envelope`]: `Envelope`, `VerifiedEnvelope`, signing domains, wire codec
//! - [`canonical`]: Deterministic CBOR signing bytes (RFC 8949 §4.2)
//! - [`signing`]: Envelope signing and verification
//! - [`pointer`]: `StaticPointer` record
//! - [`topic`]: Routing keys and update-topic derivation
//! - [`payload`]: Outgoing payload kinds and the inbound decode chain

pub mod canonical;
pub mod envelope;
pub mod payload;
pub mod pointer;
pub mod signing;
pub mod topic;
