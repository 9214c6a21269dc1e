//! Account keys for staticnet.
//!
//! Maps human-readable account names to Ed25519 keypairs and the static
//! identifiers derived from them. The name `"self"` is reserved for the
//! local default identity and is created the first time an operation
//! needs its key.
//!
//! - [`store`]: the concurrent `KeyStore`
//! - [`account`]: `AccountRef` and `PeerIdentity`
//! - [`keyring_file`]: JSON keyring persistence

pub mod account;
pub mod keyring_file;
pub mod store;

pub use account::{AccountRef, PeerIdentity, SELF_ACCOUNT};
pub use store::KeyStore;
