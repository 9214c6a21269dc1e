//! Account references and materialized identities.

use std::fmt;
use std::sync::Arc;

use staticnet_crypto::identity::StaticId;
use staticnet_crypto::signing::{Keypair, PublicKey};

/// Name of the local default account.
pub const SELF_ACCOUNT: &str = "self";

/// Reference to an account, either by its local name or by identifier.
///
/// Parsed once at the API boundary.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum AccountRef {
    /// Local alias, e.g. `"self"` or `"blog"`.
    ByName(String),
    /// Raw static identifier.
    ById(StaticId),
}

impl AccountRef {
    /// Interprets `input` as an identifier if it parses as one, and as a
    /// name otherwise.
    pub fn parse(input: &str) -> Self {
        match input.parse::<StaticId>() {
            Ok(id) => Self::ById(id),
            Err(_) => Self::ByName(input.to_string()),
        }
    }

    /// The local default account.
    pub fn self_account() -> Self {
        Self::ByName(SELF_ACCOUNT.to_string())
    }

    /// Returns `true` for a reference to `"self"`.
    pub fn is_self(&self) -> bool {
        matches!(self, Self::ByName(name) if name == SELF_ACCOUNT)
    }
}

impl From<StaticId> for AccountRef {
    fn from(id: StaticId) -> Self {
        Self::ById(id)
    }
}

impl From<&str> for AccountRef {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByName(name) => f.write_str(name),
            Self::ById(id) => write!(f, "{id}"),
        }
    }
}

/// A held key together with its identifier, ready for signing.
///
/// Cheap to clone; the keypair is shared read-only with the store.
#[derive(Clone)]
pub struct PeerIdentity {
    id: StaticId,
    public_key: PublicKey,
    keypair: Arc<Keypair>,
}

impl PeerIdentity {
    pub(crate) fn new(id: StaticId, keypair: Arc<Keypair>) -> Self {
        Self {
            id,
            public_key: keypair.public_key(),
            keypair,
        }
    }

    /// Identifier of the key.
    pub fn id(&self) -> StaticId {
        self.id
    }

    /// Public half of the key.
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Signing key.
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerIdentity")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
