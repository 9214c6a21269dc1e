//! Concurrent account-key store.
//!
//! A [`KeyStore`] maps account names to Ed25519 keypairs. Identifiers
//! are derived once when a key enters the store and are never
//! recomputed. Lookups report misses as `None`; only calls that must
//! produce a signing identity fail with
//! [`StaticNetError::KeyNotFound`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use staticnet_crypto::identity::StaticId;
use staticnet_crypto::signing::{Keypair, PublicKey};
use staticnet_types::{Result, StaticNetError};
use zeroize::Zeroizing;

use crate::account::{AccountRef, PeerIdentity, SELF_ACCOUNT};
use crate::keyring_file::{read_keyring, write_keyring, KeyringEntry};

// ---------------------------------------------------------------------------
// AccountKey
// ---------------------------------------------------------------------------

/// One named key held by the store.
struct AccountKey {
    id: StaticId,
    keypair: Arc<Keypair>,
}

impl AccountKey {
    fn new(keypair: Keypair) -> Result<Self> {
        let id = StaticId::derive(&keypair.public_key())?;
        Ok(Self {
            id,
            keypair: Arc::new(keypair),
        })
    }
}

// ---------------------------------------------------------------------------
// KeyStore
// ---------------------------------------------------------------------------

/// Named Ed25519 keys, optionally persisted to a JSON keyring.
pub struct KeyStore {
    accounts: RwLock<HashMap<String, AccountKey>>,
    path: Option<PathBuf>,
}

impl KeyStore {
    /// Creates an empty store that keeps keys in memory only.
    pub fn in_memory() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            path: None,
        }
    }

    /// Opens a store backed by the keyring at `path`.
    ///
    /// A missing file starts an empty keyring; it is created on the
    /// first change.
    ///
    /// # Errors
    ///
    /// Returns [`StaticNetError::StorageError`] if the file exists but
    /// cannot be parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut accounts = HashMap::new();
        for entry in read_keyring(&path)? {
            let seed = entry.seed()?;
            let key = AccountKey::new(Keypair::from_seed(&seed))?;
            accounts.insert(entry.name.clone(), key);
        }
        tracing::debug!(path = %path.display(), accounts = accounts.len(), "keyring loaded");

        Ok(Self {
            accounts: RwLock::new(accounts),
            path: Some(path),
        })
    }

    // -- Lookups ----------------------------------------------------------

    /// Returns the identifier stored under `name`.
    pub fn id_by_name(&self, name: &str) -> Option<StaticId> {
        self.read().get(name).map(|key| key.id)
    }

    /// Returns the name of the account holding `id`.
    pub fn name_by_id(&self, id: &StaticId) -> Option<String> {
        self.read()
            .iter()
            .find(|(_, key)| key.id == *id)
            .map(|(name, _)| name.clone())
    }

    /// Returns all `(name, identifier)` pairs sorted by name.
    pub fn list(&self) -> Vec<(String, StaticId)> {
        let mut accounts: Vec<_> = self
            .read()
            .iter()
            .map(|(name, key)| (name.clone(), key.id))
            .collect();
        accounts.sort_by(|a, b| a.0.cmp(&b.0));
        accounts
    }

    // -- Mutations --------------------------------------------------------

    /// Returns the identifier of `name`, generating a key if absent.
    ///
    /// # Errors
    ///
    /// - [`StaticNetError::InvalidIdentifier`] if `name` is empty or is
    ///   itself a static identifier.
    /// - [`StaticNetError::StorageError`] if the keyring cannot be
    ///   written.
    pub fn get_or_create(&self, name: &str) -> Result<StaticId> {
        if let Some(id) = self.id_by_name(name) {
            return Ok(id);
        }
        check_name(name)?;

        let mut accounts = self.write();
        // Another caller may have created it between the two locks.
        if let Some(key) = accounts.get(name) {
            return Ok(key.id);
        }
        let key = AccountKey::new(Keypair::generate())?;
        let id = key.id;
        accounts.insert(name.to_string(), key);
        if let Err(e) = self.persist(&accounts) {
            accounts.remove(name);
            return Err(e);
        }

        tracing::info!(account = name, %id, "account created");
        Ok(id)
    }

    /// Stores a key derived from `seed` under `name`.
    ///
    /// Importing the same seed twice is a no-op.
    ///
    /// # Errors
    ///
    /// - [`StaticNetError::InvalidIdentifier`] as in [`Self::get_or_create`].
    /// - [`StaticNetError::StorageError`] if `name` already holds a
    ///   different key or the keyring cannot be written.
    pub fn import(&self, name: &str, seed: &[u8; 32]) -> Result<StaticId> {
        check_name(name)?;
        let key = AccountKey::new(Keypair::from_seed(seed))?;
        let id = key.id;

        let mut accounts = self.write();
        if let Some(existing) = accounts.get(name) {
            if existing.id == id {
                return Ok(id);
            }
            return Err(StaticNetError::StorageError {
                reason: format!("account '{name}' already holds a different key"),
            });
        }
        accounts.insert(name.to_string(), key);
        if let Err(e) = self.persist(&accounts) {
            accounts.remove(name);
            return Err(e);
        }

        tracing::info!(account = name, %id, "account imported");
        Ok(id)
    }

    /// Removes the account `name`. Removing a missing account is a no-op.
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut accounts = self.write();
        let Some(removed) = accounts.remove(name) else {
            return Ok(());
        };
        if let Err(e) = self.persist(&accounts) {
            accounts.insert(name.to_string(), removed);
            return Err(e);
        }

        tracing::info!(account = name, id = %removed.id, "account removed");
        Ok(())
    }

    // -- Identity materialization ----------------------------------------

    /// Returns the signing identity for `account`.
    ///
    /// `"self"` is created on first use. Any other account must already
    /// be held.
    ///
    /// # Errors
    ///
    /// Returns [`StaticNetError::KeyNotFound`] if no held key matches.
    pub fn peer_identity(&self, account: &AccountRef) -> Result<PeerIdentity> {
        if account.is_self() {
            self.get_or_create(SELF_ACCOUNT)?;
        }

        let accounts = self.read();
        let key = match account {
            AccountRef::ByName(name) => accounts.get(name),
            AccountRef::ById(id) => accounts.values().find(|key| key.id == *id),
        };
        key.map(|key| PeerIdentity::new(key.id, Arc::clone(&key.keypair)))
            .ok_or_else(|| StaticNetError::KeyNotFound {
                name: account.to_string(),
            })
    }

    /// Returns the public key for `account`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::peer_identity`].
    pub fn public_key(&self, account: &AccountRef) -> Result<PublicKey> {
        self.peer_identity(account).map(|identity| identity.public_key())
    }

    // -- Internals --------------------------------------------------------

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, AccountKey>> {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, AccountKey>> {
        self.accounts.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, accounts: &HashMap<String, AccountKey>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let entries = accounts
            .iter()
            .map(|(name, key)| {
                let seed = Zeroizing::new(key.keypair.seed_bytes());
                KeyringEntry::new(name.clone(), &seed)
            })
            .collect();
        write_keyring(path, entries)
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StaticNetError::InvalidIdentifier {
            reason: "account name must not be empty".into(),
        });
    }
    if name.parse::<StaticId>().is_ok() {
        return Err(StaticNetError::InvalidIdentifier {
            reason: format!("account name '{name}' is a static identifier"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_miss_without_error() -> Result<()> {
        let store = KeyStore::in_memory();
        assert_eq!(store.id_by_name("ghost"), None);
        let id = StaticId::derive(&Keypair::from_seed(&[1; 32]).public_key())?;
        assert_eq!(store.name_by_id(&id), None);
        Ok(())
    }

    #[test]
    fn get_or_create_is_idempotent() -> Result<()> {
        let store = KeyStore::in_memory();
        let a = store.get_or_create("blog")?;
        let b = store.get_or_create("blog")?;
        assert_eq!(a, b);
        assert_eq!(store.id_by_name("blog"), Some(a));
        assert_eq!(store.name_by_id(&a).as_deref(), Some("blog"));
        Ok(())
    }

    #[test]
    fn self_is_created_on_first_identity_use() -> Result<()> {
        let store = KeyStore::in_memory();
        assert_eq!(store.id_by_name(SELF_ACCOUNT), None);
        let identity = store.peer_identity(&AccountRef::self_account())?;
        assert_eq!(store.id_by_name(SELF_ACCOUNT), Some(identity.id()));
        Ok(())
    }

    #[test]
    fn unknown_account_identity_fails() {
        let store = KeyStore::in_memory();
        let result = store.peer_identity(&AccountRef::ByName("ghost".into()));
        assert!(matches!(result, Err(StaticNetError::KeyNotFound { .. })));
    }

    #[test]
    fn identity_by_id_matches_by_name() -> Result<()> {
        let store = KeyStore::in_memory();
        let id = store.get_or_create("blog")?;
        let by_id = store.peer_identity(&AccountRef::ById(id))?;
        let by_name = store.peer_identity(&AccountRef::ByName("blog".into()))?;
        assert_eq!(by_id.public_key(), by_name.public_key());
        assert_eq!(StaticId::derive(&by_id.public_key())?, id);
        Ok(())
    }

    #[test]
    fn remove_missing_is_noop() -> Result<()> {
        let store = KeyStore::in_memory();
        store.remove("ghost")?;
        store.get_or_create("blog")?;
        store.remove("blog")?;
        assert_eq!(store.id_by_name("blog"), None);
        Ok(())
    }

    #[test]
    fn identifier_names_are_rejected() -> Result<()> {
        let store = KeyStore::in_memory();
        let id = StaticId::derive(&Keypair::from_seed(&[9; 32]).public_key())?;
        assert!(store.get_or_create(&id.to_string()).is_err());
        assert!(store.get_or_create("").is_err());
        Ok(())
    }

    #[test]
    fn import_conflicts_are_rejected() -> Result<()> {
        let store = KeyStore::in_memory();
        let id = store.import("blog", &[0x42; 32])?;
        assert_eq!(store.import("blog", &[0x42; 32])?, id);
        assert!(store.import("blog", &[0x43; 32]).is_err());
        Ok(())
    }

    #[test]
    fn list_is_sorted() -> Result<()> {
        let store = KeyStore::in_memory();
        store.import("zeta", &[1; 32])?;
        store.import("alpha", &[2; 32])?;
        let names: Vec<_> = store.list().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
        Ok(())
    }
}
