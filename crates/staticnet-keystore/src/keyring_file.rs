//! JSON keyring file: read and write.
//!
//! # Layout
//!
//! ```json
//! {
//!   "version": 1,
//!   "keys": [ { "name": "self", "seed": "<64 hex chars>" } ]
//! }
//! ```
//!
//! Seeds are stored in plaintext hex. Callers pick a path with suitable
//! permissions. Every in-memory copy of a seed is zeroized on drop.

use std::path::Path;

use serde::{Deserialize, Serialize};
use staticnet_types::{Result, StaticNetError};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Current keyring format version.
pub const KEYRING_VERSION: u32 = 1;

/// One stored account.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyringEntry {
    /// Account name.
    pub name: String,
    /// Hex-encoded 32-byte Ed25519 seed.
    seed: String,
}

impl KeyringEntry {
    /// Builds an entry from a raw seed.
    pub fn new(name: impl Into<String>, seed: &[u8; 32]) -> Self {
        Self {
            name: name.into(),
            seed: hex::encode(seed),
        }
    }

    /// Decodes the seed.
    ///
    /// # Errors
    ///
    /// Returns [`StaticNetError::StorageError`] if the seed is not 32
    /// hex-encoded bytes.
    pub fn seed(&self) -> Result<Zeroizing<[u8; 32]>> {
        let mut out = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(&self.seed, &mut out[..]).map_err(|e| StaticNetError::StorageError {
            reason: format!("corrupt seed for account '{}': {e}", self.name),
        })?;
        Ok(out)
    }
}

#[derive(Serialize, Deserialize)]
struct KeyringFile {
    version: u32,
    keys: Vec<KeyringEntry>,
}

/// Reads all entries from a keyring file.
///
/// A missing file is an empty keyring.
///
/// # Errors
///
/// Returns [`StaticNetError::StorageError`] if the file cannot be read,
/// is not valid JSON, or carries an unsupported version.
pub fn read_keyring(path: &Path) -> Result<Vec<KeyringEntry>> {
    let raw = match std::fs::read(path) {
        Ok(raw) => Zeroizing::new(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StaticNetError::StorageError {
                reason: format!("failed to read keyring '{}': {e}", path.display()),
            });
        }
    };

    let file: KeyringFile =
        serde_json::from_slice(&raw).map_err(|e| StaticNetError::StorageError {
            reason: format!("failed to parse keyring '{}': {e}", path.display()),
        })?;

    if file.version != KEYRING_VERSION {
        return Err(StaticNetError::StorageError {
            reason: format!(
                "unsupported keyring version {} (expected {KEYRING_VERSION})",
                file.version
            ),
        });
    }

    Ok(file.keys)
}

/// Writes all entries to a keyring file, replacing it atomically.
///
/// The new content goes to a sibling temporary file which is then
/// renamed over `path`.
pub fn write_keyring(path: &Path, keys: Vec<KeyringEntry>) -> Result<()> {
    let file = KeyringFile {
        version: KEYRING_VERSION,
        keys,
    };
    let bytes = Zeroizing::new(serde_json::to_vec_pretty(&file).map_err(|e| {
        StaticNetError::StorageError {
            reason: format!("failed to serialize keyring: {e}"),
        }
    })?);

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes.as_slice()).map_err(|e| StaticNetError::StorageError {
        reason: format!("failed to write keyring '{}': {e}", tmp.display()),
    })?;
    std::fs::rename(&tmp, path).map_err(|e| StaticNetError::StorageError {
        reason: format!("failed to replace keyring '{}': {e}", path.display()),
    })
}
