//! Binding and resolving static identifiers.
//!
//! Per identifier the name service moves between two states:
//!
//! ```text
//! Unbound ──bind──▶ Bound(content id, expiry) ──bind──▶ Bound(…)
//! ```
//!
//! `resolve` yields the content id while `now < expiry`. Pointers are
//! never deleted; a later bind supersedes the earlier one.

use std::sync::Arc;
use std::time::Duration;

use staticnet_crypto::identity::StaticId;
use staticnet_keystore::{AccountRef, KeyStore};
use staticnet_protocol::payload::EventPayload;
use staticnet_protocol::pointer::StaticPointer;
use staticnet_protocol::topic::{derive_update_topic, RoutingKey};
use staticnet_types::config::StaticNetConfig;
use staticnet_types::{Result, StaticNetError, Timestamp};

use crate::channel::EventChannel;
use crate::substrate::RecordRouting;

/// Publishes and looks up pointer records.
pub struct NameService {
    keys: Arc<KeyStore>,
    routing: Arc<dyn RecordRouting>,
    channel: Arc<EventChannel>,
    default_lifetime: Duration,
    storage_scheme: String,
}

impl NameService {
    /// Creates a name service.
    ///
    /// # Errors
    ///
    /// Returns [`StaticNetError::ConfigError`] if the configured default
    /// lifetime does not parse.
    pub fn new(
        keys: Arc<KeyStore>,
        routing: Arc<dyn RecordRouting>,
        channel: Arc<EventChannel>,
        config: &StaticNetConfig,
    ) -> Result<Self> {
        Ok(Self {
            keys,
            routing,
            channel,
            default_lifetime: config.default_lifetime()?,
            storage_scheme: config.storage_scheme.clone(),
        })
    }

    /// Binds the identifier of `account` to `content_id`.
    ///
    /// # Process
    ///
    /// 1. Materialize the signing key (`"self"` is created on demand).
    /// 2. Sign a pointer to `<scheme><content_id>` expiring after
    ///    `lifetime`, or the configured default.
    /// 3. Store it under the identifier's routing key.
    /// 4. Announce the locator on the identifier's update topic.
    ///
    /// Returns the identifier.
    ///
    /// # Errors
    ///
    /// - [`StaticNetError::KeyNotFound`] if `account` is not held.
    /// - Any substrate error, unchanged.
    pub async fn bind(
        &self,
        content_id: &str,
        account: &AccountRef,
        lifetime: Option<Duration>,
    ) -> Result<StaticId> {
        let identity = self.keys.peer_identity(account)?;
        let id = identity.id();

        let locator = if content_id.starts_with(&self.storage_scheme) {
            content_id.to_string()
        } else {
            format!("{}{content_id}", self.storage_scheme)
        };
        let expiry = Timestamp::after(lifetime.unwrap_or(self.default_lifetime))?;
        let pointer = StaticPointer::sign(identity.keypair(), locator.clone(), expiry)?;

        self.routing
            .put_record(&RoutingKey::for_id(&id), pointer.encode()?)
            .await?;
        tracing::debug!(%id, value = %locator, expiry = %pointer.expiry, "pointer published");

        self.channel
            .publish_as(&identity, &derive_update_topic(&id), EventPayload::Text(locator))
            .await?;
        Ok(id)
    }

    /// Resolves `target` to its current content id.
    ///
    /// Returns `None` when the identifier is unknown, unbound or its
    /// pointer has expired.
    ///
    /// # Errors
    ///
    /// Returns [`StaticNetError::ValidationFailure`] if records exist
    /// but none of them verifies.
    pub async fn resolve(&self, target: &AccountRef) -> Result<Option<String>> {
        let Some(id) = self.target_id(target) else {
            return Ok(None);
        };
        let Some(pointer) = self.best_record(&id).await? else {
            return Ok(None);
        };
        if pointer.is_expired() {
            tracing::debug!(%id, expiry = %pointer.expiry, "pointer expired");
            return Ok(None);
        }
        Ok(Some(pointer.content_id(&self.storage_scheme).to_string()))
    }

    /// Returns the full validated pointer of `target`.
    ///
    /// # Errors
    ///
    /// - [`StaticNetError::NotFound`] if no record exists.
    /// - [`StaticNetError::Expired`] if the newest record has expired.
    /// - [`StaticNetError::ValidationFailure`] if no record verifies.
    pub async fn resolve_entry(&self, target: &AccountRef) -> Result<StaticPointer> {
        let not_found = || StaticNetError::NotFound {
            reason: format!("no pointer bound to {target}"),
        };
        let id = self.target_id(target).ok_or_else(not_found)?;
        let pointer = self.best_record(&id).await?.ok_or_else(not_found)?;
        pointer.validate()?;
        Ok(pointer)
    }

    fn target_id(&self, target: &AccountRef) -> Option<StaticId> {
        match target {
            AccountRef::ById(id) => Some(*id),
            AccountRef::ByName(name) => self.keys.id_by_name(name),
        }
    }

    /// Fetches all candidates for `id` and returns the verified one with
    /// the latest expiry, expired or not.
    ///
    /// Invalid candidates are skipped while at least one verifies.
    async fn best_record(&self, id: &StaticId) -> Result<Option<StaticPointer>> {
        let records = self.routing.get_records(&RoutingKey::for_id(id)).await?;
        if records.is_empty() {
            return Ok(None);
        }

        let mut best: Option<StaticPointer> = None;
        let mut last_error = None;
        for bytes in &records {
            match check_candidate(id, bytes) {
                Ok(pointer) => {
                    if best.as_ref().map_or(true, |b| pointer.expiry > b.expiry) {
                        best = Some(pointer);
                    }
                }
                Err(e) => {
                    tracing::warn!(%id, error = %e, "skipping invalid pointer record");
                    last_error = Some(e);
                }
            }
        }

        match (best, last_error) {
            (Some(pointer), _) => Ok(Some(pointer)),
            (None, Some(e)) => Err(StaticNetError::ValidationFailure {
                reason: format!("no valid pointer for {id} among {} records: {e}", records.len()),
            }),
            (None, None) => Ok(None),
        }
    }
}

fn check_candidate(id: &StaticId, bytes: &[u8]) -> Result<StaticPointer> {
    let pointer = StaticPointer::decode(bytes)?;
    if pointer.owner != *id {
        return Err(StaticNetError::ValidationFailure {
            reason: format!("record owned by {} stored under {id}", pointer.owner),
        });
    }
    pointer.verify()?;
    Ok(pointer)
}
