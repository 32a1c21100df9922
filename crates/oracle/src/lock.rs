//! Per-record generation lock.
//!
//! The lock is a coordination-store key set with NX and a TTL; the value is
//! a random owner token. [`GenerationLock::release`] should be awaited on
//! every exit path. If the guard is dropped without it (cancelled future,
//! panic) the release is spawned onto the current Tokio runtime, and failing
//! that the key simply expires.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::coordination::{CoordinationError, CoordinationStore};

pub struct GenerationLock {
    store: Arc<dyn CoordinationStore>,
    key: String,
    token: String,
    released: bool,
}

impl GenerationLock {
    /// Try to take the lock at `key`. Returns `None` when someone else holds
    /// it.
    pub async fn try_acquire(
        store: Arc<dyn CoordinationStore>,
        key: String,
        ttl: Duration,
    ) -> Result<Option<Self>, CoordinationError> {
        let token = Uuid::new_v4().to_string();
        if !store.set_if_absent_with_expiry(&key, &token, ttl).await? {
            tracing::debug!(lock_key = %key, "Generation lock held elsewhere");
            return Ok(None);
        }
        tracing::debug!(lock_key = %key, "Generation lock acquired");
        Ok(Some(Self {
            store,
            key,
            token,
            released: false,
        }))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether the key still carries this guard's token, i.e. the TTL has
    /// not lapsed and nobody else has taken the lock since.
    pub async fn is_held(&self) -> Result<bool, CoordinationError> {
        Ok(self.store.get(&self.key).await?.as_deref() == Some(self.token.as_str()))
    }

    pub async fn release(mut self) -> Result<(), CoordinationError> {
        self.released = true;
        release_if_owner(self.store.as_ref(), &self.key, &self.token).await
    }
}

impl Drop for GenerationLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let store = Arc::clone(&self.store);
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = release_if_owner(store.as_ref(), &key, &token).await {
                        tracing::warn!(lock_key = %key, error = %e, "Deferred lock release failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(lock_key = %key, "Lock dropped outside a runtime; waiting for TTL");
            }
        }
    }
}

/// Delete `key` unless it has expired and been re-taken by another owner.
async fn release_if_owner(
    store: &dyn CoordinationStore,
    key: &str,
    token: &str,
) -> Result<(), CoordinationError> {
    if store.delete_if_equals(key, token).await? {
        tracing::debug!(lock_key = %key, "Generation lock released");
    } else {
        tracing::warn!(lock_key = %key, "Generation lock expired before release; leaving the key");
    }
    Ok(())
}
