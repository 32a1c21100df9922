//! Cross-process coordination primitives: counters, conditional sets and
//! expiring values.
//!
//! The orchestrator keeps no in-process state; quota counters, the shared
//! response cache and the per-record generation lock all live behind
//! [`CoordinationStore`], so correctness holds across any number of
//! processes sharing one backend.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use iching_core::types::Timestamp;

use crate::clock::{Clock, SystemClock};

#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    #[error("Coordination store connection failed: {0}")]
    Connection(String),

    #[error("Coordination store command failed: {0}")]
    Command(String),
}

#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Atomically increment `key` and (re)arm its expiry. Returns the new
    /// count.
    async fn increment_with_expiry(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<u64, CoordinationError>;

    /// Set `key` only if it does not exist. Returns `true` if this call set
    /// it.
    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CoordinationError>;

    async fn delete(&self, key: &str) -> Result<(), CoordinationError>;

    /// Atomically delete `key` only while it still holds `expected`.
    /// Returns `true` if this call deleted it.
    async fn delete_if_equals(
        &self,
        key: &str,
        expected: &str,
    ) -> Result<bool, CoordinationError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CoordinationError>;

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CoordinationError>;
}

#[async_trait]
impl<T: CoordinationStore + ?Sized> CoordinationStore for Arc<T> {
    async fn increment_with_expiry(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<u64, CoordinationError> {
        (**self).increment_with_expiry(key, window).await
    }

    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CoordinationError> {
        (**self).set_if_absent_with_expiry(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CoordinationError> {
        (**self).delete(key).await
    }

    async fn delete_if_equals(
        &self,
        key: &str,
        expected: &str,
    ) -> Result<bool, CoordinationError> {
        (**self).delete_if_equals(key, expected).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CoordinationError> {
        (**self).get(key).await
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CoordinationError> {
        (**self).set_with_expiry(key, value, ttl).await
    }
}

/// Whole seconds for an expiry argument, never zero.
fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Timestamp,
}

/// Single-process backend for tests and local development. Expiry is
/// evaluated lazily against the injected clock.
pub struct InMemoryCoordinationStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCoordinationStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn expires_at(&self, ttl: Duration) -> Timestamp {
        self.clock.now() + chrono::Duration::seconds(expiry_secs(ttl) as i64)
    }

    fn with_live_entries<R>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Entry>) -> R,
    ) -> Result<R, CoordinationError> {
        let now = self.clock.now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CoordinationError::Command(e.to_string()))?;
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(f(&mut entries))
    }
}

impl Default for InMemoryCoordinationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationStore for InMemoryCoordinationStore {
    async fn increment_with_expiry(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<u64, CoordinationError> {
        let expires_at = self.expires_at(window);
        self.with_live_entries(|entries| {
            let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
                value: "0".into(),
                expires_at,
            });
            let current: u64 = entry.value.parse().map_err(|_| {
                CoordinationError::Command(format!("value at {key} is not an integer"))
            })?;
            let next = current + 1;
            entry.value = next.to_string();
            entry.expires_at = expires_at;
            Ok(next)
        })?
    }

    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CoordinationError> {
        let expires_at = self.expires_at(ttl);
        self.with_live_entries(|entries| {
            if entries.contains_key(key) {
                return false;
            }
            entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at,
                },
            );
            true
        })
    }

    async fn delete(&self, key: &str) -> Result<(), CoordinationError> {
        self.with_live_entries(|entries| {
            entries.remove(key);
        })
    }

    async fn delete_if_equals(
        &self,
        key: &str,
        expected: &str,
    ) -> Result<bool, CoordinationError> {
        self.with_live_entries(|entries| match entries.get(key) {
            Some(entry) if entry.value == expected => {
                entries.remove(key);
                true
            }
            _ => false,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CoordinationError> {
        self.with_live_entries(|entries| entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CoordinationError> {
        let expires_at = self.expires_at(ttl);
        self.with_live_entries(|entries| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at,
                },
            );
        })
    }
}

// ---------------------------------------------------------------------------
// Redis backend
// ---------------------------------------------------------------------------

/// GET and DEL in one server-side step, so an expired key re-taken by
/// another owner is never deleted.
static DELETE_IF_EQUALS: LazyLock<redis::Script> = LazyLock::new(|| {
    redis::Script::new(
        r#"if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0"#,
    )
});

/// Redis-backed coordination store over a multiplexed async connection.
pub struct RedisCoordinationStore {
    client: redis::Client,
}

impl RedisCoordinationStore {
    pub fn new(connection_url: &str) -> Result<Self, CoordinationError> {
        let client = redis::Client::open(connection_url)
            .map_err(|e| CoordinationError::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CoordinationError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CoordinationError::Connection(e.to_string()))
    }

    /// Round-trip a `PING`, for startup health checks.
    pub async fn ping(&self) -> Result<(), CoordinationError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(())
    }
}

fn command_error(e: redis::RedisError) -> CoordinationError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
        CoordinationError::Connection(e.to_string())
    } else {
        CoordinationError::Command(e.to_string())
    }
}

#[async_trait]
impl CoordinationStore for RedisCoordinationStore {
    async fn increment_with_expiry(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<u64, CoordinationError> {
        let mut conn = self.connection().await?;
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(key)
            .cmd("EXPIRE")
            .arg(key)
            .arg(expiry_secs(window))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(count)
    }

    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CoordinationError> {
        let mut conn = self.connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(expiry_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), CoordinationError> {
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn delete_if_equals(
        &self,
        key: &str,
        expected: &str,
    ) -> Result<bool, CoordinationError> {
        let mut conn = self.connection().await?;
        let deleted: i64 = DELETE_IF_EQUALS
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(deleted == 1)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CoordinationError> {
        let mut conn = self.connection().await?;
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CoordinationError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(expiry_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
