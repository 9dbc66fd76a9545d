//! The storage adapter contract and a reference in-memory implementation
//! (§4.6).

use crate::clock::SharedClock;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A pure function from the current value (`None` if absent/expired) to
/// either a new value to write (with an optional TTL) or `None` to skip the
/// write (§4.6: `update(key, updater)`).
pub type Updater<'a> = dyn Fn(Option<&Value>) -> Option<(Value, Option<u64>)> + Send + Sync + 'a;

/// A stateful key-value extension point rules and the rate-limit extension
/// read and write through (§4.6).
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Read the current value, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value at `key`. `ttl_ms` of `None` or `0` means no expiry.
    async fn set(&self, key: &str, value: Value, ttl_ms: Option<u64>) -> Result<()>;

    /// Remove `key`.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomic read-modify-write. The default implementation falls back to a
    /// non-atomic get-then-set (§4.6: "rate-limit falls back ... accepting
    /// race for embedded use"); adapters that can do better should override.
    async fn update(&self, key: &str, updater: &Updater<'_>) -> Result<Option<Value>> {
        let current = self.get(key).await?;
        match updater(current.as_ref()) {
            Some((value, ttl_ms)) => {
                self.set(key, value.clone(), ttl_ms).await?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

/// Tool-bag wrapper so a storage adapter can be registered under a key such
/// as `"storage"` and looked up with [`crate::tools::ToolBag::get`].
#[derive(Clone)]
pub struct StorageTool(pub Arc<dyn StorageAdapter>);

/// Extend `context` with `adapter` registered under the `"storage"` tool key
/// (§4.6, §6: `withStorage`). Rules that need persistence — most notably the
/// rate-limit extension — look the adapter up from there.
pub fn with_storage(context: &crate::context::Context, adapter: Arc<dyn StorageAdapter>) -> Result<crate::context::Context> {
    let tools = crate::tools::ToolBag::new().with_tool("storage", StorageTool(adapter));
    context.extend(crate::schema::Schema::empty(), Value::Object(Default::default()), tools)
}

struct Entry {
    value: Value,
    expires_at_ms: Option<u64>,
}

/// Reference in-memory adapter: a single mutex around the whole map gives
/// `update` linearizable semantics across all keys, a stronger guarantee
/// than the per-key mutual exclusion the contract requires (§4.6).
pub struct InMemoryStorageAdapter {
    clock: SharedClock,
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStorageAdapter {
    /// Build an adapter driven by `clock` for TTL expiry.
    pub fn new(clock: SharedClock) -> Self {
        Self { clock, entries: Mutex::new(HashMap::new()) }
    }

    fn is_live(&self, entry: &Entry, now_ms: u64) -> bool {
        match entry.expires_at_ms {
            Some(expires_at) => now_ms < expires_at,
            None => true,
        }
    }
}

#[async_trait]
impl StorageAdapter for InMemoryStorageAdapter {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now_ms = self.clock.now_ms();
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if self.is_live(entry, now_ms) => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl_ms: Option<u64>) -> Result<()> {
        let now_ms = self.clock.now_ms();
        let expires_at_ms = match ttl_ms {
            Some(ttl) if ttl > 0 => Some(now_ms + ttl),
            _ => None,
        };
        self.entries.lock().await.insert(key.to_string(), Entry { value, expires_at_ms });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn update(&self, key: &str, updater: &Updater<'_>) -> Result<Option<Value>> {
        let now_ms = self.clock.now_ms();
        let mut entries = self.entries.lock().await;
        let current = match entries.get(key) {
            Some(entry) if self.is_live(entry, now_ms) => Some(entry.value.clone()),
            _ => None,
        };
        match updater(current.as_ref()) {
            Some((value, ttl_ms)) => {
                let expires_at_ms = match ttl_ms {
                    Some(ttl) if ttl > 0 => Some(now_ms + ttl),
                    _ => None,
                };
                entries.insert(key.to_string(), Entry { value: value.clone(), expires_at_ms });
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}
