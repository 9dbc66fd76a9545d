//! A distributed `StorageAdapter` over Redis, implementing `update` via the
//! lock-key protocol of §4.6: acquire a lock with an instance-unique token
//! and TTL, read, compute, conditionally write, release. Lock expiry before
//! release is surfaced as an error — the write may have been lost.

use async_trait::async_trait;
use bantai_core::error::{Error, Result};
use bantai_core::storage::{StorageAdapter, Updater};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, SetExpiry, SetOptions};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_LOCK_TTL_MS: u64 = 5_000;
const DEFAULT_MAX_RETRIES: u32 = 10;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 50;

fn storage_err(key: &str, err: redis::RedisError) -> Error {
    let transient = err.is_timeout() || err.is_connection_dropped() || err.is_io_error();
    Error::Storage { key: key.to_string(), message: err.to_string(), transient }
}

/// Redis-backed storage adapter. Cheap to clone: the underlying
/// `ConnectionManager` multiplexes over one managed connection with
/// automatic reconnection.
#[derive(Clone)]
pub struct RedisStorageAdapter {
    manager: ConnectionManager,
    lock_ttl_ms: u64,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl RedisStorageAdapter {
    /// Connect to `redis_url` and build an adapter with default lock
    /// parameters.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Storage { key: "connect".into(), message: e.to_string(), transient: true })?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::Storage { key: "connect".into(), message: e.to_string(), transient: true })?;
        Ok(Self::new(manager))
    }

    /// Build an adapter over an already-connected manager.
    pub fn new(manager: ConnectionManager) -> Self {
        Self {
            manager,
            lock_ttl_ms: DEFAULT_LOCK_TTL_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }

    /// Override the lock TTL; must comfortably exceed the expected duration
    /// of the updater closure.
    pub fn with_lock_ttl_ms(mut self, lock_ttl_ms: u64) -> Self {
        self.lock_ttl_ms = lock_ttl_ms;
        self
    }

    /// Override lock-acquisition retry and backoff parameters (§4.6:
    /// "configured per adapter").
    pub fn with_retry(mut self, max_retries: u32, retry_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }

    async fn acquire_lock(&self, lock_key: &str, token: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        for attempt in 0..self.max_retries {
            let acquired: Option<String> = redis::cmd("SET")
                .arg(lock_key)
                .arg(token)
                .arg("NX")
                .arg("PX")
                .arg(self.lock_ttl_ms)
                .query_async(&mut conn)
                .await
                .map_err(|e| storage_err(lock_key, e))?;
            if acquired.is_some() {
                return Ok(());
            }
            if attempt + 1 < self.max_retries {
                tokio::time::sleep(Duration::from_millis(self.retry_backoff_ms)).await;
            }
        }
        Err(Error::Lock { key: lock_key.to_string(), message: "timed out acquiring lock".to_string() })
    }

    async fn release_lock(&self, lock_key: &str, token: &str) -> Result<()> {
        let script = redis::Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
            "#,
        );
        let mut conn = self.manager.clone();
        let released: i64 =
            script.key(lock_key).arg(token).invoke_async(&mut conn).await.map_err(|e| storage_err(lock_key, e))?;
        if released == 0 {
            return Err(Error::Lock {
                key: lock_key.to_string(),
                message: "lock expired before release; write may have been lost".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for RedisStorageAdapter {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(key).await.map_err(|e| storage_err(key, e))?;
        raw.map(|s| serde_json::from_str(&s).map_err(|e| Error::Storage { key: key.to_string(), message: e.to_string(), transient: false }))
            .transpose()
    }

    async fn set(&self, key: &str, value: Value, ttl_ms: Option<u64>) -> Result<()> {
        let mut conn = self.manager.clone();
        let raw = serde_json::to_string(&value)
            .map_err(|e| Error::Storage { key: key.to_string(), message: e.to_string(), transient: false })?;
        match ttl_ms {
            Some(ttl) if ttl > 0 => {
                let options = SetOptions::default().with_expiration(SetExpiry::PX(ttl as usize));
                let _: () = conn.set_options(key, raw, options).await.map_err(|e| storage_err(key, e))?;
            }
            _ => {
                let _: () = conn.set(key, raw).await.map_err(|e| storage_err(key, e))?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await.map_err(|e| storage_err(key, e))?;
        Ok(())
    }

    async fn update(&self, key: &str, updater: &Updater<'_>) -> Result<Option<Value>> {
        let lock_key = format!("{key}:lock");
        let token = Uuid::new_v4().to_string();
        self.acquire_lock(&lock_key, &token).await?;

        let outcome = async {
            let current = self.get(key).await?;
            match updater(current.as_ref()) {
                Some((value, ttl_ms)) => {
                    self.set(key, value.clone(), ttl_ms).await?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
        .await;

        self.release_lock(&lock_key, &token).await?;
        outcome
    }
}
