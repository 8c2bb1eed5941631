use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::SessionData;
use crate::store::{CacheItem, CacheStore, Error, deserialize_value, serialize_value};

#[derive(Debug, Clone)]
struct StoredValue {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self) -> bool {
        self.expires_at
            .map(|expires| expires > Instant::now())
            .unwrap_or(true)
    }
}

/// An in-memory cache store implementation.
///
/// Session maps are encoded with the crate codec before they are stored, so
/// reads hand back an independent copy just as a networked cache would.
///
/// ### Note
///
/// Do not use this in a production environment.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    data: Arc<DashMap<String, StoredValue>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.cleanup_expired();
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cleanup_expired(&self) {
        self.data.retain(|_, value| value.is_live());
    }
}

impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<CacheItem, Error> {
        self.cleanup_expired();

        let Some(stored) = self.data.get(key) else {
            return Ok(CacheItem::miss(key));
        };

        if !stored.is_live() {
            return Ok(CacheItem::miss(key));
        }

        let value: SessionData = deserialize_value(&stored.data)?;
        Ok(CacheItem::hit(key, value))
    }

    async fn exists(&self, key: &str) -> Result<bool, Error> {
        self.cleanup_expired();

        Ok(self
            .data
            .get(key)
            .map(|stored| stored.is_live())
            .unwrap_or(false))
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        self.cleanup_expired();

        Ok(self.data.remove(key).is_some())
    }

    async fn set(&self, key: &str, value: &SessionData, ttl_secs: i64) -> Result<bool, Error> {
        self.cleanup_expired();

        let expires_at = u64::try_from(ttl_secs)
            .ok()
            .filter(|ttl| *ttl > 0)
            .and_then(|ttl| Instant::now().checked_add(Duration::from_secs(ttl)));

        self.data.insert(
            key.to_string(),
            StoredValue {
                data: serialize_value(value)?,
                expires_at,
            },
        );

        Ok(true)
    }
}
