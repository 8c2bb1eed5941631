use std::future::Future;

use crate::SessionData;
use crate::store::Error;

/// The result of a cache lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheItem {
    key: String,
    value: Option<SessionData>,
}

impl CacheItem {
    /// An item for a key that was found in the cache.
    pub fn hit(key: impl Into<String>, value: SessionData) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
        }
    }

    /// An item for a key the cache does not hold.
    pub fn miss(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_hit(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&SessionData> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<SessionData> {
        self.value
    }
}

/// A key-value cache holding whole session maps under their session id.
pub trait CacheStore: Clone + Send + Sync + 'static {
    /// Looks up the session map stored at `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<CacheItem, Error>> + Send;

    /// Returns `true` if `key` is present and not expired.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Removes `key`.
    ///
    /// Returns `true` if an entry was deleted.
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Stores `value` at `key`, replacing any previous entry. The entry
    /// expires after `ttl_secs` seconds; a value `<= 0` stores it without expiry.
    fn set(
        &self,
        key: &str,
        value: &SessionData,
        ttl_secs: i64,
    ) -> impl Future<Output = Result<bool, Error>> + Send;
}
