#![allow(dead_code)]

use cache_session::store::{CacheItem, CacheStore, Error, MemoryStore};
use cache_session::{CacheSessionPersistence, PersistenceConfig, SessionData};
use cookie::Cookie;
use http::Response;
use http::header::SET_COOKIE;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TestUser {
    pub id: i64,
    pub name: String,
}

pub fn create_test_user() -> TestUser {
    TestUser {
        id: 1,
        name: "Test User".to_string(),
    }
}

/// A cache store that records every call before delegating to a `MemoryStore`.
#[derive(Clone, Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls so far, formatted as `op:key`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, op: &str, key: &str) {
        self.calls.lock().push(format!("{op}:{key}"));
    }
}

impl CacheStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<CacheItem, Error> {
        self.record("get", key);
        self.inner.get(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, Error> {
        self.record("exists", key);
        self.inner.exists(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        self.record("delete", key);
        self.inner.delete(key).await
    }

    async fn set(&self, key: &str, value: &SessionData, ttl_secs: i64) -> Result<bool, Error> {
        self.record("set", key);
        self.inner.set(key, value, ttl_secs).await
    }
}

/// A cache store whose every operation fails.
#[derive(Clone, Debug, Default)]
pub struct FailingStore;

impl CacheStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<CacheItem, Error> {
        Err(Error::Backend("cache unavailable".to_string()))
    }

    async fn exists(&self, _key: &str) -> Result<bool, Error> {
        Err(Error::Backend("cache unavailable".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<bool, Error> {
        Err(Error::Backend("cache unavailable".to_string()))
    }

    async fn set(&self, _key: &str, _value: &SessionData, _ttl_secs: i64) -> Result<bool, Error> {
        Err(Error::Backend("cache unavailable".to_string()))
    }
}

pub const COOKIE_NAME: &str = "test_sess";
pub const LAST_MODIFIED_DATE: &str = "Wed, 30 Dec 2020 12:00:00 GMT";

pub fn build_config() -> PersistenceConfig {
    PersistenceConfig::build()
        .cookie_name(COOKIE_NAME)
        .cookie_http_only(true)
        .cookie_secure(true)
        .cache_expire(600)
        .last_modified(LAST_MODIFIED_DATE)
}

pub fn build_persistence(
    config: PersistenceConfig,
) -> (RecordingStore, CacheSessionPersistence<RecordingStore>) {
    let store = RecordingStore::new();
    let persistence = CacheSessionPersistence::new(Arc::new(store.clone()), config).unwrap();
    (store, persistence)
}

/// Parses the session cookie out of the response's `Set-Cookie` headers.
pub fn session_cookie<B>(res: &Response<B>) -> Option<Cookie<'static>> {
    res.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| Cookie::parse(value.to_string()).ok())
        .find(|cookie| cookie.name() == COOKIE_NAME)
}

pub fn is_session_id(value: &str) -> bool {
    value.len() == 32
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
