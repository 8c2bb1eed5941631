use fred::clients::Pool;
use fred::interfaces::KeysInterface;
use fred::types::Expiration;
use std::{fmt::Debug, sync::Arc};

use crate::SessionData;
use crate::store::{CacheItem, CacheStore, Error, deserialize_value, serialize_value};

/// A redis cache store implementation.
///
/// Each session map is encoded with the crate codec and stored as a single
/// string value, optionally under a key prefix, with a native `EX` expiry.
#[derive(Clone, Debug)]
pub struct RedisStore<C: KeysInterface + Clone + Send + Sync = Pool> {
    client: Arc<C>,
    prefix: Option<String>,
}

impl<C> RedisStore<C>
where
    C: KeysInterface + Clone + Send + Sync,
{
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            prefix: None,
        }
    }

    /// Namespaces every session key, e.g. `"session:"`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn redis_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        }
    }
}

impl<C> CacheStore for RedisStore<C>
where
    C: KeysInterface + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<CacheItem, Error> {
        let value = self
            .client
            .get::<Option<Vec<u8>>, _>(self.redis_key(key))
            .await?;

        match value {
            Some(value) => {
                let data: SessionData = deserialize_value(&value)?;
                Ok(CacheItem::hit(key, data))
            }
            None => Ok(CacheItem::miss(key)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, Error> {
        let count: i64 = self.client.exists(self.redis_key(key)).await?;
        Ok(count > 0)
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        let count: i64 = self.client.del(self.redis_key(key)).await?;
        Ok(count > 0)
    }

    async fn set(&self, key: &str, value: &SessionData, ttl_secs: i64) -> Result<bool, Error> {
        let serialized = serialize_value(value)?;
        let expiration = (ttl_secs > 0).then_some(Expiration::EX(ttl_secs));

        let _: () = self
            .client
            .set(
                self.redis_key(key),
                serialized.as_slice(),
                expiration,
                None,
                false,
            )
            .await?;

        Ok(true)
    }
}
