//! Cache-backed session persistence.
//!
//! [`CacheSessionPersistence`] reconstructs a [`Session`] from the request cookie
//! and the cache, and on the way out decides whether the identifier must be
//! rotated, writes the session map back to the cache, and attaches the
//! `Set-Cookie` and cache-control headers to the response.

mod config;
pub mod headers;

pub use config::*;

use std::borrow::Cow;
use std::sync::Arc;

use cookie::Cookie;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Request, Response};
use time::OffsetDateTime;
use tower_cookies::Cookies;

use crate::persistence::headers::{
    build_cache_control_headers, build_set_cookie_header, has_cache_headers, http_date,
};
use crate::store::CacheStore;
use crate::{Error, Id, Result, Session, SessionData};

/// Persists sessions into a [`CacheStore`].
///
/// Built once at startup and shared between requests, typically behind an
/// `Arc` handed to [`SessionLayer`](crate::SessionLayer).
#[derive(Debug)]
pub struct CacheSessionPersistence<T: CacheStore> {
    store: Arc<T>,
    config: PersistenceConfig,
    last_modified: String,
}

impl<T> CacheSessionPersistence<T>
where
    T: CacheStore,
{
    /// Creates the persistence component.
    ///
    /// Fails with [`Error::InvalidConfig`] when a cookie attribute,
    /// `cache_expire` or `last_modified` cannot be sent as configured.
    /// Without a configured `last_modified`, the value is computed once here.
    pub fn new(store: Arc<T>, config: PersistenceConfig) -> Result<Self> {
        let last_modified = config
            .validate()
            .and_then(|()| match &config.last_modified {
                Some(last_modified) => validate_last_modified(last_modified),
                None => determine_last_modified(),
            })
            .inspect_err(|err| {
                tracing::error!(err = %err, "refusing to build session persistence");
            })?;

        Ok(Self {
            store,
            config,
            last_modified,
        })
    }

    /// Creates the persistence component from deserialized options, resolving
    /// the cache store registered under `cache_item_pool_service`.
    pub fn from_options<F>(options: &PersistenceOptions, resolve: F) -> Result<Self>
    where
        F: FnOnce(&str) -> Option<Arc<T>>,
    {
        let service = options.cache_item_pool_service.as_str();
        let store = resolve(service).ok_or_else(|| {
            tracing::error!(service, "cache store is not registered");
            Error::MissingStore(service.to_string())
        })?;

        Self::new(store, PersistenceConfig::from(options))
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<T> {
        &self.store
    }

    /// The `Last-Modified` value used by the `public` and `private` limiters.
    pub fn last_modified(&self) -> &str {
        &self.last_modified
    }

    /// Extracts the session identifier sent by the client.
    ///
    /// The raw `Cookie` header wins; the pre-parsed [`Cookies`] extension is
    /// consulted only when the header carries no usable value.
    pub fn session_id_from_request<B>(&self, req: &Request<B>) -> String {
        let name = self.config.cookie_name.as_str();

        let from_header = req
            .headers()
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| Cookie::split_parse(value))
            .filter_map(|cookie| cookie.ok())
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty());

        from_header
            .or_else(|| {
                req.extensions()
                    .get::<Cookies>()
                    .and_then(|cookies| cookies.get(name))
                    .map(|cookie| cookie.value().to_string())
            })
            .unwrap_or_default()
    }

    /// Loads the session stored under `id`.
    ///
    /// An empty `id` yields an empty session without touching the cache. A
    /// cache miss yields an empty session that keeps `id`.
    #[tracing::instrument(name = "loading session from cache", skip_all)]
    pub async fn load_session(&self, id: String) -> Result<Session> {
        if id.is_empty() {
            return Ok(Session::new(SessionData::new(), id));
        }

        let item = self.store.get(&id).await.map_err(|err| {
            tracing::error!(err = %err, "failed to read session from cache");
            err
        })?;

        let data = match item.into_value() {
            Some(data) => data,
            None => {
                tracing::debug!("session cache miss, starting with empty data");
                SessionData::new()
            }
        };

        Ok(Session::new(data, id))
    }

    /// Reconstructs the session for `req` from its cookie and the cache.
    pub async fn initialize_session_from_request<B>(&self, req: &Request<B>) -> Result<Session> {
        let id = self.session_id_from_request(req);
        self.load_session(id).await
    }

    /// Makes sure `session` has an identifier before headers are computed.
    ///
    /// A session without an id, or one flagged for regeneration, is copied
    /// under a fresh id. Otherwise the very same session is handed back
    /// borrowed, so callers can tell that nothing happened.
    pub fn initialize_id<'a>(&self, session: &'a Session) -> Cow<'a, Session> {
        session.initialize_id()
    }

    /// Writes `session` to the cache and attaches the session cookie and
    /// cache-control headers to `response`.
    ///
    /// A session that was never issued an id and holds nothing worth keeping
    /// leaves the response untouched and the cache unread.
    #[tracing::instrument(name = "persisting session to cache", skip_all)]
    pub async fn persist_session<B>(
        &self,
        session: &Session,
        mut response: Response<B>,
    ) -> Result<Response<B>> {
        let data = session.to_persisted_data()?;

        if session.id().is_empty() && (data.is_empty() || !session.has_changed()) {
            return Ok(response);
        }

        let rotate = self.should_regenerate(session);
        let id = if rotate {
            Id::generate().to_string()
        } else {
            session.id().to_string()
        };

        // Everything fallible about the response is settled before the cache
        // is touched.
        let now = OffsetDateTime::now_utc();
        let cookie = build_set_cookie_header(&self.config, &id, session.lifetime(), now)?;
        let cookie = HeaderValue::from_str(&cookie)?;
        let cache_headers = if has_cache_headers(response.headers()) {
            Vec::new()
        } else {
            build_cache_control_headers(
                self.config.cache_limiter,
                self.config.cache_expire,
                &self.last_modified,
                now,
            )?
            .into_iter()
            .map(|(name, value)| {
                HeaderValue::from_str(&value)
                    .map(|value| (name, value))
                    .map_err(Error::from)
            })
            .collect::<Result<Vec<_>>>()?
        };

        if rotate {
            self.drop_rotated(session.id()).await?;
        }

        let ttl = session
            .lifetime()
            .filter(|lifetime| *lifetime > 0)
            .unwrap_or(self.config.cache_expire);

        self.store.set(&id, &data, ttl).await.map_err(|err| {
            tracing::error!(err = %err, "failed to write session to cache");
            err
        })?;

        replace_cookie(response.headers_mut(), &self.config.cookie_name, cookie);
        for (name, value) in cache_headers {
            response.headers_mut().insert(name, value);
        }

        Ok(response)
    }

    fn should_regenerate(&self, session: &Session) -> bool {
        session.id().is_empty()
            || session.is_regenerated()
            || (self.config.auto_regenerate && session.has_changed())
    }

    /// Drops the cache entry of a rotated-away id, if any.
    async fn drop_rotated(&self, old_id: &str) -> Result<()> {
        if !old_id.is_empty() && self.store.exists(old_id).await? {
            self.store.delete(old_id).await.map_err(|err| {
                tracing::error!(err = %err, "failed to delete rotated session");
                err
            })?;
        }

        tracing::debug!("issuing a new session id");
        Ok(())
    }
}

/// Replaces any `Set-Cookie` for `name` with `value`, keeping other cookies.
fn replace_cookie(headers: &mut HeaderMap, name: &str, value: HeaderValue) {
    let others: Vec<HeaderValue> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter(|existing| !is_cookie_named(existing, name))
        .cloned()
        .collect();

    headers.remove(SET_COOKIE);
    for other in others {
        headers.append(SET_COOKIE, other);
    }
    headers.append(SET_COOKIE, value);
}

fn is_cookie_named(value: &HeaderValue, name: &str) -> bool {
    value
        .to_str()
        .ok()
        .and_then(|value| Cookie::parse(value).ok())
        .is_some_and(|cookie| cookie.name() == name)
}

fn validate_last_modified(last_modified: &str) -> Result<String> {
    HeaderValue::from_str(last_modified).map_err(|_| {
        Error::InvalidConfig(format!(
            "`{}` is not a valid Last-Modified value",
            last_modified.escape_debug()
        ))
    })?;
    Ok(last_modified.to_string())
}

/// The modification time of the running executable, or now if unavailable.
fn determine_last_modified() -> Result<String> {
    let modified = std::env::current_exe()
        .and_then(std::fs::metadata)
        .and_then(|metadata| metadata.modified())
        .map(OffsetDateTime::from)
        .unwrap_or_else(|_| OffsetDateTime::now_utc());

    http_date(modified)
}
