//! Session management middleware for tower applications.
//!
//! This module provides [`SessionLayer`] for plugging
//! [`CacheSessionPersistence`] into a tower stack.

use http::{Request, Response, StatusCode};
use tower::{Layer, Service};

use crate::SessionHandle;
use crate::persistence::CacheSessionPersistence;
use crate::store::CacheStore;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A Tower Middleware that loads the session before the inner service runs
/// and persists it afterwards.
#[derive(Debug)]
pub struct SessionService<S, T: CacheStore> {
    inner: S,
    persistence: Arc<CacheSessionPersistence<T>>,
}

impl<S: Clone, T: CacheStore> Clone for SessionService<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            persistence: Arc::clone(&self.persistence),
        }
    }
}

impl<S, T> SessionService<S, T>
where
    T: CacheStore,
{
    fn new(inner: S, persistence: Arc<CacheSessionPersistence<T>>) -> Self {
        Self { inner, persistence }
    }
}

impl<ReqBody, ResBody, S, T> Service<Request<ReqBody>> for SessionService<S, T>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
    T: CacheStore,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let persistence = Arc::clone(&self.persistence);

        // The clone is not necessarily ready; keep the one `poll_ready` was called on.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let id = persistence.session_id_from_request(&req);

        Box::pin(async move {
            let session = match persistence.load_session(id).await {
                Ok(session) => session,
                Err(err) => {
                    tracing::error!(err = %err, "failed to load session");
                    return Ok(internal_server_error());
                }
            };

            let handle = SessionHandle::new(session);
            req.extensions_mut().insert(handle.clone());

            let res = inner.call(req).await?;

            match persistence.persist_session(&handle.snapshot(), res).await {
                Ok(res) => Ok(res),
                Err(err) => {
                    tracing::error!(err = %err, "failed to persist session");
                    Ok(internal_server_error())
                }
            }
        })
    }
}

fn internal_server_error<B: Default>() -> Response<B> {
    let mut res = Response::new(B::default());
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res
}

/// Layer to apply [`SessionService`] middleware.
///
/// # Example
///
/// ```rust
/// use cache_session::{CacheSessionPersistence, PersistenceConfig, SessionLayer};
/// use cache_session::store::MemoryStore;
/// use std::sync::Arc;
///
/// let config = PersistenceConfig::build()
///         .cookie_name("app_sess")
///         .cookie_http_only(true)
///         .cookie_secure(true);
/// let store = Arc::new(MemoryStore::new());
/// let persistence = CacheSessionPersistence::new(store, config).unwrap();
/// let session_layer = SessionLayer::new(Arc::new(persistence));
/// ```
#[derive(Debug)]
pub struct SessionLayer<T: CacheStore> {
    persistence: Arc<CacheSessionPersistence<T>>,
}

impl<T: CacheStore> Clone for SessionLayer<T> {
    fn clone(&self) -> Self {
        Self {
            persistence: Arc::clone(&self.persistence),
        }
    }
}

impl<T> SessionLayer<T>
where
    T: CacheStore,
{
    /// Create a new session layer.
    pub fn new(persistence: Arc<CacheSessionPersistence<T>>) -> Self {
        Self { persistence }
    }
}

impl<S, T> Layer<S> for SessionLayer<T>
where
    T: CacheStore,
{
    type Service = SessionService<S, T>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService::new(inner, Arc::clone(&self.persistence))
    }
}
