use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use std::borrow::Cow;
use std::sync::Arc;

use crate::{Result, Session};

/// A request-scoped, shareable handle to the current [`Session`].
///
/// [`SessionService`](crate::SessionService) inserts one into the request
/// extensions and persists whatever state it holds once the inner service
/// has produced a response.
#[derive(Clone, Debug, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// The current session id; empty if none has been issued yet.
    pub fn id(&self) -> String {
        self.inner.lock().id().to_string()
    }

    /// Retrieves a value from the session.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cache_session::SessionHandle;
    ///
    /// let session = SessionHandle::default();
    /// session.insert("count", &1_u32).unwrap();
    /// assert_eq!(session.get::<u32>("count").unwrap(), Some(1));
    /// ```
    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.inner.lock().get(key)
    }

    pub fn insert<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.inner.lock().insert(key, value)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().remove(key)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Rotates the session id when the response is persisted, e.g. after a
    /// change in privilege level.
    pub fn regenerate(&self) {
        self.inner.lock().regenerate();
    }

    /// Overrides the cookie lifetime for this session, in seconds.
    pub fn persist_for(&self, seconds: i64) {
        self.inner.lock().persist_for(seconds);
    }

    /// Assigns an id now if the session has none or is flagged for
    /// regeneration, and returns the id the client will receive.
    pub fn initialize_id(&self) -> String {
        let mut session = self.inner.lock();
        let fresh = match session.initialize_id() {
            Cow::Owned(fresh) => Some(fresh),
            Cow::Borrowed(_) => None,
        };
        if let Some(fresh) = fresh {
            *session = fresh;
        }
        session.id().to_string()
    }

    /// A copy of the current session state.
    pub fn snapshot(&self) -> Session {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_id_is_stable() {
        let handle = SessionHandle::default();
        let first = handle.initialize_id();
        assert_eq!(first.len(), 32);
        assert_eq!(handle.initialize_id(), first);
        assert_eq!(handle.id(), first);
    }

    #[test]
    fn clones_share_state() {
        let handle = SessionHandle::default();
        let other = handle.clone();
        other.insert("foo", "bar").unwrap();

        assert_eq!(handle.get::<String>("foo").unwrap().as_deref(), Some("bar"));
        assert!(handle.snapshot().has_changed());
    }
}
