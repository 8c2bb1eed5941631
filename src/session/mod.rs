//! The per-request session entity.

mod data;
mod handle;
mod id;

pub use data::SessionData;
pub use handle::SessionHandle;
pub use id::Id;

use serde::{Serialize, de::DeserializeOwned};
use std::borrow::Cow;

use crate::Result;

/// Reserved data key carrying a per-session cookie lifetime, in seconds.
///
/// It is written next to the user data when a session with an explicit
/// lifetime is persisted, and lifted back out when the session is loaded.
pub const SESSION_LIFETIME_KEY: &str = "__SESSION_TTL__";

/// Upper bound for any lifetime or expiry, in seconds (about 136 years).
pub const MAX_LIFETIME: i64 = u32::MAX as i64;

/// A session as seen by one request.
///
/// An empty `id` means no session has been issued to the client yet.
/// Change tracking compares the current data against a snapshot taken when
/// the session was constructed.
#[derive(Clone, Debug)]
pub struct Session {
    id: String,
    data: SessionData,
    original_data: SessionData,
    lifetime: Option<i64>,
    original_lifetime: Option<i64>,
    regenerated: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionData::new(), "")
    }
}

impl Session {
    /// Creates a session from loaded `data` under `id`.
    ///
    /// A lifetime stored under [`SESSION_LIFETIME_KEY`] is moved out of the
    /// data and becomes the session's [`lifetime`](Self::lifetime).
    pub fn new(mut data: SessionData, id: impl Into<String>) -> Self {
        let lifetime = if data.contains_key(SESSION_LIFETIME_KEY) {
            let lifetime = data.get::<i64>(SESSION_LIFETIME_KEY).unwrap_or_else(|err| {
                tracing::warn!(err = %err, "discarding undecodable session lifetime");
                None
            });
            data.remove(SESSION_LIFETIME_KEY);
            lifetime.map(clamp_lifetime)
        } else {
            None
        };

        Self {
            id: id.into(),
            original_data: data.clone(),
            data,
            lifetime,
            original_lifetime: lifetime,
            regenerated: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns a copy of this session's state under a different `id`.
    ///
    /// The copy starts with a clean change-tracking snapshot and without the
    /// regenerate flag.
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: self.data.clone(),
            original_data: self.data.clone(),
            lifetime: self.lifetime,
            original_lifetime: self.lifetime,
            regenerated: false,
        }
    }

    /// Issues a fresh id when the session has none or is flagged for
    /// regeneration; otherwise returns this very session, borrowed.
    pub fn initialize_id(&self) -> Cow<'_, Session> {
        if self.id.is_empty() || self.regenerated {
            return Cow::Owned(self.with_id(Id::generate().to_string()));
        }
        Cow::Borrowed(self)
    }

    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        Ok(self.data.get(key)?)
    }

    pub fn insert<T>(&mut self, key: impl Into<String>, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        Ok(self.data.insert(key, value)?)
    }

    /// Removes `key`, returning `true` if it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.data.remove(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The user data, without the reserved lifetime entry.
    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// The map written to the cache: the user data plus the reserved lifetime
    /// entry when an explicit lifetime is set.
    pub fn to_persisted_data(&self) -> Result<SessionData> {
        let mut data = self.data.clone();
        if let Some(lifetime) = self.lifetime {
            data.insert(SESSION_LIFETIME_KEY, &lifetime)?;
        }
        Ok(data)
    }

    pub fn has_changed(&self) -> bool {
        self.data != self.original_data || self.lifetime != self.original_lifetime
    }

    pub fn is_regenerated(&self) -> bool {
        self.regenerated
    }

    /// Requests a new identifier when the session is next persisted.
    pub fn regenerate(&mut self) {
        self.regenerated = true;
    }

    /// Overrides the cookie lifetime for this session.
    ///
    /// A positive value makes the cookie persistent for that many seconds;
    /// `0` turns it into a browser-session cookie. Values are clamped to
    /// `0..=MAX_LIFETIME`.
    pub fn persist_for(&mut self, seconds: i64) {
        self.lifetime = Some(clamp_lifetime(seconds));
    }

    /// The explicit cookie lifetime, if one was requested or loaded.
    pub fn lifetime(&self) -> Option<i64> {
        self.lifetime
    }
}

fn clamp_lifetime(seconds: i64) -> i64 {
    seconds.clamp(0, MAX_LIFETIME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_unchanged() {
        let session = Session::default();
        assert_eq!(session.id(), "");
        assert!(session.is_empty());
        assert!(!session.has_changed());
        assert!(!session.is_regenerated());
        assert_eq!(session.lifetime(), None);
    }

    #[test]
    fn insert_marks_changed_and_revert_clears_it() {
        let mut data = SessionData::new();
        data.insert("foo", "bar").unwrap();
        let mut session = Session::new(data, "abc");
        assert!(!session.has_changed());

        session.insert("foo", "baz").unwrap();
        assert!(session.has_changed());

        session.insert("foo", "bar").unwrap();
        assert!(!session.has_changed());
    }

    #[test]
    fn lifetime_is_lifted_out_of_loaded_data() {
        let mut data = SessionData::new();
        data.insert("foo", "bar").unwrap();
        data.insert(SESSION_LIFETIME_KEY, &600_i64).unwrap();

        let session = Session::new(data, "abc");
        assert_eq!(session.lifetime(), Some(600));
        assert!(!session.contains_key(SESSION_LIFETIME_KEY));
        assert_eq!(session.data().len(), 1);
        assert!(!session.has_changed());

        let persisted = session.to_persisted_data().unwrap();
        assert_eq!(persisted.get::<i64>(SESSION_LIFETIME_KEY).unwrap(), Some(600));
    }

    #[test]
    fn persist_for_counts_as_change() {
        let mut session = Session::new(SessionData::new(), "abc");
        session.persist_for(-5);
        assert_eq!(session.lifetime(), Some(0));
        assert!(session.has_changed());
    }

    #[test]
    fn persist_for_is_capped() {
        let mut session = Session::default();
        session.persist_for(i64::MAX);
        assert_eq!(session.lifetime(), Some(MAX_LIFETIME));
    }

    #[test]
    fn loaded_lifetime_is_capped() {
        let mut data = SessionData::new();
        data.insert(SESSION_LIFETIME_KEY, &i64::MAX).unwrap();

        let session = Session::new(data, "abc");
        assert_eq!(session.lifetime(), Some(MAX_LIFETIME));
    }

    #[test]
    fn undecodable_lifetime_is_discarded() {
        let mut data = SessionData::new();
        data.insert("foo", "bar").unwrap();
        data.insert(SESSION_LIFETIME_KEY, &()).unwrap();

        let session = Session::new(data, "abc");
        assert_eq!(session.lifetime(), None);
        assert!(!session.contains_key(SESSION_LIFETIME_KEY));
        assert_eq!(session.data().len(), 1);
    }

    #[test]
    fn with_id_resets_tracking() {
        let mut session = Session::default();
        session.insert("foo", "bar").unwrap();
        session.regenerate();

        let moved = session.with_id("new");
        assert_eq!(moved.id(), "new");
        assert_eq!(moved.get::<String>("foo").unwrap().as_deref(), Some("bar"));
        assert!(!moved.is_regenerated());
        assert!(!moved.has_changed());
    }
}
