use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;

use crate::store::{self, deserialize_value, serialize_value};

/// The key-value bag of a session.
///
/// Every value is kept in its encoded form and only decoded on access, so the
/// whole map can be written to a cache as-is.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionData(HashMap<String, Vec<u8>>);

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the value stored under `field`.
    pub fn get<T>(&self, field: &str) -> Result<Option<T>, store::Error>
    where
        T: DeserializeOwned,
    {
        self.0
            .get(field)
            .map(|raw| deserialize_value(raw))
            .transpose()
    }

    /// Encodes and stores `value` under `field`, replacing any previous value.
    pub fn insert<T>(&mut self, field: impl Into<String>, value: &T) -> Result<(), store::Error>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serialize_value(value)?;
        self.0.insert(field.into(), encoded);
        Ok(())
    }

    /// Removes `field`, returning `true` if it was present.
    pub fn remove(&mut self, field: &str) -> bool {
        self.0.remove(field).is_some()
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}
