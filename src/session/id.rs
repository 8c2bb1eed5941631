use rand::RngCore;
use std::fmt::{self, Display};

/// A session identifier: 16 random bytes, rendered as 32 lowercase hex characters.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Id([u8; 16]);

impl Id {
    /// Draws a fresh identifier from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::generate()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
