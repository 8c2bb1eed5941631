use cookie::SameSite;
use serde::Deserialize;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::{Error, MAX_LIFETIME, Result};

pub const DEFAULT_COOKIE_NAME: &str = "PHPSESSION";
pub const DEFAULT_COOKIE_PATH: &str = "/";
pub const DEFAULT_CACHE_EXPIRE: i64 = 10800;

/// Which family of cache-control headers accompanies a persisted session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheLimiter {
    #[default]
    NoCache,
    Public,
    Private,
    PrivateNoExpire,
}

impl CacheLimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheLimiter::NoCache => "nocache",
            CacheLimiter::Public => "public",
            CacheLimiter::Private => "private",
            CacheLimiter::PrivateNoExpire => "private_no_expire",
        }
    }
}

/// Unrecognized values fall back to [`CacheLimiter::NoCache`].
impl FromStr for CacheLimiter {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "public" => CacheLimiter::Public,
            "private" => CacheLimiter::Private,
            "private_no_expire" => CacheLimiter::PrivateNoExpire,
            "nocache" => CacheLimiter::NoCache,
            other => {
                tracing::debug!(cache_limiter = other, "unknown cache limiter, using nocache");
                CacheLimiter::NoCache
            }
        })
    }
}

impl fmt::Display for CacheLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a `SameSite` attribute value case-insensitively; anything unknown is `Lax`.
pub fn parse_same_site(value: &str) -> SameSite {
    if value.eq_ignore_ascii_case("strict") {
        SameSite::Strict
    } else if value.eq_ignore_ascii_case("none") {
        SameSite::None
    } else {
        SameSite::Lax
    }
}

/// Configuration for cache-backed session persistence.
///
/// # Example
///
/// ```rust
/// use cache_session::{CacheLimiter, PersistenceConfig};
///
/// let config = PersistenceConfig::build()
///         .cookie_name("app_sess")
///         .cookie_http_only(true)
///         .cookie_same_site(cookie::SameSite::Strict)
///         .cookie_secure(true)
///         .cache_limiter(CacheLimiter::Private)
///         .cache_expire(60 * 60)
///         .persistent(true);
/// ```
#[derive(Clone, Debug)]
pub struct PersistenceConfig {
    pub cookie_name: String,
    pub cookie_path: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
    pub cookie_same_site: SameSite,
    pub cache_limiter: CacheLimiter,
    pub cache_expire: i64,
    pub last_modified: Option<String>,
    pub persistent: bool,
    pub auto_regenerate: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_path: DEFAULT_COOKIE_PATH.to_string(),
            cookie_domain: None,
            cookie_secure: false,
            cookie_http_only: false,
            cookie_same_site: SameSite::Lax,
            cache_limiter: CacheLimiter::NoCache,
            cache_expire: DEFAULT_CACHE_EXPIRE,
            last_modified: None,
            persistent: false,
            auto_regenerate: true,
        }
    }
}

impl PersistenceConfig {
    /// Creates a new `PersistenceConfig` with default values.
    pub fn build() -> Self {
        Self::default()
    }

    /// Sets the name of the session cookie.
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn cookie_path(mut self, path: impl Into<String>) -> Self {
        self.cookie_path = path.into();
        self
    }

    pub fn cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    pub fn cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    pub fn cookie_http_only(mut self, http_only: bool) -> Self {
        self.cookie_http_only = http_only;
        self
    }

    pub fn cookie_same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_same_site = same_site;
        self
    }

    pub fn cache_limiter(mut self, limiter: CacheLimiter) -> Self {
        self.cache_limiter = limiter;
        self
    }

    /// Sets the cache entry TTL and default persistent-cookie lifetime, in seconds.
    pub fn cache_expire(mut self, seconds: i64) -> Self {
        self.cache_expire = seconds;
        self
    }

    /// Pins the `Last-Modified` value instead of computing it at startup.
    pub fn last_modified(mut self, http_date: impl Into<String>) -> Self {
        self.last_modified = Some(http_date.into());
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn auto_regenerate(mut self, auto_regenerate: bool) -> Self {
        self.auto_regenerate = auto_regenerate;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.cookie_name.is_empty() {
            return Err(Error::InvalidConfig(
                "the session cookie name must not be empty".to_string(),
            ));
        }
        if !self.cookie_name.bytes().all(is_token_byte) {
            return Err(Error::InvalidConfig(format!(
                "`{}` is not a valid cookie name",
                self.cookie_name.escape_debug()
            )));
        }
        if !is_attribute_value(&self.cookie_path) {
            return Err(Error::InvalidConfig(format!(
                "`{}` is not a valid cookie path",
                self.cookie_path.escape_debug()
            )));
        }
        if let Some(domain) = self.cookie_domain.as_deref().filter(|d| !is_attribute_value(d)) {
            return Err(Error::InvalidConfig(format!(
                "`{}` is not a valid cookie domain",
                domain.escape_debug()
            )));
        }
        if !(0..=MAX_LIFETIME).contains(&self.cache_expire) {
            return Err(Error::InvalidConfig(format!(
                "cache_expire must be between 0 and {MAX_LIFETIME} seconds, got {}",
                self.cache_expire
            )));
        }
        Ok(())
    }
}

/// RFC 6265 cookie-name characters: visible ASCII minus separators.
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
}

fn is_attribute_value(value: &str) -> bool {
    value.bytes().all(|b| (b' '..=b'~').contains(&b) && b != b';')
}

/// The deserializable configuration surface, e.g. a `session` table in a config file.
#[derive(Clone, Debug, Deserialize)]
pub struct PersistenceOptions {
    /// Name under which the cache store is registered.
    pub cache_item_pool_service: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,
    #[serde(default)]
    pub cookie_domain: Option<String>,
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default)]
    pub cookie_http_only: bool,
    #[serde(default = "default_same_site")]
    pub cookie_same_site: String,
    #[serde(default = "default_cache_limiter")]
    pub cache_limiter: String,
    #[serde(default = "default_cache_expire")]
    pub cache_expire: i64,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub persistent: bool,
    #[serde(
        default = "default_auto_regenerate",
        alias = "autoRegenerate",
        alias = "regenerate_on_change"
    )]
    pub auto_regenerate: bool,
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

fn default_cookie_path() -> String {
    DEFAULT_COOKIE_PATH.to_string()
}

fn default_same_site() -> String {
    "Lax".to_string()
}

fn default_cache_limiter() -> String {
    CacheLimiter::NoCache.as_str().to_string()
}

fn default_cache_expire() -> i64 {
    DEFAULT_CACHE_EXPIRE
}

fn default_auto_regenerate() -> bool {
    true
}

impl From<&PersistenceOptions> for PersistenceConfig {
    fn from(options: &PersistenceOptions) -> Self {
        Self {
            cookie_name: options.cookie_name.clone(),
            cookie_path: options.cookie_path.clone(),
            cookie_domain: options.cookie_domain.clone(),
            cookie_secure: options.cookie_secure,
            cookie_http_only: options.cookie_http_only,
            cookie_same_site: parse_same_site(&options.cookie_same_site),
            cache_limiter: options
                .cache_limiter
                .parse()
                .unwrap_or_else(|never: Infallible| match never {}),
            cache_expire: options.cache_expire,
            last_modified: options.last_modified.clone(),
            persistent: options.persistent,
            auto_regenerate: options.auto_regenerate,
        }
    }
}
