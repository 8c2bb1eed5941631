//! Pure builders for the `Set-Cookie` and cache-control headers attached to a
//! persisted session.

use http::HeaderMap;
use http::header::{CACHE_CONTROL, EXPIRES, HeaderName, LAST_MODIFIED, PRAGMA};
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::persistence::{CacheLimiter, PersistenceConfig};
use crate::{Error, MAX_LIFETIME, Result};

/// A fixed date far in the past, used to mark responses as already expired.
pub const CACHE_PAST_DATE: &str = "Thu, 19 Nov 1981 08:52:00 GMT";

/// Headers whose presence means the application already decided on caching.
pub const CACHE_HEADERS: [HeaderName; 4] = [CACHE_CONTROL, EXPIRES, LAST_MODIFIED, PRAGMA];

/// Formats `at` as an RFC 7231 IMF-fixdate, e.g. `Fri, 01 Jan 2021 00:00:00 GMT`.
pub fn http_date(at: OffsetDateTime) -> Result<String> {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    Ok(at.to_offset(UtcOffset::UTC).format(&format)?)
}

/// Formats the date `seconds` after `now`.
pub fn http_date_after(now: OffsetDateTime, seconds: i64) -> Result<String> {
    let at = now
        .checked_add(Duration::seconds(seconds))
        .ok_or(Error::DateOutOfRange(seconds))?;
    http_date(at)
}

/// Resolves how many seconds the session cookie should persist; `0` means a
/// browser-session cookie without `Expires`.
///
/// An explicit per-session lifetime wins over the global `persistent` flag in
/// both directions.
pub fn cookie_lifetime(config: &PersistenceConfig, lifetime: Option<i64>) -> i64 {
    let lifetime = match lifetime {
        Some(lifetime) => lifetime,
        None if config.persistent => config.cache_expire,
        None => 0,
    };
    lifetime.clamp(0, MAX_LIFETIME)
}

/// Builds the `Set-Cookie` value for session `id`.
///
/// Attributes are emitted in the order `Path`, `Domain`, `Expires`, `Secure`,
/// `HttpOnly`, `SameSite`.
pub fn build_set_cookie_header(
    config: &PersistenceConfig,
    id: &str,
    lifetime: Option<i64>,
    now: OffsetDateTime,
) -> Result<String> {
    let mut header = format!("{}={}", config.cookie_name, id);

    if !config.cookie_path.is_empty() {
        header.push_str("; Path=");
        header.push_str(&config.cookie_path);
    }

    if let Some(domain) = config.cookie_domain.as_deref().filter(|d| !d.is_empty()) {
        header.push_str("; Domain=");
        header.push_str(domain);
    }

    let lifetime = cookie_lifetime(config, lifetime);
    if lifetime > 0 {
        header.push_str("; Expires=");
        header.push_str(&http_date_after(now, lifetime)?);
    }

    if config.cookie_secure {
        header.push_str("; Secure");
    }

    if config.cookie_http_only {
        header.push_str("; HttpOnly");
    }

    header.push_str("; SameSite=");
    header.push_str(&config.cookie_same_site.to_string());

    Ok(header)
}

/// Builds the cache-control header set selected by `limiter`.
pub fn build_cache_control_headers(
    limiter: CacheLimiter,
    cache_expire: i64,
    last_modified: &str,
    now: OffsetDateTime,
) -> Result<Vec<(HeaderName, String)>> {
    let max_age = format!("max-age={cache_expire}");

    let headers = match limiter {
        CacheLimiter::NoCache => vec![
            (EXPIRES, CACHE_PAST_DATE.to_string()),
            (
                CACHE_CONTROL,
                "no-store, no-cache, must-revalidate".to_string(),
            ),
            (PRAGMA, "no-cache".to_string()),
        ],
        CacheLimiter::Public => vec![
            (EXPIRES, http_date_after(now, cache_expire)?),
            (CACHE_CONTROL, format!("public, {max_age}")),
            (LAST_MODIFIED, last_modified.to_string()),
        ],
        CacheLimiter::Private => vec![
            (EXPIRES, CACHE_PAST_DATE.to_string()),
            (CACHE_CONTROL, format!("private, {max_age}")),
            (LAST_MODIFIED, last_modified.to_string()),
        ],
        CacheLimiter::PrivateNoExpire => vec![
            (CACHE_CONTROL, format!("private, {max_age}")),
            (LAST_MODIFIED, last_modified.to_string()),
        ],
    };

    Ok(headers)
}

/// Returns `true` if any cache-control family header is already present.
pub fn has_cache_headers(headers: &HeaderMap) -> bool {
    CACHE_HEADERS.iter().any(|name| headers.contains_key(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cookie::SameSite;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2021-01-01 00:00:00 UTC);
    const LAST_MODIFIED_DATE: &str = "Wed, 30 Dec 2020 12:00:00 GMT";

    fn header<'a>(headers: &'a [(HeaderName, String)], name: &HeaderName) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn formats_http_dates() {
        assert_eq!(http_date(NOW).unwrap(), "Fri, 01 Jan 2021 00:00:00 GMT");

        let offset = datetime!(2021-01-01 2:00 +2);
        assert_eq!(http_date(offset).unwrap(), "Fri, 01 Jan 2021 00:00:00 GMT");
    }

    #[test]
    fn cookie_attributes_in_order() {
        let config = PersistenceConfig::build()
            .cookie_name("sess")
            .cookie_path("/app")
            .cookie_domain("example.com")
            .cookie_secure(true)
            .cookie_http_only(true)
            .cookie_same_site(SameSite::Strict)
            .persistent(true)
            .cache_expire(60);

        let header = build_set_cookie_header(&config, "abc", None, NOW).unwrap();
        assert_eq!(
            header,
            "sess=abc; Path=/app; Domain=example.com; Expires=Fri, 01 Jan 2021 00:01:00 GMT; \
             Secure; HttpOnly; SameSite=Strict"
        );
    }

    #[test]
    fn minimal_cookie() {
        let config = PersistenceConfig::build().cookie_name("sess");
        let header = build_set_cookie_header(&config, "abc", None, NOW).unwrap();
        assert_eq!(header, "sess=abc; Path=/; SameSite=Lax");
    }

    #[test]
    fn lifetime_resolution() {
        let session_cookie = PersistenceConfig::build().cache_expire(100);
        let persistent = PersistenceConfig::build().cache_expire(100).persistent(true);

        assert_eq!(cookie_lifetime(&session_cookie, None), 0);
        assert_eq!(cookie_lifetime(&persistent, None), 100);
        assert_eq!(cookie_lifetime(&session_cookie, Some(30)), 30);
        assert_eq!(cookie_lifetime(&persistent, Some(30)), 30);
        assert_eq!(cookie_lifetime(&persistent, Some(0)), 0);
        assert_eq!(cookie_lifetime(&persistent, Some(-4)), 0);
    }

    #[test]
    fn far_future_dates_are_an_error() {
        assert_eq!(
            http_date_after(NOW, 3600).unwrap(),
            "Fri, 01 Jan 2021 01:00:00 GMT"
        );
        assert!(matches!(
            http_date_after(NOW, i64::MAX),
            Err(Error::DateOutOfRange(i64::MAX))
        ));
    }

    #[test]
    fn oversized_lifetime_is_capped() {
        let config = PersistenceConfig::build();
        assert_eq!(cookie_lifetime(&config, Some(i64::MAX)), MAX_LIFETIME);

        let header = build_set_cookie_header(&config, "abc", Some(i64::MAX), NOW).unwrap();
        assert!(header.contains("; Expires="));
    }

    #[test]
    fn zero_lifetime_suppresses_expires() {
        let config = PersistenceConfig::build().persistent(true);
        let header = build_set_cookie_header(&config, "abc", Some(0), NOW).unwrap();
        assert!(!header.contains("Expires"));
    }

    #[test]
    fn nocache_headers() {
        let headers =
            build_cache_control_headers(CacheLimiter::NoCache, 60, LAST_MODIFIED_DATE, NOW)
                .unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(header(&headers, &EXPIRES), Some(CACHE_PAST_DATE));
        assert_eq!(
            header(&headers, &CACHE_CONTROL),
            Some("no-store, no-cache, must-revalidate")
        );
        assert_eq!(header(&headers, &PRAGMA), Some("no-cache"));
        assert_eq!(header(&headers, &LAST_MODIFIED), None);
    }

    #[test]
    fn public_headers() {
        let headers =
            build_cache_control_headers(CacheLimiter::Public, 60, LAST_MODIFIED_DATE, NOW)
                .unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(
            header(&headers, &EXPIRES),
            Some("Fri, 01 Jan 2021 00:01:00 GMT")
        );
        assert_eq!(header(&headers, &CACHE_CONTROL), Some("public, max-age=60"));
        assert_eq!(header(&headers, &LAST_MODIFIED), Some(LAST_MODIFIED_DATE));
        assert_eq!(header(&headers, &PRAGMA), None);
    }

    #[test]
    fn private_headers() {
        let headers =
            build_cache_control_headers(CacheLimiter::Private, 60, LAST_MODIFIED_DATE, NOW)
                .unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(header(&headers, &EXPIRES), Some(CACHE_PAST_DATE));
        assert_eq!(header(&headers, &CACHE_CONTROL), Some("private, max-age=60"));
        assert_eq!(header(&headers, &LAST_MODIFIED), Some(LAST_MODIFIED_DATE));
    }

    #[test]
    fn private_no_expire_headers() {
        let headers = build_cache_control_headers(
            CacheLimiter::PrivateNoExpire,
            60,
            LAST_MODIFIED_DATE,
            NOW,
        )
        .unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(header(&headers, &EXPIRES), None);
        assert_eq!(header(&headers, &CACHE_CONTROL), Some("private, max-age=60"));
        assert_eq!(header(&headers, &LAST_MODIFIED), Some(LAST_MODIFIED_DATE));
    }

    #[test]
    fn detects_existing_cache_headers() {
        let mut headers = HeaderMap::new();
        assert!(!has_cache_headers(&headers));

        headers.insert("pragma", "no-cache".parse().unwrap());
        assert!(has_cache_headers(&headers));
    }
}
