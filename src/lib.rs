//! # cache-session: cache-backed session persistence for tower applications
//!
//! `cache-session` keeps HTTP sessions in a key-value cache. It reads the session
//! identifier from the request cookie, loads the session map from the cache,
//! and once the response is ready decides whether the identifier has to be
//! rotated, writes the map back, and attaches the `Set-Cookie` and
//! cache-control headers.
//!
//! # Quick Start
//!
//! Here's a basic example with [Axum](https://docs.rs/axum/latest/axum/) and the `MemoryStore`.
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use cache_session::{CacheSessionPersistence, PersistenceConfig, SessionHandle, SessionLayer};
//! use cache_session::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Create the cache store
//!     let store = Arc::new(MemoryStore::new());
//!
//!     // Configure the session cookie and cache headers
//!     let config = PersistenceConfig::build()
//!         .cookie_name("session")
//!         .cookie_http_only(true)
//!         .cookie_same_site(cookie::SameSite::Lax)
//!         .cookie_secure(true)
//!         .cache_expire(3600);
//!
//!     let persistence = CacheSessionPersistence::new(store, config).unwrap();
//!
//!     let app = Router::new()
//!         .route("/", get(handler))
//!         .layer(SessionLayer::new(Arc::new(persistence)));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//!
//! async fn handler(session: SessionHandle) -> String {
//!     let count = session.get::<u32>("count").unwrap().unwrap_or(0) + 1;
//!     session.insert("count", &count).unwrap();
//!     format!("You've visited this page {} times", count)
//! }
//! ```
//!
//! # Session Lifecycle
//!
//! ```rust
//! use cache_session::SessionHandle;
//!
//! # fn handler(session: SessionHandle) {
//! // Read and write values; anything serde can handle is accepted
//! let name: Option<String> = session.get("name").unwrap();
//! session.insert("name", "alice").unwrap();
//!
//! // Rotate the identifier when the response is persisted,
//! // e.g. after a change in privilege level
//! session.regenerate();
//!
//! // Keep the cookie for a week, regardless of the global `persistent` flag
//! session.persist_for(7 * 24 * 60 * 60);
//!
//! // Or turn it into a browser-session cookie
//! session.persist_for(0);
//!
//! // Make sure an id exists before the response is built
//! let id = session.initialize_id();
//! # }
//! ```
//!
//! A request that neither carries a session cookie nor stores anything in the
//! session produces no cache entry, no cookie and no cache-control headers.
//!
//! With `auto_regenerate` enabled (the default) every change to the session
//! data rotates the identifier, and the entry for the previous identifier is
//! removed from the cache.
//!
//! # Stores
//!
//! Any type implementing [`store::CacheStore`] can back the sessions.
//!
//! ## Memory
//! [`store::MemoryStore`] is meant for tests and local development.
//!
//! ## Redis
//! Requires the `redis-store` feature.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fred::clients::Client;
//! use cache_session::store::redis::RedisStore;
//!
//! let client = Client::default();
//! let store = RedisStore::new(Arc::new(client)).with_prefix("session:");
//! ```
//!
//! ## Serialization
//! Session values are encoded with one of two codecs:
//!
//! - [`bincode`](https://crates.io/crates/bincode) (default) - Fast, compact binary serialization.
//! - [`rmp-serde`](https://crates.io/crates/rmp-serde) (MessagePack) - Cross-language compatible serialization.
//!
//! ```toml
//! [dependencies]
//! cache-session = { version = "0.1", default-features = false, features = ["axum", "messagepack"] }
//! ```
//!
//! # Cache Headers
//!
//! Unless the application already set one of `Cache-Control`, `Expires`,
//! `Last-Modified` or `Pragma`, a persisted session adds the header set chosen
//! by [`CacheLimiter`]: `nocache` (default), `public`, `private` or
//! `private_no_expire`.

pub use cookie;

#[cfg(feature = "axum")]
mod extract;

#[cfg(feature = "redis-store")]
pub use fred;

mod error;
pub use error::{Error, Result};

pub mod persistence;
pub use persistence::{CacheLimiter, CacheSessionPersistence, PersistenceConfig, PersistenceOptions};

mod service;
pub use service::*;

mod session;
pub use session::*;

pub mod store;

pub use tower_cookies;
