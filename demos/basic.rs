use axum::Router;
use axum::routing::get;
use cache_session::store::MemoryStore;
use cache_session::{CacheLimiter, CacheSessionPersistence, PersistenceConfig, SessionHandle, SessionLayer};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct User {
    id: i64,
    name: String,
}

fn routes() -> Router {
    Router::new()
        .route(
            "/",
            get(|session: SessionHandle| async move {
                let visits = session.get::<u32>("visits").unwrap_or_default().unwrap_or(0) + 1;
                if let Err(err) = session.insert("visits", &visits) {
                    return err.to_string();
                }
                format!("visit #{visits}")
            }),
        )
        .route(
            "/login",
            get(|session: SessionHandle| async move {
                let user = User {
                    id: 34895634,
                    name: String::from("John Doe"),
                };
                if let Err(err) = session.insert("user", &user) {
                    return err.to_string();
                }
                // Privilege change: issue a fresh id.
                session.regenerate();
                session.persist_for(14 * 24 * 60 * 60);
                format!("logged in as {}", user.name)
            }),
        )
        .route(
            "/whoami",
            get(|session: SessionHandle| async move {
                match session.get::<User>("user") {
                    Ok(Some(user)) => user.name,
                    Ok(None) => String::from("anonymous"),
                    Err(err) => err.to_string(),
                }
            }),
        )
        .route(
            "/logout",
            get(|session: SessionHandle| async move {
                session.clear();
                session.persist_for(0);
                "logged out"
            }),
        )
}

#[tokio::main]
async fn main() {
    let store = Arc::new(MemoryStore::new());

    let config = PersistenceConfig::build()
        .cookie_name("demo_sess")
        .cookie_http_only(true)
        .cookie_same_site(cookie::SameSite::Lax)
        .cache_limiter(CacheLimiter::Private)
        .cache_expire(1800)
        .auto_regenerate(false);

    let persistence = CacheSessionPersistence::new(store, config).unwrap();

    let app = routes().layer(SessionLayer::new(Arc::new(persistence)));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    println!("listening on http://{addr}");
    axum::serve(listener, app).await.unwrap();
}
