//! Salesdesk HTTP server.
//!
//! Opens the SQLite store, then serves the REST surface. Identity arrives
//! per request in the `X-User-Id` header; see `http.rs` for the route
//! table. `SALESDESK_BIND` overrides the configured bind address.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use salesdesk_lib::db::CrmDb;
use salesdesk_lib::http;
use salesdesk_lib::state::{load_config, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;

    let bind = std::env::var("SALESDESK_BIND")
        .ok()
        .or_else(|| config.bind.clone())
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;

    let db = match &config.database_path {
        Some(path) => CrmDb::open_at(PathBuf::from(path))?,
        None => CrmDb::open()?,
    };

    let state = Arc::new(AppState::new(db));
    let app = http::router(state);

    tracing::info!("salesdesk listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
