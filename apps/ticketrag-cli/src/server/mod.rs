//! JSON API over the retrieval service.

pub mod handlers;
pub mod routing;
pub mod types;

use anyhow::Result;
use axum::serve;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::runtime::AppState;

pub use routing::create_router;

/// Serve the API on `addr` until the process stops.
pub async fn start_server(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    info!(%addr, "Starting ticket search server");
    let app = create_router(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");
    println!("🌐 Open http://{addr}/api/health to check the service");

    serve(listener, app).await.map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
