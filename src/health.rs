use axum::{routing::get, Router};
use std::net::SocketAddr;
use tracing::info;

/// Liveness probe for the hosting platform.
pub fn router() -> Router {
    Router::new().route("/", get(|| async { "OK" }))
}

pub async fn serve(port: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("health endpoint listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router()).await?;
    Ok(())
}
