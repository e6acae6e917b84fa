//! puddle-vis - droplet board server with the embedded visualizer.

use axum::{
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use rust_embed::RustEmbed;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Embedded static assets from client/web
#[derive(RustEmbed)]
#[folder = "../client/web"]
struct Assets;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,server=debug")),
        )
        .init();

    // Load server configuration
    let config = server::Config::load()?;
    info!("{} v{}", config.server.name, env!("CARGO_PKG_VERSION"));
    info!("  Port: {}", config.server.port);
    info!("  Board: {}x{}", config.board.width, config.board.height);
    info!("  Split error stdev: {}", config.error.split_error_stdev);

    if Assets::get("pkg/client.js").is_none() {
        warn!("WASM client is not embedded; only {} will work", protocol::STATE_PATH);
    }

    let session = Arc::new(Mutex::new(server::Session::from_config(&config)?));

    let app = Router::new()
        .merge(server::router(session))
        .fallback(static_handler)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
        );

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Board state endpoint: http://{}{}", addr, protocol::STATE_PATH);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handle static file requests
async fn static_handler(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    // Handle empty path or root
    if path.is_empty() {
        return serve_static_file("index.html");
    }

    serve_static_file(path)
}

/// Serve a static file from embedded assets
fn serve_static_file(path: &str) -> Response {
    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => {
            warn!("Static file not found: {}", path);
            (StatusCode::NOT_FOUND, "404 Not Found").into_response()
        }
    }
}
