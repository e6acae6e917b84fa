//! HTTP surface: the client polls `GET /state` for the next board state.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use protocol::STATE_PATH;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::session::Session;

pub type SharedSession = Arc<Mutex<Session>>;

pub fn router(session: SharedSession) -> Router {
    Router::new()
        .route(STATE_PATH, get(get_state))
        .route("/health", get(health))
        .with_state(session)
}

/// Advance the session one tick. 410 Gone tells the client the run is over.
async fn get_state(State(session): State<SharedSession>) -> Response {
    let mut session = session.lock().await;
    match session.advance() {
        Ok(Some(snapshot)) => {
            debug!(tick = session.ticks(), droplets = snapshot.len(), "state served");
            Json(snapshot).into_response()
        }
        Ok(None) => {
            info!(ticks = session.ticks(), "session finished");
            StatusCode::GONE.into_response()
        }
        Err(e) => {
            error!("Board error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health() -> &'static str {
    "ok"
}
