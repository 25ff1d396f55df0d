use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::ws;
use crate::state::AppState;

/// Create the WebSocket router.
///
/// The `/ws` endpoint is the session's only surface; one upgrade creates
/// one conversation session that lives until disconnect.
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(ws::ws_chat_handler))
        .layer(TraceLayer::new_for_http())
}
