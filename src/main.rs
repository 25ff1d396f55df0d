use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tracing::info;

use polyvox::{AppState, ServerConfig, handlers, routes};

// All pipeline state transitions happen on one scheduler thread; tasks
// interleave only at await points. Blocking collaborators get their own
// threads from their provider implementations, never from this runtime.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = ServerConfig::from_env()?;
    let address = config.address();

    // Create application state with the in-tree stub collaborators;
    // deployments wire real LLM/TTS/STT providers through AppState::new.
    let app_state = AppState::with_stubs(config);

    // Public health check plus the WebSocket session endpoint
    let app = Router::new()
        .route("/", get(handlers::api::health_check))
        .merge(routes::ws::create_ws_router())
        .with_state(app_state);

    let listener = TcpListener::bind(&address).await?;
    info!("server listening on {address}");

    axum::serve(listener, app).await?;

    Ok(())
}
