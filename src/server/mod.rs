pub mod handlers;
pub mod state;
pub mod url_validation;

use crate::config::Config;
use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use state::AppState;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// How often idle sessions are swept.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Build the router for the given configuration. Loads the catalog and
/// starts the background cleanup task, so it must run inside a runtime.
pub async fn build_router(config: Config) -> crate::error::Result<Router> {
    let state = AppState::new(config).await?;
    spawn_cleanup(state.clone());
    Ok(router(state))
}

/// Routes over an already built state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::serve_metrics))
        .route("/videos", get(handlers::catalog::list_videos))
        .route("/videos/{id}", get(handlers::catalog::get_video))
        .route(
            "/videos/{id}/schedule",
            get(handlers::schedule::serve_schedule),
        )
        .route("/campaigns", get(handlers::catalog::list_campaigns))
        .route(
            "/settings/ads",
            get(handlers::catalog::get_ad_settings).put(handlers::catalog::put_ad_settings),
        )
        .route(
            "/settings/player",
            get(handlers::catalog::get_player_settings)
                .put(handlers::catalog::put_player_settings),
        )
        .route("/embed", get(handlers::embed::serve_embed))
        .route("/sessions", post(handlers::sessions::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::sessions::poll_session).delete(handlers::sessions::delete_session),
        )
        .route(
            "/sessions/{id}/events",
            post(handlers::sessions::post_event),
        )
        .layer(middleware::from_fn(version_header))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Stamp every response with the crate version
async fn version_header(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    resp.headers_mut().insert(
        "x-streamflow-version",
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    resp
}

fn spawn_cleanup(state: AppState) {
    let sessions = state.sessions;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            sessions.cleanup_expired();
        }
    });
}

/// Start the Axum HTTP server
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);

    let state = AppState::new(config).await?;
    spawn_cleanup(state.clone());
    let sessions = state.sessions.clone();
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("🚀 Server listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    sessions.shutdown_all();

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
