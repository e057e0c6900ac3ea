// Route modules for the HTTP API
pub mod cluster;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        Method,
    },
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{application::handlers::cluster::health_check, AppState};

pub use cluster::{ha_router, status_router, stream_router};

/// Build the complete application router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([ACCEPT, CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", status_router())
        .nest("/api/ha", ha_router())
        .nest("/api/stream", stream_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
