use crate::api::handlers::{agent, health, index};
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn create_router() -> Router<AppState> {
    let agent_routes = Router::new()
        .route("/agent/invoke", post(agent::invoke))
        .route("/agent/batch", post(agent::batch))
        .route("/agent/stream", post(agent::stream));

    let index_routes = Router::new()
        .route("/index/reload", post(index::reload))
        .route("/index/ingest", post(index::ingest));

    Router::new()
        .route("/", get(health::api_info))
        .route("/health", get(health::health))
        .merge(agent_routes)
        .merge(index_routes)
}

/// The full application with middleware, ready to serve
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
