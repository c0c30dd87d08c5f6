use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Routes mounted under `/api`.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/ask", post(crate::api::handlers::ask::ask))
}

/// The full application: `/health`, `/api/*`, tracing and CORS.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(crate::api::handlers::health::health))
        .nest("/api", create_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
