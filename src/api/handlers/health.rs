use crate::{types::HealthResponse, AppState};
use axum::{extract::State, Json};

/// Report whether the index artifacts are present and which backend is selected.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend = state
        .pipeline
        .dispatcher()
        .selected_kind()
        .map(|kind| kind.name().to_string())
        .unwrap_or_else(|| "none".to_string());

    Json(HealthResponse {
        status: "ok".to_string(),
        index_ready: state.pipeline.retriever().paths().exists(),
        backend,
    })
}
