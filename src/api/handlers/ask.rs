use crate::{
    types::{AskRequest, AskResponse, Result},
    AppState,
};
use axum::{extract::State, Json};

/// Answer a question from the indexed documents.
///
/// A backend failure still returns 200 with `failed: true`; only missing
/// artifacts (503) and an empty query (400) are HTTP errors.
pub async fn ask(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let answer = state.pipeline.answer(&payload.query).await?;
    Ok(Json(answer.into()))
}
