use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub profile: &'static str,
    pub strictness: String,
    pub audio_tracks: usize,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let profile = &state.config.profile;
    Json(HealthResponse {
        status: "ok",
        service: "slowmo",
        profile: profile.name,
        strictness: profile.strictness.to_string(),
        audio_tracks: state.audio.len(),
    })
}
