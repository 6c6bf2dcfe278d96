use axum::routing::post;
use axum::Router;
use crate::state::AppState;

pub mod audio;
pub mod dto;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod handler;
pub mod params;
pub mod publisher;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new().route("/slowmo", post(handler::create_clip))
}
