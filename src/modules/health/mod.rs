use axum::routing::get;
use axum::Router;
use crate::state::AppState;

pub mod handler;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(handler::health))
}
