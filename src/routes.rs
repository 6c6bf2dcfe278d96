use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use crate::docs::ApiDoc;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use crate::state::AppState;

use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

// Room for multipart framing and text fields around the image itself.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

pub fn configure_routes(state: &AppState) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = usize::try_from(state.config.max_source_bytes + MULTIPART_OVERHEAD).unwrap_or(usize::MAX);

    let transcode_routes = crate::modules::transcode::router()
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(crate::modules::health::router())
        .merge(transcode_routes)
        .nest_service(
            &state.config.public_path_prefix,
            ServeDir::new(state.workspace.public_dir()),
        )
        .layer(cors)
}
