use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::health::handler::health,
        crate::modules::transcode::handler::create_clip,
    ),
    components(
        schemas(
            crate::modules::health::handler::HealthResponse,
            crate::modules::transcode::dto::SlowmoRequest,
            crate::modules::transcode::dto::PublishedClipResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service status"),
        (name = "Transcode", description = "Still image to vertical clip")
    )
)]
pub struct ApiDoc;
