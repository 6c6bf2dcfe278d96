use super::dto::{PublishedClipResponse, SlowmoRequest};
use super::error::{AcquisitionError, TranscodeError};
use super::params::RawParams;
use super::publisher::public_url;
use super::service::{Delivery, SlowmoInput, SourceInput, TranscodeService};
use crate::common::response::{ApiError, ApiResponse};
use crate::state::AppState;
use crate::workers::cleanup::TempAsset;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use tracing::{debug, error, info};

/// Turn a still image into a short vertical MP4
///
/// Accepts either a JSON body with a source `url`, or `multipart/form-data`
/// with the image in a `video` (or `image`) file field. The clip is streamed
/// back unless `returnUrl` is set, in which case it is published for a short
/// window and its URL returned.
#[utoipa::path(
    post,
    path = "/slowmo",
    request_body(content = SlowmoRequest, description = "JSON body, or multipart form with a `video` file field"),
    responses(
        (status = 200, description = "`video/mp4` stream, or this descriptor when `returnUrl` is set", body = PublishedClipResponse),
        (status = 400, description = "No image, or invalid URL", body = ApiResponse<String>),
        (status = 500, description = "Download, engine or timeout failure", body = ApiResponse<String>)
    ),
    tag = "Transcode"
)]
pub async fn create_clip(State(state): State<AppState>, headers: HeaderMap, request: Request) -> impl IntoResponse {
    let input = match read_input(&state, request).await {
        Ok(input) => input,
        Err(e) => {
            info!("Rejected slowmo request: {}", e);
            return ApiError::from(e).into_response();
        }
    };

    match TranscodeService::run(&state, input).await {
        Ok(Delivery::Stream(clip)) => {
            info!("📤 Streaming clip ({} bytes)", clip.size());
            clip.into_response()
        }
        Ok(Delivery::Published(clip)) => {
            let url = public_url(
                state.config.public_base_url.as_deref(),
                &headers,
                &state.config.public_path_prefix,
                &clip.file_name,
            );
            (
                StatusCode::OK,
                Json(PublishedClipResponse {
                    success: true,
                    url,
                    size: clip.size,
                    duration: clip.duration,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("❌ Slowmo request failed: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

async fn read_input(state: &AppState, request: Request) -> Result<SlowmoInput, TranscodeError> {
    if is_multipart(&request) {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| TranscodeError::Input(format!("Invalid multipart body: {}", e.body_text())))?;
        return read_multipart(state, multipart).await;
    }

    // Bodies without a JSON content type are still read as JSON; an empty
    // body is a request without a source.
    let body = Bytes::from_request(request, state)
        .await
        .map_err(|e| TranscodeError::Input(format!("Invalid body: {}", e.body_text())))?;
    let payload: SlowmoRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SlowmoRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| TranscodeError::Input(format!("Invalid JSON body: {}", e)))?
    };

    let source = match payload.url {
        Some(url) if !url.trim().is_empty() => SourceInput::Url(url),
        _ => SourceInput::Missing,
    };

    Ok(SlowmoInput {
        params: RawParams {
            duration: payload.duration,
            fps: payload.fps,
            return_url: payload.return_url,
            audio: payload.audio,
        },
        source,
    })
}

async fn read_multipart(state: &AppState, mut multipart: Multipart) -> Result<SlowmoInput, TranscodeError> {
    let mut params = RawParams::default();
    let mut url: Option<String> = None;
    let mut upload: Option<TempAsset> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AcquisitionError::UploadFailed(e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();

        if matches!(name.as_str(), "video" | "image") && upload.is_none() {
            let path = state.workspace.temp_path("upload", "jpg");
            let asset = state.cleanup.track(path.clone(), "source");
            state.fetcher.acquire_by_upload(field, &path).await?;
            upload = Some(asset);
            continue;
        }

        let slot = match name.as_str() {
            "url" => None,
            "duration" => Some(&mut params.duration),
            "fps" => Some(&mut params.fps),
            "returnUrl" | "return_url" => Some(&mut params.return_url),
            "audio" => Some(&mut params.audio),
            _ => {
                debug!("Ignoring multipart field '{}'", name);
                continue;
            }
        };

        let text = field
            .text()
            .await
            .map_err(|e| AcquisitionError::UploadFailed(e.body_text()))?;
        match slot {
            Some(slot) => *slot = Some(Value::String(text)),
            None => url = Some(text),
        }
    }

    // A URL wins over an uploaded file; the upload guard is dropped here.
    let source = match (url, upload) {
        (Some(url), _) if !url.trim().is_empty() => SourceInput::Url(url),
        (_, Some(asset)) => SourceInput::Uploaded(asset),
        _ => SourceInput::Missing,
    };

    Ok(SlowmoInput { params, source })
}
