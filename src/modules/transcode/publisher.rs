use crate::workers::cleanup::{CleanupScheduler, TempAsset};
use axum::{
    body::Body,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

pub const DOWNLOAD_FILE_NAME: &str = "image-video.mp4";

/// A validated clip ready to be sent as the response body. The output asset
/// rides along with the body stream and is removed when the stream ends,
/// fails, or is dropped by a disconnecting client.
#[derive(Debug)]
pub struct StreamedClip {
    file: File,
    size: u64,
    content_type: String,
    output: TempAsset,
}

impl StreamedClip {
    pub async fn open(output: TempAsset, size: u64) -> std::io::Result<Self> {
        let path = output
            .path()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "output already released"))?;
        let content_type = content_type_for(path);
        let file = File::open(path).await?;

        Ok(Self {
            file,
            size,
            content_type,
            output,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl IntoResponse for StreamedClip {
    fn into_response(self) -> Response {
        let StreamedClip {
            file,
            size,
            content_type,
            output,
        } = self;

        let stream = GuardedStream {
            inner: ReaderStream::new(file),
            _output: output,
        }
        .inspect_err(|e| error!("📤 Delivery error while streaming clip: {}", e));

        let builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, size)
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
            );

        builder
            .body(Body::from_stream(stream))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

/// File body that owns the output asset: the file goes away with the stream,
/// whether it was read to the end or dropped early.
struct GuardedStream {
    inner: ReaderStream<File>,
    _output: TempAsset,
}

impl Stream for GuardedStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// A clip left in the public directory for a limited time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedClip {
    pub file_name: String,
    pub size: u64,
    pub duration: u32,
}

/// Leaves the output where the static route serves it and schedules its
/// removal after `retention`. A client that fetches after the window gets a
/// 404: this is short-lived sharing, not storage.
pub fn publish(
    scheduler: &CleanupScheduler,
    output: TempAsset,
    size: u64,
    duration: u32,
    retention: Duration,
) -> Option<PublishedClip> {
    let file_name = output
        .path()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())?;

    info!("🔗 Published {} ({} bytes)", file_name, size);
    scheduler.retain_then_remove(output, retention);

    Some(PublishedClip {
        file_name,
        size,
        duration,
    })
}

/// Absolute URL of a published file. A configured base URL wins; otherwise
/// the request's `Host` (and `X-Forwarded-Proto` behind a proxy) is used.
pub fn public_url(base: Option<&str>, headers: &HeaderMap, prefix: &str, file_name: &str) -> String {
    let origin = match base {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .unwrap_or("localhost");
            let scheme = headers
                .get("x-forwarded-proto")
                .and_then(|h| h.to_str().ok())
                .and_then(|p| p.split(',').next())
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or("http");
            format!("{}://{}", scheme, host)
        }
    };
    format!("{}{}/{}", origin, prefix, file_name)
}

fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn url_prefers_configured_base() {
        let headers = HeaderMap::new();
        assert_eq!(
            public_url(Some("https://cdn.example.com/"), &headers, "/videos", "clip.mp4"),
            "https://cdn.example.com/videos/clip.mp4"
        );
    }

    #[test]
    fn url_falls_back_to_request_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.example.com:8080"));
        assert_eq!(
            public_url(None, &headers, "/videos", "clip.mp4"),
            "http://api.example.com:8080/videos/clip.mp4"
        );

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        assert_eq!(
            public_url(None, &headers, "/videos", "clip.mp4"),
            "https://api.example.com:8080/videos/clip.mp4"
        );
    }

    #[test]
    fn mp4_outputs_are_served_as_video() {
        assert_eq!(content_type_for(Path::new("/tmp/slowmo-output-1-2.mp4")), "video/mp4");
    }

    #[tokio::test]
    async fn streaming_releases_the_output_when_the_body_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slowmo-output-1-ff.mp4");
        std::fs::write(&path, vec![1u8; 2048]).unwrap();

        let asset = CleanupScheduler::new().track(path.clone(), "output");
        let clip = StreamedClip::open(asset, 2048).await.unwrap();
        let response = clip.into_response();

        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "2048");
        assert!(path.exists());

        // A client hanging up mid-transfer drops the body without reading it.
        drop(response);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn streaming_releases_the_output_after_full_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slowmo-output-2-ff.mp4");
        std::fs::write(&path, vec![2u8; 4096]).unwrap();

        let asset = CleanupScheduler::new().track(path.clone(), "output");
        let response = StreamedClip::open(asset, 4096).await.unwrap().into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        assert_eq!(body.len(), 4096);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn guarded_stream_holds_the_file_until_dropped() {
        use futures_util::StreamExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slowmo-output-4-ff.mp4");
        std::fs::write(&path, vec![4u8; 1024]).unwrap();

        let output = CleanupScheduler::new().track(path.clone(), "output");
        let file = File::open(&path).await.unwrap();
        let mut stream = GuardedStream {
            inner: ReaderStream::new(file),
            _output: output,
        };

        let mut read = 0;
        while let Some(chunk) = stream.next().await {
            read += chunk.unwrap().len();
        }
        assert_eq!(read, 1024);
        assert!(path.exists());

        drop(stream);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn publish_keeps_the_file_for_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slowmo-output-3-ff.mp4");
        std::fs::write(&path, vec![3u8; 2048]).unwrap();

        let scheduler = CleanupScheduler::new();
        let asset = scheduler.track(path.clone(), "output");
        let clip = publish(&scheduler, asset, 2048, 5, Duration::from_millis(100)).unwrap();

        assert_eq!(clip.file_name, "slowmo-output-3-ff.mp4");
        assert!(path.exists());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!path.exists());
    }
}
