use super::error::{AcquisitionError, TranscodeError};
use crate::common::upload::{stream_to_file, FileSink, SinkError};
use axum::extract::multipart::Field;
use axum::http::{header, HeaderValue};
use futures_util::StreamExt;
use reqwest::Client;
use std::path::Path;
use tracing::{debug, error, info};
use url::Url;

/// Brings the source image onto local disk, either from a URL or from an
/// uploaded multipart part.
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: Client,
    max_redirects: usize,
    max_bytes: u64,
}

impl Fetcher {
    pub fn new(client: Client, max_redirects: usize, max_bytes: u64) -> Self {
        Self {
            client,
            max_redirects,
            max_bytes,
        }
    }

    /// Downloads `raw_url` into `dest`, following at most `max_redirects`
    /// hops one after another. On failure nothing is left at `dest`.
    pub async fn acquire_by_reference(&self, raw_url: &str, dest: &Path) -> Result<u64, TranscodeError> {
        let mut url = parse_source_url(raw_url)?;
        let mut hops = 0;

        let response = loop {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| AcquisitionError::DownloadFailed(format!("request failed: {}", e.without_url())))?;

            let status = response.status();
            if status.is_redirection() {
                if let Some(location) = response.headers().get(header::LOCATION) {
                    hops += 1;
                    if hops > self.max_redirects {
                        return Err(AcquisitionError::TooManyRedirects {
                            limit: self.max_redirects,
                        }
                        .into());
                    }
                    let next = resolve_redirect(&url, location)?;
                    debug!("↪️ Redirect {} ({}): {} -> {}", hops, status, url, next);
                    url = next;
                    continue;
                }
            }

            if !status.is_success() {
                return Err(AcquisitionError::DownloadFailed(format!("HTTP {}", status)).into());
            }
            break response;
        };

        let mut sink = FileSink::create(dest, self.max_bytes).await?;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let written: Result<(), TranscodeError> = match chunk {
                Ok(chunk) => sink.write_chunk(chunk).await.map_err(|e| match e {
                    SinkError::TooLarge(limit) => {
                        AcquisitionError::DownloadFailed(format!("source exceeds {} bytes", limit)).into()
                    }
                    SinkError::Io(io) => TranscodeError::Io(io),
                    other => AcquisitionError::DownloadFailed(other.to_string()).into(),
                }),
                Err(e) => Err(AcquisitionError::DownloadFailed(format!(
                    "body interrupted: {}",
                    e.without_url()
                ))
                .into()),
            };

            if let Err(e) = written {
                error!("❌ Download of {} aborted: {}", url, e);
                sink.abort().await;
                return Err(e);
            }
        }

        let size = sink.finish().await?;
        info!("⬇️ Downloaded {} bytes from {} ({} redirects)", size, url, hops);
        Ok(size)
    }

    pub async fn acquire_by_upload(&self, field: Field<'_>, dest: &Path) -> Result<u64, TranscodeError> {
        stream_to_file(field, dest, self.max_bytes).await.map_err(upload_failure)
    }
}

fn upload_failure(err: SinkError) -> TranscodeError {
    match err {
        SinkError::Rejected(reason) => TranscodeError::Input(reason),
        SinkError::Io(io) => TranscodeError::Io(io),
        other => AcquisitionError::UploadFailed(other.to_string()).into(),
    }
}

fn is_web_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

pub fn parse_source_url(raw: &str) -> Result<Url, TranscodeError> {
    let url = Url::parse(raw.trim()).map_err(|_| TranscodeError::invalid_url())?;
    if !is_web_scheme(&url) {
        return Err(TranscodeError::invalid_url());
    }
    Ok(url)
}

/// `Location` may be relative to the URL that answered with the redirect.
fn resolve_redirect(current: &Url, location: &HeaderValue) -> Result<Url, AcquisitionError> {
    let raw = location
        .to_str()
        .map_err(|_| AcquisitionError::InvalidRedirect("<non-ascii>".to_string()))?;
    let next = current
        .join(raw)
        .map_err(|_| AcquisitionError::InvalidRedirect(raw.to_string()))?;
    if !is_web_scheme(&next) {
        return Err(AcquisitionError::InvalidRedirect(raw.to_string()));
    }
    Ok(next)
}
