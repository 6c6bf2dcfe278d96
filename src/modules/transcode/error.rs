use crate::common::response::ApiError;
use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

pub const NO_SOURCE_MESSAGE: &str = "No image provided (use JSON { url } or form-data 'video')";

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("too many redirects (limit {limit})")]
    TooManyRedirects { limit: usize },
    #[error("invalid redirect target '{0}'")]
    InvalidRedirect(String),
    #[error("{0}")]
    DownloadFailed(String),
    #[error("{0}")]
    UploadFailed(String),
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("{0}")]
    Input(String),
    #[error("{}", acquisition_message(.0))]
    Acquisition(#[from] AcquisitionError),
    #[error("FFmpeg spawn error: {0}")]
    Spawn(String),
    #[error("FFmpeg failed ({reason}). {diagnostics}")]
    Engine { reason: String, diagnostics: String },
    #[error("FFmpeg timed out after {}s. {diagnostics}", .limit.as_secs())]
    Timeout { limit: Duration, diagnostics: String },
    #[error("Processing error: {0}")]
    Io(#[from] std::io::Error),
}

fn acquisition_message(err: &AcquisitionError) -> String {
    match err {
        AcquisitionError::UploadFailed(msg) => format!("Upload failed: {}", msg),
        other => format!("Download failed: {}", other),
    }
}

impl TranscodeError {
    pub fn invalid_url() -> Self {
        TranscodeError::Input("Invalid URL".to_string())
    }

    pub fn no_source() -> Self {
        TranscodeError::Input(NO_SOURCE_MESSAGE.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            TranscodeError::Input(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TranscodeError> for ApiError {
    fn from(err: TranscodeError) -> Self {
        let status = err.status();
        ApiError(err.to_string().trim_end().to_string(), status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_client_side() {
        assert_eq!(TranscodeError::invalid_url().status(), StatusCode::BAD_REQUEST);
        assert_eq!(TranscodeError::no_source().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            TranscodeError::Spawn("not found".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn acquisition_messages_name_the_direction() {
        let redirect: TranscodeError = AcquisitionError::TooManyRedirects { limit: 5 }.into();
        assert_eq!(redirect.to_string(), "Download failed: too many redirects (limit 5)");

        let upload: TranscodeError = AcquisitionError::UploadFailed("stream interrupted".into()).into();
        assert_eq!(upload.to_string(), "Upload failed: stream interrupted");
    }

    #[test]
    fn timeout_message_reports_the_budget() {
        let err = TranscodeError::Timeout {
            limit: Duration::from_secs(60),
            diagnostics: String::new(),
        };
        let api: ApiError = err.into();
        assert_eq!(api.0, "FFmpeg timed out after 60s.");
        assert_eq!(api.1, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
