use crate::workers::cleanup::remove_quietly;
use axum::extract::multipart::Field;
use bytes::Bytes;
use futures_util::StreamExt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("payload exceeds {0} bytes")]
    TooLarge(u64),
    /// The part itself is unacceptable (wrong type, empty).
    #[error("{0}")]
    Rejected(String),
    #[error("stream interrupted")]
    Interrupted,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Size-capped writer for one temp file. Anything but `finish` leaves no
/// bytes behind: `abort` deletes what was written so far.
pub struct FileSink {
    file: File,
    path: PathBuf,
    written: u64,
    limit: u64,
}

impl FileSink {
    pub async fn create(path: &Path, limit: u64) -> io::Result<Self> {
        let file = File::create(path).await?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            written: 0,
            limit,
        })
    }

    pub async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), SinkError> {
        let next = self.written + chunk.len() as u64;
        if next > self.limit {
            return Err(SinkError::TooLarge(self.limit));
        }
        self.file.write_all(&chunk).await?;
        self.written = next;
        Ok(())
    }

    pub async fn finish(mut self) -> io::Result<u64> {
        if let Err(e) = self.file.flush().await {
            self.abort().await;
            return Err(e);
        }
        Ok(self.written)
    }

    pub async fn abort(self) {
        let FileSink { file, path, .. } = self;
        drop(file);
        remove_quietly(&path, "partial");
    }
}

/// Accepts `image/*`, generic binary, or a part without a declared type.
fn accepted_content_type(content_type: Option<&str>) -> bool {
    let Some(raw) = content_type else {
        return true;
    };
    match raw.parse::<mime::Mime>() {
        Ok(m) => m.type_() == mime::IMAGE || m.essence_str() == mime::APPLICATION_OCTET_STREAM.essence_str(),
        Err(_) => false,
    }
}

/// Streams an uploaded multipart part into `dest`.
pub async fn stream_to_file(mut field: Field<'_>, dest: &Path, limit: u64) -> Result<u64, SinkError> {
    if !accepted_content_type(field.content_type()) {
        return Err(SinkError::Rejected(
            "Invalid content type: only image/* allowed".to_string(),
        ));
    }

    let file_name = field.file_name().unwrap_or("upload").to_string();
    let mut sink = FileSink::create(dest, limit).await?;

    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!("Upload stream error: {}", e);
                sink.abort().await;
                return Err(SinkError::Interrupted);
            }
        };

        if let Err(e) = sink.write_chunk(chunk).await {
            error!("Upload write error: {}", e);
            sink.abort().await;
            return Err(e);
        }
    }

    let size = sink.finish().await?;
    if size == 0 {
        remove_quietly(dest, "partial");
        return Err(SinkError::Rejected("Uploaded image is empty".to_string()));
    }

    info!("⬆️ Received upload {} ({} bytes)", file_name, size);
    Ok(size)
}
