use super::engine::{build_args, scrub_diagnostics, validate_output, EngineJob, EngineStatus};
use super::error::TranscodeError;
use super::params::{resolve, DeliveryMode, RawParams};
use super::publisher::{publish, PublishedClip, StreamedClip};
use crate::state::AppState;
use crate::workers::cleanup::TempAsset;
use std::path::Path;
use tracing::{error, info, warn};

/// Where the source image comes from.
#[derive(Debug)]
pub enum SourceInput {
    Url(String),
    /// Already written to disk while the multipart body was read.
    Uploaded(TempAsset),
    Missing,
}

#[derive(Debug)]
pub struct SlowmoInput {
    pub params: RawParams,
    pub source: SourceInput,
}

#[derive(Debug)]
pub enum Delivery {
    Stream(StreamedClip),
    Published(PublishedClip),
}

pub struct TranscodeService;

impl TranscodeService {
    /// Runs one request end to end. Every temp file is held by a guard, so
    /// returning early through `?` removes whatever exists at that point.
    pub async fn run(state: &AppState, input: SlowmoInput) -> Result<Delivery, TranscodeError> {
        let profile = &state.config.profile;
        let params = resolve(&input.params, profile);

        let source = match input.source {
            SourceInput::Url(url) => {
                let path = state.workspace.temp_path("input", "jpg");
                let asset = state.cleanup.track(path.clone(), "source");
                state.fetcher.acquire_by_reference(&url, &path).await?;
                asset
            }
            SourceInput::Uploaded(asset) => asset,
            SourceInput::Missing => return Err(TranscodeError::no_source()),
        };
        let source_path = source
            .path()
            .map(Path::to_path_buf)
            .ok_or_else(TranscodeError::no_source)?;

        let track = if params.audio && state.audio.is_empty() {
            warn!("Audio requested but the catalog is empty, encoding without audio");
            None
        } else if params.audio {
            state.audio.pick()
        } else {
            None
        };

        let output_path = match params.delivery {
            DeliveryMode::Stream => state.workspace.temp_path("output", "mp4"),
            DeliveryMode::PublicUrl => state.workspace.public_path("output", "mp4"),
        };
        let output = state.cleanup.track(output_path.clone(), "output");

        info!(
            "🎬 Encoding {}s @ {}fps (profile {}, audio: {}, delivery: {:?})",
            params.duration,
            params.fps,
            profile.name,
            track.map(|t| t.name.as_str()).unwrap_or("none"),
            params.delivery
        );

        let job = EngineJob {
            source: &source_path,
            audio: track.map(|t| t.path.as_path()),
            output: &output_path,
            params: &params,
        };
        let run = state.engine.run(&build_args(profile, &job)).await?;

        let mut private: Vec<(&Path, &str)> = vec![(source_path.as_path(), "<input>"), (output_path.as_path(), "<output>")];
        if let Some(track) = track {
            private.push((track.path.as_path(), "<audio>"));
        }
        let diagnostics = scrub_diagnostics(&run.diagnostics, &private);

        let size = match validate_output(&run, &output_path, profile, state.engine.timeout(), diagnostics).await {
            Ok(size) => size,
            Err(e) => {
                if matches!(run.status, EngineStatus::TimedOut) {
                    error!("❌ Engine timed out after {:?}", run.elapsed);
                } else {
                    error!("❌ Engine output rejected: {}", e);
                }
                return Err(e);
            }
        };

        // The encode is done with the source image.
        source.release();

        match params.delivery {
            DeliveryMode::Stream => {
                let clip = StreamedClip::open(output, size).await?;
                Ok(Delivery::Stream(clip))
            }
            DeliveryMode::PublicUrl => publish(
                &state.cleanup,
                output,
                size,
                params.duration,
                state.config.public_retention,
            )
            .map(Delivery::Published)
            .ok_or_else(|| {
                TranscodeError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "published output has no file name",
                ))
            }),
        }
    }
}
