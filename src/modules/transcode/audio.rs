use rand::seq::IndexedRandom;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "m4a", "aac", "wav", "ogg"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioTrack {
    pub name: String,
    pub path: PathBuf,
}

/// Background tracks loaded once at startup and shared read-only.
#[derive(Clone, Debug, Default)]
pub struct AudioCatalog {
    tracks: Arc<Vec<AudioTrack>>,
}

impl AudioCatalog {
    pub fn new(tracks: Vec<AudioTrack>) -> Self {
        Self {
            tracks: Arc::new(tracks),
        }
    }

    /// Lists the audio files directly inside `dir`, sorted by name. A missing
    /// directory yields an empty catalog.
    pub fn load(dir: &Path) -> io::Result<Self> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Audio directory {} not found, audio disabled", dir.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e),
        };

        let mut tracks = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let supported = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if !supported || !path.is_file() {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracks.push(AudioTrack { name, path });
        }
        tracks.sort_by(|a, b| a.name.cmp(&b.name));

        info!("🎵 Loaded {} audio tracks from {}", tracks.len(), dir.display());
        Ok(Self::new(tracks))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Uniform pick; `None` when the catalog is empty.
    pub fn pick(&self) -> Option<&AudioTrack> {
        self.tracks.choose(&mut rand::rng())
    }
}
