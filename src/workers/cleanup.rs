use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Hands out [`TempAsset`] guards and runs delayed removals.
///
/// Each guard owns exactly one path. The file is removed when the guard is
/// released or dropped, and the path is taken out of the guard at that point,
/// so removal fires once per asset whichever exit path the request takes.
#[derive(Clone, Debug, Default)]
pub struct CleanupScheduler;

impl CleanupScheduler {
    pub fn new() -> Self {
        Self
    }

    pub fn track(&self, path: PathBuf, kind: &'static str) -> TempAsset {
        TempAsset {
            path: Some(path),
            kind,
        }
    }

    /// Keeps the asset on disk for `window`, then removes it.
    ///
    /// Used for published outputs: the URL only works while the window is
    /// open, and a client fetching later gets a 404. There is no durability
    /// guarantee here.
    pub fn retain_then_remove(&self, asset: TempAsset, window: Duration) -> JoinHandle<()> {
        if let Some(path) = asset.path() {
            info!(
                "⏳ Keeping {} for {}s before removal",
                file_label(path),
                window.as_secs()
            );
        }
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            asset.release();
        })
    }
}

#[derive(Debug)]
pub struct TempAsset {
    path: Option<PathBuf>,
    kind: &'static str,
}

impl TempAsset {
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Removes the file now. Returns whether a file was actually deleted.
    pub fn release(mut self) -> bool {
        self.remove()
    }

    fn remove(&mut self) -> bool {
        match self.path.take() {
            Some(path) => remove_quietly(&path, self.kind),
            None => false,
        }
    }
}

impl Drop for TempAsset {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Deletes `path`, treating an already-missing file as done.
///
/// Called from `Drop`, which cannot await, so this is a plain blocking
/// unlink. The file is gone by the time the guard's owner moves on.
pub fn remove_quietly(path: &Path, kind: &str) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("🗑️ Removed {} asset {}", kind, file_label(path));
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to remove {} asset {}: {}", kind, file_label(path), e);
            false
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        let asset = CleanupScheduler::new().track(path.clone(), "source");
        drop(asset);

        assert!(!path.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn drop_inside_a_task_removes_before_returning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.jpg");
        tokio::fs::write(&path, b"jpeg").await.unwrap();

        let scheduler = CleanupScheduler::new();
        let tracked = path.clone();
        tokio::spawn(async move {
            let asset = scheduler.track(tracked, "source");
            drop(asset);
        })
        .await
        .unwrap();

        assert!(!tokio::fs::try_exists(&path).await.unwrap());
    }

    #[test]
    fn release_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let asset = CleanupScheduler::new().track(dir.path().join("never-written.mp4"), "output");
        assert!(!asset.release());
    }

    #[test]
    fn release_fires_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        std::fs::write(&path, b"mp4").unwrap();

        let asset = CleanupScheduler::new().track(path.clone(), "output");
        assert!(asset.release());

        // A file recreated at the same path afterwards belongs to nobody else's
        // guard and must survive.
        std::fs::write(&path, b"new").unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn retained_asset_survives_the_window_then_goes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("published.mp4");
        std::fs::write(&path, b"mp4").unwrap();

        let scheduler = CleanupScheduler::new();
        let asset = scheduler.track(path.clone(), "output");
        let handle = scheduler.retain_then_remove(asset, Duration::from_millis(150));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(path.exists());

        handle.await.unwrap();
        assert!(!path.exists());
    }
}
