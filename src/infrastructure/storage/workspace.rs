use rand::Rng;
use std::io;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;
use tracing::{info, warn};

const ASSET_PREFIX: &str = "slowmo-";

/// Where per-request files live: a private scratch directory and the
/// directory exposed under the public static prefix.
#[derive(Clone, Debug)]
pub struct AssetWorkspace {
    temp_dir: PathBuf,
    public_dir: PathBuf,
}

impl AssetWorkspace {
    pub async fn prepare(temp_dir: &Path, public_dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(temp_dir).await?;
        fs::create_dir_all(public_dir).await?;

        info!(
            "✅ Asset workspace ready (temp: {}, public: {})",
            temp_dir.display(),
            public_dir.display()
        );

        Ok(Self {
            temp_dir: temp_dir.to_path_buf(),
            public_dir: public_dir.to_path_buf(),
        })
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn temp_path(&self, role: &str, extension: &str) -> PathBuf {
        self.temp_dir.join(unique_name(role, extension))
    }

    pub fn public_path(&self, role: &str, extension: &str) -> PathBuf {
        self.public_dir.join(unique_name(role, extension))
    }

    /// Removes assets left behind by a previous process. Only files carrying
    /// the service's naming prefix are touched.
    pub async fn sweep(&self) -> usize {
        let mut removed = 0;
        for dir in [&self.temp_dir, &self.public_dir] {
            removed += sweep_dir(dir).await;
        }
        if removed > 0 {
            info!("🧹 Removed {} stale assets", removed);
        }
        removed
    }
}

/// `slowmo-<role>-<unix millis>-<64-bit random hex>.<ext>`
pub fn unique_name(role: &str, extension: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let token: u64 = rand::rng().random();
    format!("{}{}-{}-{:016x}.{}", ASSET_PREFIX, role, millis, token, extension)
}

async fn sweep_dir(dir: &Path) -> usize {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot sweep {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(ASSET_PREFIX) {
            continue;
        }
        match fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove stale asset {:?}: {}", name, e),
        }
    }
    removed
}
