use crate::config::settings::AppConfig;
use crate::infrastructure::storage::workspace::AssetWorkspace;
use crate::modules::transcode::audio::AudioCatalog;
use crate::modules::transcode::engine::EngineRunner;
use crate::modules::transcode::fetcher::Fetcher;
use crate::workers::cleanup::CleanupScheduler;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub workspace: AssetWorkspace,
    pub fetcher: Fetcher,
    pub engine: EngineRunner,
    pub audio: AudioCatalog,
    pub cleanup: CleanupScheduler,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        workspace: AssetWorkspace,
        fetcher: Fetcher,
        audio: AudioCatalog,
    ) -> Self {
        let engine = EngineRunner::new(config.engine.clone(), config.engine_timeout);
        Self {
            config: Arc::new(config),
            workspace,
            fetcher,
            engine,
            audio,
            cleanup: CleanupScheduler::new(),
        }
    }
}
