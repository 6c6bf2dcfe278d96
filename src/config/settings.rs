use crate::config::env::{self, EnvKey};
use crate::config::profile::{ConfigError, DeploymentProfile, ValidationStrictness};
use std::path::PathBuf;
use std::time::Duration;

/// Program plus leading arguments, e.g. `nice -n 10 ffmpeg`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub leading_args: Vec<String>,
}

impl EngineCommand {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut parts = raw.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(ConfigError::EmptyEngineCommand)?;
        Ok(Self {
            program,
            leading_args: parts.collect(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub temp_dir: PathBuf,
    pub public_dir: PathBuf,
    pub public_path_prefix: String,
    pub public_base_url: Option<String>,
    pub public_retention: Duration,
    pub engine: EngineCommand,
    pub engine_timeout: Duration,
    pub profile: DeploymentProfile,
    pub audio_dir: PathBuf,
    pub max_redirects: usize,
    pub max_source_bytes: u64,
    pub download_timeout: Duration,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let mut profile: DeploymentProfile = env::get_or(EnvKey::DeployProfile, "standard").parse()?;
        if let Some(raw) = env::get_opt(EnvKey::ValidationStrictness) {
            profile = profile.with_strictness(raw.parse::<ValidationStrictness>()?);
        }

        let temp_dir = env::get_opt(EnvKey::TempDir)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("slowmo"));

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            temp_dir,
            public_dir: PathBuf::from(env::get_or(EnvKey::PublicDir, "public/videos")),
            public_path_prefix: normalize_prefix(&env::get_or(EnvKey::PublicPathPrefix, "/videos")),
            public_base_url: env::get_opt(EnvKey::PublicBaseUrl)
                .map(|url| url.trim_end_matches('/').to_string()),
            public_retention: Duration::from_secs(env::get_parsed(EnvKey::PublicRetentionSecs, 30)),
            engine: EngineCommand::parse(&env::get_or(EnvKey::EngineCommand, "ffmpeg"))?,
            engine_timeout: Duration::from_secs(env::get_parsed(EnvKey::EngineTimeoutSecs, 60)),
            profile,
            audio_dir: PathBuf::from(env::get_or(EnvKey::AudioDir, "assets/audio")),
            max_redirects: env::get_parsed(EnvKey::MaxRedirects, 5),
            max_source_bytes: env::get_parsed(EnvKey::MaxSourceBytes, 25 * 1024 * 1024),
            download_timeout: Duration::from_secs(env::get_parsed(EnvKey::DownloadTimeoutSecs, 20)),
        })
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/videos".to_string()
    } else {
        format!("/{}", trimmed)
    }
}
