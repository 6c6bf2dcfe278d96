use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    TempDir,
    PublicDir,
    PublicPathPrefix,
    PublicBaseUrl,
    PublicRetentionSecs,
    EngineCommand,
    EngineTimeoutSecs,
    DeployProfile,
    ValidationStrictness,
    AudioDir,
    MaxRedirects,
    MaxSourceBytes,
    DownloadTimeoutSecs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::TempDir => "TEMP_DIR",
            EnvKey::PublicDir => "PUBLIC_DIR",
            EnvKey::PublicPathPrefix => "PUBLIC_PATH_PREFIX",
            EnvKey::PublicBaseUrl => "PUBLIC_BASE_URL",
            EnvKey::PublicRetentionSecs => "PUBLIC_RETENTION_SECS",
            EnvKey::EngineCommand => "ENGINE_COMMAND",
            EnvKey::EngineTimeoutSecs => "ENGINE_TIMEOUT_SECS",
            EnvKey::DeployProfile => "DEPLOY_PROFILE",
            EnvKey::ValidationStrictness => "VALIDATION_STRICTNESS",
            EnvKey::AudioDir => "AUDIO_DIR",
            EnvKey::MaxRedirects => "MAX_REDIRECTS",
            EnvKey::MaxSourceBytes => "MAX_SOURCE_BYTES",
            EnvKey::DownloadTimeoutSecs => "DOWNLOAD_TIMEOUT_SECS",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

/// Like `get`, but treats an empty value the same as an unset one.
pub fn get_opt(key: EnvKey) -> Option<String> {
    get(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
