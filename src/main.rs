use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;
mod workers;

use config::settings::AppConfig;
use infrastructure::http::client::build_client;
use infrastructure::storage::workspace::AssetWorkspace;
use modules::transcode::audio::AudioCatalog;
use modules::transcode::fetcher::Fetcher;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("slowmo=info,tower_http=info")),
        )
        .init();

    info!("Starting server...");

    let config = AppConfig::new()?;
    info!(
        "Profile '{}' ({} validation), engine '{}', timeout {}s",
        config.profile.name,
        config.profile.strictness,
        config.engine.program,
        config.engine_timeout.as_secs()
    );

    let workspace = AssetWorkspace::prepare(&config.temp_dir, &config.public_dir).await?;
    workspace.sweep().await;

    let client = build_client(config.download_timeout)?;
    let fetcher = Fetcher::new(client, config.max_redirects, config.max_source_bytes);
    let audio = AudioCatalog::load(&config.audio_dir)?;

    let port = config.server_port;
    let state = AppState::new(config, workspace, fetcher, audio);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}
