use reqwest::{redirect, Client};
use std::time::Duration;
use tracing::info;

/// Outbound client for source downloads. Redirects are disabled here because
/// the fetcher follows them itself with an explicit hop bound.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let client = Client::builder()
        .user_agent(concat!("slowmo/", env!("CARGO_PKG_VERSION")))
        .redirect(redirect::Policy::none())
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .timeout(timeout)
        .build()?;

    info!("✅ HTTP client ready (timeout {}s)", timeout.as_secs());
    Ok(client)
}
