use anyhow::Context;
use reqwest::{Client, Response};

use crate::{config::InstallerConfig, error::NetworkError};

/// Build the single HTTP client shared by the manifest fetch and the archive
/// download. Some CDNs reject requests without a browser-like user agent.
pub fn build_client(config: &InstallerConfig) -> anyhow::Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()
        .with_context(|| "building http client")
}

/// Issue a GET and fail on anything but a 2xx status.
pub(crate) async fn get_success(client: &Client, url: &str) -> Result<Response, NetworkError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| NetworkError::transport(url, err))?;

    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::status(url, status));
    }
    Ok(response)
}
