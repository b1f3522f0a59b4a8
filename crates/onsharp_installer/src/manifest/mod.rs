use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{InstallError, NetworkError},
    http,
    platform::Platform,
};

const WINDOWS_KEY: &str = "win";
const UNIX_KEY: &str = "unix";

/// Per-platform archive locations published by the distribution server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallManifest {
    pub windows_archive_url: String,
    pub unix_archive_url: String,
}

impl InstallManifest {
    pub fn parse(body: &str) -> Result<Self, InstallError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|err| InstallError::Parse(format!("body is not valid json: {err}")))?;
        let object = value
            .as_object()
            .ok_or_else(|| InstallError::Parse("manifest root must be an object".to_string()))?;

        Ok(Self {
            windows_archive_url: required_url(object, WINDOWS_KEY)?,
            unix_archive_url: required_url(object, UNIX_KEY)?,
        })
    }

    /// Archive to download for `platform`; `None` for unsupported platforms.
    pub fn archive_url_for(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Windows => Some(&self.windows_archive_url),
            Platform::Linux => Some(&self.unix_archive_url),
            Platform::MacOsOrOtherUnix | Platform::Unknown => None,
        }
    }
}

fn required_url(
    object: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<String, InstallError> {
    let raw = match object.get(key) {
        Some(Value::String(raw)) => raw.trim(),
        Some(_) => return Err(InstallError::Parse(format!("field `{key}` must be a string"))),
        None => return Err(InstallError::Parse(format!("missing field `{key}`"))),
    };
    if raw.is_empty() {
        return Err(InstallError::Parse(format!("field `{key}` is empty")));
    }

    let url = Url::parse(raw)
        .map_err(|err| InstallError::Parse(format!("field `{key}` is not a valid url: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InstallError::Parse(format!(
            "field `{key}` must be an http(s) url"
        )));
    }
    Ok(raw.to_string())
}

/// Fetch and parse the install manifest. A single attempt, no retries.
pub async fn fetch_manifest(client: &Client, url: &str) -> Result<InstallManifest, InstallError> {
    let response = http::get_success(client, url).await?;
    let body = response
        .text()
        .await
        .map_err(|err| NetworkError::transport(url, err))?;
    debug!(%url, bytes = body.len(), "manifest body received");
    InstallManifest::parse(&body)
}
