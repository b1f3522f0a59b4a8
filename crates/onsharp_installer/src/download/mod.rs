use std::path::Path;

use reqwest::Client;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, info};

use crate::{
    error::{InstallError, NetworkError},
    http,
};

/// Stream `url` into `dest`, replacing whatever is there. Returns the number
/// of bytes written. A partially written file is left behind on failure.
pub async fn download_archive(
    client: &Client,
    url: &str,
    dest: &Path,
) -> Result<u64, InstallError> {
    let mut response = http::get_success(client, url).await?;

    let mut file = File::create(dest)
        .await
        .map_err(|err| InstallError::io(format!("creating {:?}", dest), err))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|err| NetworkError::transport(url, err))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|err| InstallError::io(format!("writing {:?}", dest), err))?;
        written += chunk.len() as u64;
        debug!(bytes = written, "archive chunk written");
    }

    file.flush()
        .await
        .map_err(|err| InstallError::io(format!("flushing {:?}", dest), err))?;

    info!(%url, path = ?dest, bytes = written, "archive downloaded");
    Ok(written)
}
