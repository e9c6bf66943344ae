//! HTTP utilities for downloading runtime distributions.

use crate::bundler::error::{Error, Result};

/// Downloads a file from a URL.
///
/// Returns the file contents as a byte vector. Used by the runtime
/// embedder when no local distribution exists.
pub async fn download(url: &str) -> Result<Vec<u8>> {
    let url = url::Url::parse(url)
        .map_err(|e| Error::Acquisition(format!("invalid download URL {url}: {e}")))?;
    log::info!("Downloading {}", url);

    let response = reqwest::get(url.clone())
        .await
        .map_err(|e| Error::Acquisition(format!("download failed: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::Acquisition(format!(
            "download of {url} returned {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Acquisition(format!("failed to read response: {e}")))?;

    Ok(bytes.to_vec())
}
