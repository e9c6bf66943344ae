//! Artifact checksum calculation.
//!
//! SHA-256 of a produced artifact file, used for the disk image's
//! `.sha256` sidecar.

use crate::bundler::error::{ErrorExt, Result};
use crate::bail;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

/// Calculates the SHA-256 checksum of a file, reading in 8KB chunks.
pub async fn calculate_sha256(path: &std::path::Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading artifact metadata", path)?;
    if !metadata.is_file() {
        bail!("Path is not a file: {}", path.display())
    }

    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening file for hashing", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hash calculation", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_hash_is_deterministic_and_content_sensitive() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("app.dmg");
        std::fs::write(&artifact, b"image contents").unwrap();

        let first = calculate_sha256(&artifact).await.unwrap();
        let second = calculate_sha256(&artifact).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);

        std::fs::write(&artifact, b"changed").unwrap();
        let third = calculate_sha256(&artifact).await.unwrap();
        assert_ne!(first, third);
    }

    #[tokio::test]
    async fn directories_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(calculate_sha256(tmp.path()).await.is_err());
    }
}
