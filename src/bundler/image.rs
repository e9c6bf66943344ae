//! Disk image creation.
//!
//! Packages the assembled bundle into a compressed disk image named
//! `<Product>-<version>.dmg` (unless overridden) and writes a `.sha256`
//! sidecar so downloads can be verified without mounting the image.

use crate::bundler::{
    checksum,
    error::{ErrorExt, Result},
    layout::BundleLayout,
    settings::Settings,
    tools::ImageTool,
};
use std::path::PathBuf;

/// Creates the distributable image and its checksum sidecar.
///
/// Returns the image path and its hex-encoded SHA-256.
pub async fn create_image(
    settings: &Settings,
    layout: &BundleLayout,
    imager: &dyn ImageTool,
) -> Result<(PathBuf, String)> {
    let image = settings.image_path();
    if let Some(parent) = image.parent() {
        std::fs::create_dir_all(parent).fs_context("creating image directory", parent)?;
    }

    imager.create(layout.root(), settings.product_name(), &image)?;

    let digest = checksum::calculate_sha256(&image).await?;
    let sidecar = sidecar_path(&image);
    let file_name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    std::fs::write(&sidecar, format!("{digest}  {file_name}\n"))
        .fs_context("writing checksum sidecar", &sidecar)?;

    log::info!("image ready: {} ({digest})", image.display());
    Ok((image, digest))
}

fn sidecar_path(image: &std::path::Path) -> PathBuf {
    let mut name = image.file_name().unwrap_or_default().to_os_string();
    name.push(".sha256");
    image.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_keeps_full_image_name() {
        assert_eq!(
            sidecar_path(std::path::Path::new("/d/Studio-1.0.dmg")),
            std::path::Path::new("/d/Studio-1.0.dmg.sha256")
        );
    }
}
