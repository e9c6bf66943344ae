//! Icon stage: convert the source PNG into an `.icns` icon set.
//!
//! A missing icon is a cosmetic defect, not a build failure: the stage
//! logs a warning and skips. A configured icon that fails to convert is
//! still an error.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    layout::BundleLayout,
    settings::Settings,
};
use std::io::BufWriter;

/// Icon edge sizes rendered into the icon set.
const ICON_SIZES: [u32; 5] = [16, 32, 128, 256, 512];

/// Runs the icon stage.
pub async fn run(settings: &Settings, layout: &BundleLayout) -> Result<()> {
    let Some(source) = &settings.bundle_settings().icon else {
        log::warn!("no application icon configured; bundle will use the generic icon");
        return Ok(());
    };
    if !source.is_file() {
        log::warn!(
            "application icon {} not found; bundle will use the generic icon",
            source.display()
        );
        return Ok(());
    }

    let image = image::open(source)
        .map_err(|e| Error::GenericError(format!("cannot read icon {}: {e}", source.display())))?;

    let mut family = icns::IconFamily::new();
    for size in ICON_SIZES {
        let resized = image.resize_exact(size, size, image::imageops::FilterType::Lanczos3);
        let rgba = resized.into_rgba8();
        let icns_image = icns::Image::from_data(
            icns::PixelFormat::RGBA,
            size,
            size,
            rgba.into_raw(),
        )
        .map_err(|e| Error::GenericError(format!("icon conversion failed at {size}px: {e}")))?;
        family
            .add_icon(&icns_image)
            .map_err(|e| Error::GenericError(format!("icon set rejected {size}px entry: {e}")))?;
    }

    let resources = layout.resources();
    std::fs::create_dir_all(&resources).fs_context("creating Resources directory", &resources)?;
    let out = resources.join("icon.icns");
    let file = std::fs::File::create(&out).fs_context("creating icon file", &out)?;
    family
        .write(BufWriter::new(file))
        .map_err(|e| Error::GenericError(format!("writing icon set failed: {e}")))?;

    log::info!("wrote {}", out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{PackageSettings, SettingsBuilder};

    fn settings(tmp: &std::path::Path) -> Settings {
        SettingsBuilder::new()
            .project_root(tmp)
            .out_dir(tmp.join("dist"))
            .package_settings(PackageSettings {
                product_name: "Studio".into(),
                version: "1.0.0".into(),
                description: String::new(),
                shell_binary: "studio-shell".into(),
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn missing_icon_skips_without_error() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings(tmp.path());
        let layout = BundleLayout::new(&tmp.path().join("dist"), "Studio");
        run(&settings, &layout).await.unwrap();
        assert!(!layout.resources().join("icon.icns").exists());
    }
}
