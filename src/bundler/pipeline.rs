//! The bundle assembly pipeline.
//!
//! Runs the stages in a fixed order, each a full barrier for the next.
//! Every failure is tagged with its stage name so the exit report can say
//! which stage failed. Distribution (sign, image, notarize) runs after
//! assembly and only when enabled.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    image,
    layout::BundleLayout,
    notarize,
    runtime,
    settings::Settings,
    sign,
    stages,
    tools::Toolset,
    utils::fs,
};
use std::path::PathBuf;

/// What a successful pipeline run produced.
#[derive(Debug)]
pub struct BundleArtifact {
    /// The assembled `.app` directory.
    pub bundle_root: PathBuf,
    /// The disk image, when distribution ran.
    pub image: Option<PathBuf>,
    /// Hex SHA-256 of the image, when distribution ran.
    pub checksum: Option<String>,
}

/// Assembles, and optionally signs and distributes, the bundle.
pub struct BundlePipeline {
    settings: Settings,
    tools: Toolset,
}

impl BundlePipeline {
    /// Creates a pipeline over a settings value and toolset.
    pub fn new(settings: Settings, tools: Toolset) -> Self {
        Self { settings, tools }
    }

    /// Runs the full pipeline.
    pub async fn run(&self) -> Result<BundleArtifact> {
        let layout = BundleLayout::new(self.settings.out_dir(), self.settings.product_name());

        log::info!(
            "assembling {} {} at {}",
            self.settings.product_name(),
            self.settings.version_string(),
            layout.root().display()
        );

        stage("compile", stages::compile::run(&self.settings, &layout).await)?;
        stage("icon", stages::icon::run(&self.settings, &layout).await)?;
        stage("metadata", stages::plist::run(&self.settings, &layout).await)?;
        stage("resources", self.copy_resources(&layout).await)?;
        stage("snapshot", stages::snapshot::run(&self.settings, &layout).await)?;
        stage(
            "runtime",
            runtime::embed(&self.settings, &self.tools, &layout)
                .await
                .map(|_| ()),
        )?;
        stage("wrappers", stages::wrappers::run(&self.settings, &layout).await)?;
        stage("finalize", self.finalize(&layout))?;

        let (image, checksum) = if self.settings.sign() {
            let (image, checksum) = self.distribute(&layout).await?;
            (Some(image), Some(checksum))
        } else {
            (None, None)
        };

        Ok(BundleArtifact {
            bundle_root: layout.root().to_path_buf(),
            image,
            checksum,
        })
    }

    /// Runs the distribution flow: sign, image, notarize.
    pub async fn distribute(&self, layout: &BundleLayout) -> Result<(PathBuf, String)> {
        stage(
            "sign",
            sign::sign_bundle(&self.settings, layout, self.tools.signer.as_ref()).await,
        )?;

        let (image, checksum) = stage(
            "image",
            image::create_image(&self.settings, layout, self.tools.imager.as_ref()).await,
        )?;

        if self.settings.notarize() {
            stage(
                "notarize",
                notarize::notarize_image(&self.settings, &image, self.tools.notary.as_ref()).await,
            )?;
        }

        Ok((image, checksum))
    }

    /// Copies the external asset directory into the bundle, if configured.
    async fn copy_resources(&self, layout: &BundleLayout) -> Result<()> {
        let resources = layout.resources();
        fs::create_dir_all(&resources, false).await?;

        if let Some(asset_dir) = &self.settings.bundle_settings().asset_dir {
            fs::copy_dir(asset_dir, &layout.assets_dir()).await?;
        }
        Ok(())
    }

    /// Structural checks before the bundle is declared assembled.
    fn finalize(&self, layout: &BundleLayout) -> Result<()> {
        let required = [
            layout.info_plist(),
            layout.entry_point(self.settings.product_name()),
            layout.macos_dir().join(self.settings.shell_binary()),
            layout.repo_marker(),
            layout.python_wrapper(),
        ];
        for path in &required {
            if !path.exists() {
                return Err(Error::GenericError(format!(
                    "assembled bundle is missing {}",
                    path.display()
                )));
            }
        }

        let marker = std::fs::read_to_string(layout.repo_marker())
            .fs_context("reading version marker", &layout.repo_marker())?;
        if marker != self.settings.version_string() {
            return Err(Error::GenericError(format!(
                "version marker mismatch: bundle carries {marker:?}, expected {:?}",
                self.settings.version_string()
            )));
        }
        Ok(())
    }
}

fn stage<T>(name: &'static str, result: Result<T>) -> Result<T> {
    result.map_err(|e| e.in_stage(name))
}
