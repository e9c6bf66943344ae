//! Core Settings struct and implementations.

use super::{BundleSettings, MacOsSettings, PackageSettings, RuntimeSettings};
use std::path::{Path, PathBuf};

/// Main settings for bundle assembly.
///
/// Central configuration threaded through every pipeline stage, constructed
/// via [`SettingsBuilder`]. Replaces working-directory-relative paths and
/// scattered environment reads with explicit parameters.
///
/// # See Also
///
/// - [`SettingsBuilder`](super::SettingsBuilder) - Builder for constructing Settings
/// - [`PackageSettings`] - Package metadata
/// - [`BundleSettings`] - Bundle content configuration
#[derive(Clone, Debug)]
pub struct Settings {
    /// Package metadata.
    package: PackageSettings,

    /// Bundle content configuration.
    bundle_settings: BundleSettings,

    /// Signing and notarization configuration.
    macos: MacOsSettings,

    /// Embedded runtime configuration.
    runtime: RuntimeSettings,

    /// Root of the application project being bundled.
    project_root: PathBuf,

    /// Output directory for the assembled bundle and image.
    out_dir: PathBuf,

    /// Pre-built shell binary to install instead of running the compile
    /// stage's build. Used for incremental rebuilds.
    prebuilt_shell: Option<PathBuf>,

    /// Run the signing stage.
    sign: bool,

    /// Run notarization (implies signing).
    notarize: bool,

    /// Override for the output image path.
    output_image: Option<PathBuf>,
}

impl Settings {
    /// Returns the product name.
    pub fn product_name(&self) -> &str {
        &self.package.product_name
    }

    /// Returns the bundle version string.
    pub fn version_string(&self) -> &str {
        &self.package.version
    }

    /// Returns the package description.
    pub fn description(&self) -> &str {
        &self.package.description
    }

    /// Returns the compiled shell binary name.
    pub fn shell_binary(&self) -> &str {
        &self.package.shell_binary
    }

    /// Returns the project root being bundled.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Returns the output directory for assembled artifacts.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Returns the bundle content settings.
    pub fn bundle_settings(&self) -> &BundleSettings {
        &self.bundle_settings
    }

    /// Returns the signing and notarization settings.
    pub fn macos(&self) -> &MacOsSettings {
        &self.macos
    }

    /// Returns the embedded runtime settings.
    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    /// Returns a pre-built shell binary path, if configured.
    pub fn prebuilt_shell(&self) -> Option<&Path> {
        self.prebuilt_shell.as_deref()
    }

    /// Whether the signing stage runs.
    pub fn sign(&self) -> bool {
        self.sign || self.notarize
    }

    /// Whether notarization runs.
    pub fn notarize(&self) -> bool {
        self.notarize
    }

    /// Returns the output image path, honoring any override.
    pub fn image_path(&self) -> PathBuf {
        match &self.output_image {
            Some(path) => path.clone(),
            None => self.out_dir.join(format!(
                "{}-{}.dmg",
                self.package.product_name, self.package.version
            )),
        }
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        package: PackageSettings,
        bundle_settings: BundleSettings,
        macos: MacOsSettings,
        runtime: RuntimeSettings,
        project_root: PathBuf,
        out_dir: PathBuf,
        prebuilt_shell: Option<PathBuf>,
        sign: bool,
        notarize: bool,
        output_image: Option<PathBuf>,
    ) -> Self {
        Self {
            package,
            bundle_settings,
            macos,
            runtime,
            project_root,
            out_dir,
            prebuilt_shell,
            sign,
            notarize,
            output_image,
        }
    }
}
