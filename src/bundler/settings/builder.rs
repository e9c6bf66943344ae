//! Builder for constructing Settings.

use super::{BundleSettings, MacOsSettings, PackageSettings, RuntimeSettings, Settings};
use std::path::{Path, PathBuf};

/// Builder for constructing [`Settings`].
///
/// Provides a fluent API for building bundle settings with validation.
///
/// # Examples
///
/// ```no_run
/// use studio_bundler::bundler::{SettingsBuilder, PackageSettings};
///
/// # fn example() -> studio_bundler::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .project_root("/path/to/app")
///     .out_dir("/path/to/app/dist")
///     .package_settings(PackageSettings {
///         product_name: "Studio".into(),
///         version: "0.4.0".into(),
///         description: "Studio desktop app".into(),
///         shell_binary: "studio-shell".into(),
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    project_root: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    package_settings: Option<PackageSettings>,
    bundle_settings: BundleSettings,
    macos: MacOsSettings,
    runtime: RuntimeSettings,
    prebuilt_shell: Option<PathBuf>,
    sign: bool,
    notarize: bool,
    output_image: Option<PathBuf>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the project root being bundled.
    ///
    /// # Required
    pub fn project_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.project_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the output directory for the bundle and image.
    ///
    /// # Required
    pub fn out_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.out_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets package metadata.
    ///
    /// # Required
    pub fn package_settings(mut self, settings: PackageSettings) -> Self {
        self.package_settings = Some(settings);
        self
    }

    /// Sets bundle content configuration.
    pub fn bundle_settings(mut self, settings: BundleSettings) -> Self {
        self.bundle_settings = settings;
        self
    }

    /// Sets signing and notarization configuration.
    pub fn macos(mut self, settings: MacOsSettings) -> Self {
        self.macos = settings;
        self
    }

    /// Sets embedded runtime configuration.
    pub fn runtime(mut self, settings: RuntimeSettings) -> Self {
        self.runtime = settings;
        self
    }

    /// Installs a pre-built shell binary instead of building one.
    pub fn prebuilt_shell<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.prebuilt_shell = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables the signing stage.
    pub fn sign(mut self, sign: bool) -> Self {
        self.sign = sign;
        self
    }

    /// Enables notarization (implies signing).
    pub fn notarize(mut self, notarize: bool) -> Self {
        self.notarize = notarize;
        self
    }

    /// Overrides the output image path.
    pub fn output_image<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_image = Some(path.as_ref().to_path_buf());
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing:
    /// - `project_root`
    /// - `out_dir`
    /// - `package_settings`
    pub fn build(self) -> crate::bundler::Result<Settings> {
        use crate::bundler::error::Context;

        Ok(Settings::new(
            self.package_settings
                .context("package_settings is required")?,
            self.bundle_settings,
            self.macos,
            self.runtime,
            self.project_root.context("project_root is required")?,
            self.out_dir.context("out_dir is required")?,
            self.prebuilt_shell,
            self.sign,
            self.notarize,
            self.output_image,
        ))
    }
}
