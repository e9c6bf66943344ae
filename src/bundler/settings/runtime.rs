//! Embedded Python runtime configuration.

use std::path::PathBuf;

/// Embedded runtime configuration.
///
/// Describes where the Python distribution comes from and which packages
/// must end up in the bundle-scoped site directory.
#[derive(Clone, Debug)]
pub struct RuntimeSettings {
    /// Local pre-installed distribution to copy, preferred over download.
    ///
    /// Typically a framework version directory such as
    /// `/Library/Frameworks/Python.framework/Versions/3.12`.
    pub source_home: Option<PathBuf>,

    /// Version to download when no local distribution exists, e.g. "3.12.4".
    ///
    /// The acquired point version may differ from this; the bootstrap
    /// wrapper is always parameterized by the version detected from the
    /// copied tree.
    pub requested_version: String,

    /// Original absolute install prefix baked into the distribution's
    /// binaries. Defaults to the canonical source home for local copies
    /// and the standard framework prefix for downloads.
    pub install_prefix: Option<String>,

    /// Declared dependency set installed into the isolated package
    /// directory, never system-wide.
    pub packages: Vec<String>,

    /// Import names verified after install; any missing one fails the build.
    pub critical_imports: Vec<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            source_home: None,
            requested_version: "3.12.4".to_string(),
            install_prefix: None,
            packages: Vec::new(),
            critical_imports: Vec::new(),
        }
    }
}
