//! Package metadata for the bundled application.

/// Package metadata and configuration.
///
/// Maps from the shell project's `Cargo.toml` `[package]` section, which is
/// the single source of truth for the bundle version.
#[derive(Debug, Clone, Default)]
pub struct PackageSettings {
    /// Product name displayed to users.
    ///
    /// Shown in Finder and the menu bar; also names the `.app` directory.
    pub product_name: String,

    /// Version string recorded in Info.plist and the snapshot marker.
    ///
    /// `"unknown"` is the sentinel used when the project declares no
    /// version; it can never equal a real deployed marker, so it forces a
    /// resync instead of a false match.
    pub version: String,

    /// Brief description of the application.
    pub description: String,

    /// Name of the compiled shell binary produced by the project.
    pub shell_binary: String,
}

impl PackageSettings {
    /// Sentinel version used when the project declares none.
    pub const UNKNOWN_VERSION: &'static str = "unknown";
}
