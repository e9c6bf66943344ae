//! Bundle content configuration.

use std::path::PathBuf;

/// Bundle content configuration.
///
/// Controls what goes into the assembled bundle beyond the compiled shell
/// binary: icon, assets, the source snapshot exclusion sets, and the helper
/// tools that get relocatable wrappers.
#[derive(Clone, Debug)]
pub struct BundleSettings {
    /// Bundle identifier (CFBundleIdentifier), e.g. `com.studio.app`.
    pub identifier: String,

    /// Source PNG for the application icon.
    ///
    /// Converted to `.icns` during the icon stage. None skips the stage
    /// with a warning.
    pub icon: Option<PathBuf>,

    /// Entitlements plist attached to the root signature only.
    pub entitlements: Option<PathBuf>,

    /// External asset directory copied into `Contents/Resources/assets`.
    pub asset_dir: Option<PathBuf>,

    /// Directory names excluded from the source snapshot.
    ///
    /// Keeps transient build output and any prior bundle out of the
    /// snapshot so the bundle never embeds itself.
    pub snapshot_excludes: Vec<String>,

    /// Subpaths of the deployed copy that a resync must never delete.
    ///
    /// User-generated artifacts live here; the set is explicit, versioned
    /// configuration rather than inferred at sync time.
    pub protected_subpaths: Vec<PathBuf>,

    /// Bundled tool names that get relocatable wrappers in
    /// `Contents/Resources/bin`.
    pub helper_tools: Vec<String>,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            icon: None,
            entitlements: None,
            asset_dir: None,
            snapshot_excludes: default_snapshot_excludes(),
            protected_subpaths: vec![PathBuf::from("output"), PathBuf::from("logs")],
            helper_tools: Vec::new(),
        }
    }
}

/// Directory names that never belong in a source snapshot.
pub fn default_snapshot_excludes() -> Vec<String> {
    ["target", "dist", ".git", ".venv", "node_modules", "__pycache__"]
        .into_iter()
        .map(String::from)
        .collect()
}
