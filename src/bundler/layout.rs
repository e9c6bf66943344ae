//! Assembled bundle directory layout.
//!
//! Single place that knows where everything lives inside the `.app`:
//!
//! ```text
//! <Product>.app/
//!   Contents/
//!     Info.plist
//!     PkgInfo
//!     MacOS/<Product>            launcher (entry point)
//!     MacOS/<shell binary>       compiled shell executable
//!     Resources/
//!       icon.icns
//!       assets/
//!       repo/                    source snapshot (+ .version marker)
//!       runtime/python/          relocated interpreter tree
//!       runtime/site-packages/   isolated package directory
//!       runtime/bin/python3      bootstrap wrapper
//!       bin/                     helper tool wrappers
//! ```

use std::path::{Path, PathBuf};

/// Marker file name carrying the snapshot version.
pub const VERSION_MARKER: &str = ".version";

/// Paths inside an assembled (or assembling) bundle.
#[derive(Clone, Debug)]
pub struct BundleLayout {
    root: PathBuf,
}

impl BundleLayout {
    /// Lays out a bundle named after the product under `out_dir`.
    pub fn new(out_dir: &Path, product_name: &str) -> Self {
        Self {
            root: out_dir.join(format!("{product_name}.app")),
        }
    }

    /// Reconstructs the layout from an existing bundle root.
    pub fn from_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// The `.app` directory itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `Contents/` directory.
    pub fn contents(&self) -> PathBuf {
        self.root.join("Contents")
    }

    /// `Contents/Info.plist`.
    pub fn info_plist(&self) -> PathBuf {
        self.contents().join("Info.plist")
    }

    /// `Contents/MacOS/` executable directory.
    pub fn macos_dir(&self) -> PathBuf {
        self.contents().join("MacOS")
    }

    /// The launcher executable, named after the product.
    pub fn entry_point(&self, product_name: &str) -> PathBuf {
        self.macos_dir().join(product_name)
    }

    /// `Contents/Resources/`.
    pub fn resources(&self) -> PathBuf {
        self.contents().join("Resources")
    }

    /// `Contents/Resources/assets/`.
    pub fn assets_dir(&self) -> PathBuf {
        self.resources().join("assets")
    }

    /// Source snapshot directory.
    pub fn repo_dir(&self) -> PathBuf {
        self.resources().join("repo")
    }

    /// Version marker inside the source snapshot.
    pub fn repo_marker(&self) -> PathBuf {
        self.repo_dir().join(VERSION_MARKER)
    }

    /// Embedded runtime root.
    pub fn runtime_dir(&self) -> PathBuf {
        self.resources().join("runtime")
    }

    /// Relocated interpreter tree.
    pub fn python_home(&self) -> PathBuf {
        self.runtime_dir().join("python")
    }

    /// Isolated package directory.
    pub fn site_packages(&self) -> PathBuf {
        self.runtime_dir().join("site-packages")
    }

    /// Bootstrap wrapper for the embedded interpreter.
    pub fn python_wrapper(&self) -> PathBuf {
        self.runtime_dir().join("bin").join("python3")
    }

    /// Helper tool wrapper directory.
    pub fn helper_bin_dir(&self) -> PathBuf {
        self.resources().join("bin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_places_repo_marker_inside_snapshot() {
        let layout = BundleLayout::new(Path::new("/tmp/dist"), "Studio");
        assert_eq!(
            layout.repo_marker(),
            Path::new("/tmp/dist/Studio.app/Contents/Resources/repo/.version")
        );
    }

    #[test]
    fn entry_point_is_named_after_product() {
        let layout = BundleLayout::new(Path::new("/x"), "Studio");
        assert!(layout.entry_point("Studio").ends_with("Contents/MacOS/Studio"));
    }
}
