//! Bundle signing.
//!
//! Signs every Mach-O inside the bundle innermost-first, then the bundle
//! root, then verifies the whole tree. Entitlements attach to the root
//! signature only; nested binaries get plain hardened-runtime signatures.

use crate::bundler::{
    error::{Error, Result},
    layout::BundleLayout,
    settings::Settings,
    tools::SignTool,
};
use std::path::{Path, PathBuf};

/// Mach-O magic numbers, both endiannesses, thin and fat.
const MACH_MAGICS: [[u8; 4]; 8] = [
    [0xfe, 0xed, 0xfa, 0xce],
    [0xce, 0xfa, 0xed, 0xfe],
    [0xfe, 0xed, 0xfa, 0xcf],
    [0xcf, 0xfa, 0xed, 0xfe],
    [0xca, 0xfe, 0xba, 0xbe],
    [0xbe, 0xba, 0xfe, 0xca],
    [0xca, 0xfe, 0xba, 0xbf],
    [0xbf, 0xba, 0xfe, 0xca],
];

/// Signs the bundle and verifies the result.
pub async fn sign_bundle(
    settings: &Settings,
    layout: &BundleLayout,
    signer: &dyn SignTool,
) -> Result<()> {
    let identity = settings
        .macos()
        .signing_identity
        .as_deref()
        .ok_or_else(|| {
            Error::Signing("signing requested but no signing identity configured".into())
        })?;

    let nested = collect_signable(layout.root())?;
    log::info!("signing {} nested binaries", nested.len());
    for binary in &nested {
        signer.sign(binary, identity, None, true)?;
    }

    let entitlements = settings.bundle_settings().entitlements.as_deref();
    signer.sign(layout.root(), identity, entitlements, true)?;

    signer.verify(layout.root())?;
    Ok(())
}

/// Collects every Mach-O under `root`, deepest paths first so nested code
/// is signed before the code that contains it.
pub fn collect_signable(root: &Path) -> Result<Vec<PathBuf>> {
    let mut binaries: Vec<PathBuf> = Vec::new();
    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if is_macho(entry.path()) {
            binaries.push(entry.into_path());
        }
    }
    binaries.sort_by(|a, b| {
        let depth = |p: &PathBuf| p.components().count();
        depth(b).cmp(&depth(a)).then_with(|| a.cmp(b))
    });
    Ok(binaries)
}

/// Cheap magic-number check, avoids parsing every file in the tree.
pub fn is_macho(path: &Path) -> bool {
    let Ok(mut file) = std::fs::File::open(path) else {
        return false;
    };
    use std::io::Read;
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() {
        return false;
    }
    MACH_MAGICS.contains(&magic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_macho(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut bytes = vec![0xcf, 0xfa, 0xed, 0xfe];
        bytes.extend_from_slice(&[0u8; 28]);
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn collects_deepest_binaries_first() {
        let tmp = tempfile::tempdir().unwrap();
        write_macho(&tmp.path().join("Contents/MacOS/app"));
        write_macho(&tmp.path().join("Contents/Resources/runtime/python/lib/libpython.dylib"));
        std::fs::write(tmp.path().join("Contents/PkgInfo"), b"APPL????").unwrap();

        let binaries = collect_signable(tmp.path()).unwrap();
        assert_eq!(binaries.len(), 2);
        assert!(binaries[0].ends_with("libpython.dylib"));
        assert!(binaries[1].ends_with("app"));
    }

    #[test]
    fn text_files_are_not_macho() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("run.sh");
        std::fs::write(&script, b"#!/bin/sh\n").unwrap();
        assert!(!is_macho(&script));

        let binary = tmp.path().join("bin");
        write_macho(&binary);
        assert!(is_macho(&binary));
    }
}
