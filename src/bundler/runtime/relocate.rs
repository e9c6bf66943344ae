//! Load-path relocation for the embedded runtime tree.
//!
//! A copied Python distribution carries absolute inter-library references
//! baked in at its original install prefix. This module rewrites every
//! such reference to a `@loader_path`-relative equivalent computed from
//! the referencing binary's location inside the bundle, then re-signs each
//! patched binary with an ad-hoc signature so the loader accepts it.
//!
//! The pass is idempotent: once no reference matches the prefix, a second
//! run performs zero patch operations and leaves the tree byte-identical.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    tools::{PatchTool, SignTool},
};
use std::path::{Component, Path, PathBuf};

/// Ad-hoc signing identity marker.
const AD_HOC_IDENTITY: &str = "-";

/// Outcome of a relocation pass over a runtime tree.
#[derive(Debug, Default)]
pub struct RelocationReport {
    /// Binaries that had at least one reference rewritten.
    pub patched: usize,
    /// References rewritten across all binaries.
    pub references_rewritten: usize,
    /// Binaries that could not be rewritten, with the reason. Non-fatal;
    /// the embedder's smoke test is the backstop.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Load commands extracted from one Mach-O file.
struct MachRefs {
    /// The dylib's own install name, if it declares one.
    install_name: Option<String>,
    /// Dependent library references.
    libs: Vec<String>,
}

/// Rewrites every absolute reference under `prefix` in the runtime tree
/// rooted at `root`, re-signing each patched binary.
pub fn relocate_tree(
    root: &Path,
    prefix: &str,
    patcher: &dyn PatchTool,
    signer: &dyn SignTool,
) -> Result<RelocationReport> {
    let mut report = RelocationReport::default();

    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        match relocate_binary(entry.path(), root, prefix, patcher, signer) {
            Ok(0) => {}
            Ok(n) => {
                report.patched += 1;
                report.references_rewritten += n;
            }
            Err(e) => {
                // One unpatchable binary does not abort the embed.
                log::warn!("skipping {}: {}", entry.path().display(), e);
                report.skipped.push((entry.path().to_path_buf(), e.to_string()));
            }
        }
    }

    log::info!(
        "relocated {} references across {} binaries ({} skipped)",
        report.references_rewritten,
        report.patched,
        report.skipped.len()
    );
    Ok(report)
}

/// Rewrites one binary's references. Returns the number rewritten.
fn relocate_binary(
    binary: &Path,
    root: &Path,
    prefix: &str,
    patcher: &dyn PatchTool,
    signer: &dyn SignTool,
) -> Result<usize> {
    let buffer = std::fs::read(binary).fs_context("reading candidate binary", binary)?;
    let Some(refs) = mach_references(&buffer) else {
        return Ok(0); // not Mach-O
    };

    let rel_dir = binary
        .parent()
        .unwrap_or(root)
        .strip_prefix(root)
        .unwrap_or(Path::new(""))
        .to_path_buf();

    let mut rewritten = 0;
    for lib in &refs.libs {
        let Some(new_ref) = relocated_reference(prefix, &rel_dir, lib) else {
            continue;
        };
        patcher
            .change_ref(binary, lib, &new_ref)
            .map_err(|e| Error::Patch {
                path: binary.to_path_buf(),
                reason: e.to_string(),
            })?;
        log::debug!("  {} -> {}", lib, new_ref);
        rewritten += 1;
    }

    if let Some(name) = &refs.install_name {
        if name.starts_with(prefix) {
            let file_name = binary
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            patcher
                .set_id(binary, &format!("@loader_path/{file_name}"))
                .map_err(|e| Error::Patch {
                    path: binary.to_path_buf(),
                    reason: e.to_string(),
                })?;
            rewritten += 1;
        }
    }

    if rewritten > 0 {
        signer
            .sign(binary, AD_HOC_IDENTITY, None, false)
            .map_err(|e| Error::Patch {
                path: binary.to_path_buf(),
                reason: format!("ad-hoc re-sign failed: {e}"),
            })?;
    }

    Ok(rewritten)
}

/// Computes the loader-relative replacement for a reference, or None when
/// the reference does not point inside the original prefix.
///
/// `rel_dir` is the referencing binary's directory relative to the runtime
/// root. The replacement climbs out of `rel_dir` with one `..` per
/// component, then descends to the referenced file's location in the tree.
pub fn relocated_reference(prefix: &str, rel_dir: &Path, reference: &str) -> Option<String> {
    let tail = reference.strip_prefix(prefix)?;
    let tail = tail.trim_start_matches('/');
    if tail.is_empty() {
        return None;
    }

    let ups = rel_dir
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count();

    let mut result = String::from("@loader_path");
    for _ in 0..ups {
        result.push_str("/..");
    }
    result.push('/');
    result.push_str(tail);
    Some(result)
}

/// Scans a runtime tree and returns every remaining reference that still
/// points inside the original prefix. Empty means fully relocated.
pub fn verify_relocated(root: &Path, prefix: &str) -> Result<Vec<(PathBuf, String)>> {
    let mut offenders = Vec::new();

    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(buffer) = std::fs::read(entry.path()) else {
            continue;
        };
        let Some(refs) = mach_references(&buffer) else {
            continue;
        };
        for lib in refs.libs {
            if lib.starts_with(prefix) {
                offenders.push((entry.path().to_path_buf(), lib));
            }
        }
        if let Some(name) = refs.install_name {
            if name.starts_with(prefix) {
                offenders.push((entry.path().to_path_buf(), name));
            }
        }
    }

    Ok(offenders)
}

/// Extracts load commands from a Mach-O buffer, or None for other formats.
fn mach_references(buffer: &[u8]) -> Option<MachRefs> {
    match goblin::Object::parse(buffer) {
        Ok(goblin::Object::Mach(goblin::mach::Mach::Binary(macho))) => Some(MachRefs {
            install_name: macho.name.map(String::from),
            libs: macho
                .libs
                .iter()
                .filter(|&&l| l != "self")
                .map(|l| l.to_string())
                .collect(),
        }),
        Ok(goblin::Object::Mach(goblin::mach::Mach::Fat(fat))) => {
            // All architectures carry the same load commands; read the first.
            match fat.get(0) {
                Ok(goblin::mach::SingleArch::MachO(macho)) => Some(MachRefs {
                    install_name: macho.name.map(String::from),
                    libs: macho
                        .libs
                        .iter()
                        .filter(|&&l| l != "self")
                        .map(|l| l.to_string())
                        .collect(),
                }),
                _ => None,
            }
        }
        _ => None,
    }
}
