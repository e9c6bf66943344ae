//! Deployed-copy mirror sync.
//!
//! Brings the deployed copy to byte-parity with the bundled snapshot:
//! delete everything except the protected subpaths, then copy the snapshot
//! over. The version marker is excluded from both passes; the reconciler
//! writes it only after the sync completed in full.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    layout::VERSION_MARKER,
    utils::fs::copy_dir_filtered,
};
use std::path::{Path, PathBuf};

/// Counters for a reconciliation sync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Files copied from the snapshot.
    pub files_copied: usize,
    /// Files and directories removed from the deployed copy.
    pub files_removed: usize,
}

/// Mirrors `snapshot` into `deployed`, never touching `protected` subpaths.
pub fn mirror_sync(
    snapshot: &Path,
    deployed: &Path,
    protected: &[PathBuf],
) -> Result<SyncStats> {
    let mut stats = SyncStats::default();

    if deployed.exists() {
        stats.files_removed = clear_except_protected(deployed, protected)?;
    } else {
        std::fs::create_dir_all(deployed).fs_context("creating deployed copy", deployed)?;
    }

    // Copy everything but the marker; protected subpaths of the snapshot
    // are also skipped so a stale bundled artifact never clobbers user data.
    let mut exclude_prefixes: Vec<PathBuf> = protected.to_vec();
    exclude_prefixes.push(PathBuf::from(VERSION_MARKER));
    let copy = copy_dir_filtered(snapshot, deployed, &[], &exclude_prefixes)
        .map_err(|e| Error::Sync(e.to_string()))?;
    stats.files_copied = copy.files_copied;

    Ok(stats)
}

/// Removes every entry under `root` except the protected subpaths.
/// Returns the number of entries removed.
fn clear_except_protected(root: &Path, protected: &[PathBuf]) -> Result<usize> {
    clear_dir(Path::new(""), root, protected)
}

fn clear_dir(rel: &Path, dir: &Path, protected: &[PathBuf]) -> Result<usize> {
    let mut removed = 0;
    let entries = std::fs::read_dir(dir).fs_context("reading deployed directory", dir)?;
    for entry in entries {
        let entry = entry.fs_context("reading deployed entry", dir)?;
        let rel_path = rel.join(entry.file_name());

        // A protected subpath survives untouched.
        if protected.iter().any(|p| rel_path.starts_with(p)) {
            continue;
        }

        let file_type = entry
            .file_type()
            .fs_context("inspecting deployed entry", &entry.path())?;

        if file_type.is_dir() {
            // Keep directories that contain something protected, but
            // clear their unprotected contents.
            if protected.iter().any(|p| p.starts_with(&rel_path)) {
                removed += clear_dir(&rel_path, &entry.path(), protected)?;
            } else {
                std::fs::remove_dir_all(entry.path())
                    .fs_context("removing deployed directory", &entry.path())?;
                removed += 1;
            }
        } else {
            std::fs::remove_file(entry.path())
                .fs_context("removing deployed file", &entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn sync_mirrors_snapshot_and_preserves_protected() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = tmp.path().join("snapshot");
        touch(&snapshot.join("main.py"), "new");
        touch(&snapshot.join("lib/util.py"), "new");
        touch(&snapshot.join(VERSION_MARKER), "2.0.0");

        let deployed = tmp.path().join("deployed");
        touch(&deployed.join("main.py"), "old");
        touch(&deployed.join("obsolete.py"), "old");
        touch(&deployed.join("output/render.png"), "user data");
        touch(&deployed.join("logs/run.log"), "user data");

        let protected = vec![PathBuf::from("output"), PathBuf::from("logs")];
        let stats = mirror_sync(&snapshot, &deployed, &protected).unwrap();

        assert_eq!(std::fs::read_to_string(deployed.join("main.py")).unwrap(), "new");
        assert!(deployed.join("lib/util.py").is_file());
        assert!(!deployed.join("obsolete.py").exists());
        assert_eq!(
            std::fs::read_to_string(deployed.join("output/render.png")).unwrap(),
            "user data"
        );
        assert!(deployed.join("logs/run.log").is_file());
        // The marker is never written by the sync itself.
        assert!(!deployed.join(VERSION_MARKER).exists());
        assert!(stats.files_copied >= 2);
        assert!(stats.files_removed >= 2);
    }

    #[test]
    fn nested_protected_path_keeps_only_that_branch() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = tmp.path().join("snapshot");
        touch(&snapshot.join("a.py"), "x");

        let deployed = tmp.path().join("deployed");
        touch(&deployed.join("data/keep/saved.dat"), "keep");
        touch(&deployed.join("data/tmp/scratch.dat"), "drop");

        let protected = vec![PathBuf::from("data/keep")];
        mirror_sync(&snapshot, &deployed, &protected).unwrap();

        assert!(deployed.join("data/keep/saved.dat").is_file());
        assert!(!deployed.join("data/tmp").exists());
        assert!(deployed.join("a.py").is_file());
    }
}
