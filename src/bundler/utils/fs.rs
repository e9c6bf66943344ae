//! File system utilities for bundling.
//!
//! Provides safe file operations with automatic directory creation,
//! symlink preservation, and exclusion-aware recursive copies. The copy
//! core is synchronous so the launcher can use it directly; the pipeline
//! calls the async wrappers which offload to the blocking pool.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};
use tokio::fs;

/// Counters for a recursive copy, used to assert no-op properties.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Regular files copied.
    pub files_copied: usize,
    /// Directories created at the destination.
    pub dirs_created: usize,
}

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        // Try removal, ignore NotFound (idempotent)
        match fs::remove_dir_all(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    // create_dir_all is already idempotent - succeeds even if dir exists
    Ok(fs::create_dir_all(path).await?)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e.into()),
    }
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(Error::GenericError(format!("{from:?} does not exist")));
    }
    if !from.is_file() {
        return Err(Error::GenericError(format!("{from:?} is not a file")));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir).await?;
    }
    fs::copy(from, to).await?;
    Ok(())
}

/// Makes a symbolic link.
#[cfg(unix)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Recursively copies a directory, preserving symlinks.
///
/// Offloads the traversal to the blocking pool. Parent directories of the
/// destination are created as needed.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    // Validate in async context (cheap, doesn't need spawn_blocking)
    if !from.exists() {
        return Err(Error::GenericError(format!("{from:?} does not exist")));
    }
    if !from.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a directory")));
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    tokio::task::spawn_blocking(move || copy_dir_filtered(&from, &to, &[], &[]).map(|_| ()))
        .await
        .map_err(|e| Error::GenericError(format!("directory copy task panicked: {e}")))?
}

/// Recursively copies a directory, skipping excluded entries.
///
/// * `exclude_names`: directory or file names skipped wherever they occur
///   (e.g. `target`, `.git`).
/// * `exclude_prefixes`: relative paths under `from` skipped together with
///   everything beneath them.
///
/// Symlinks are recreated, not followed. Returns copy counters.
pub fn copy_dir_filtered(
    from: &Path,
    to: &Path,
    exclude_names: &[String],
    exclude_prefixes: &[PathBuf],
) -> Result<CopyStats> {
    if !from.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a directory")));
    }
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).fs_context("creating destination parent", parent)?;
    }

    let mut stats = CopyStats::default();
    let mut walker = walkdir::WalkDir::new(from).follow_links(false).into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        let rel_path = entry.path().strip_prefix(from)?;
        if rel_path.as_os_str().is_empty() {
            continue;
        }

        let excluded_name = entry
            .file_name()
            .to_str()
            .is_some_and(|name| exclude_names.iter().any(|ex| ex == name));
        let excluded_prefix = exclude_prefixes.iter().any(|p| rel_path.starts_with(p));

        if excluded_name || excluded_prefix {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        let dest_path = to.join(rel_path);
        if entry.file_type().is_symlink() {
            let target = std::fs::read_link(entry.path())
                .fs_context("reading symlink", entry.path())?;
            symlink(&target, &dest_path).fs_context("recreating symlink", &dest_path)?;
        } else if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest_path)
                .fs_context("creating directory", &dest_path)?;
            stats.dirs_created += 1;
        } else {
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent).fs_context("creating parent", parent)?;
            }
            std::fs::copy(entry.path(), &dest_path)
                .fs_context("copying file", entry.path())?;
            stats.files_copied += 1;
        }
    }

    Ok(stats)
}

/// Writes an executable script, with flush guaranteed before permissions
/// are set.
pub fn write_executable(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).fs_context("creating wrapper directory", parent)?;
    }
    {
        let mut file =
            std::fs::File::create(path).fs_context("creating wrapper script", path)?;
        file.write_all(contents.as_bytes())
            .fs_context("writing wrapper script", path)?;
        file.flush().fs_context("flushing wrapper script", path)?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .fs_context("reading wrapper metadata", path)?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms)
            .fs_context("marking wrapper executable", path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn filtered_copy_skips_excluded_names_and_prefixes() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        touch(&src.join("keep.txt"));
        touch(&src.join("target/drop.bin"));
        touch(&src.join("output/user.dat"));
        touch(&src.join("nested/keep2.txt"));

        let dst = tmp.path().join("dst");
        let stats = copy_dir_filtered(
            &src,
            &dst,
            &["target".to_string()],
            &[PathBuf::from("output")],
        )
        .unwrap();

        assert!(dst.join("keep.txt").is_file());
        assert!(dst.join("nested/keep2.txt").is_file());
        assert!(!dst.join("target").exists());
        assert!(!dst.join("output").exists());
        assert_eq!(stats.files_copied, 2);
    }

    #[test]
    fn write_executable_sets_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("bin/run");
        write_executable(&script, "#!/bin/sh\nexit 0\n").unwrap();
        assert!(script.is_file());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&script).unwrap().permissions().mode();
            assert_eq!(mode & 0o755, 0o755);
        }
    }
}
