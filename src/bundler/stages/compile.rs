//! Compile stage: produce and install the executables.
//!
//! Builds the shell project in release mode (or reuses a pre-built
//! binary), then installs both executables into `Contents/MacOS/`: the
//! compiled shell binary under its own name, and the launcher as the
//! bundle entry point named after the product.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    layout::BundleLayout,
    settings::Settings,
};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs the compile stage.
pub async fn run(settings: &Settings, layout: &BundleLayout) -> Result<()> {
    let shell = match settings.prebuilt_shell() {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::GenericError(format!(
                    "pre-built shell binary not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => build_release(settings.project_root(), settings.shell_binary())?,
    };

    let macos_dir = layout.macos_dir();
    std::fs::create_dir_all(&macos_dir).fs_context("creating MacOS directory", &macos_dir)?;

    install_executable(&shell, &macos_dir.join(settings.shell_binary()))?;

    // The launcher ships alongside the build tool; the copy installed as
    // the entry point is what Finder actually starts.
    let launcher = launcher_binary()?;
    install_executable(&launcher, &layout.entry_point(settings.product_name()))?;

    Ok(())
}

/// Builds the project in release mode and returns the produced binary.
fn build_release(project_root: &Path, binary_name: &str) -> Result<PathBuf> {
    log::info!("building {binary_name} (release)");
    let output = Command::new("cargo")
        .arg("build")
        .arg("--release")
        .arg("--bin")
        .arg(binary_name)
        .current_dir(project_root)
        .output()
        .map_err(|e| Error::GenericError(format!("failed to run cargo: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::GenericError(format!(
            "release build failed:\n{}",
            stderr.trim()
        )));
    }

    let binary = project_root
        .join("target")
        .join("release")
        .join(binary_name);
    if !binary.is_file() {
        return Err(Error::GenericError(format!(
            "build succeeded but {} was not produced",
            binary.display()
        )));
    }
    Ok(binary)
}

/// Locates the launcher binary installed next to the running build tool.
fn launcher_binary() -> Result<PathBuf> {
    let current = std::env::current_exe()
        .map_err(|e| Error::GenericError(format!("cannot locate current executable: {e}")))?;
    let launcher = current.with_file_name("studio-launch");
    if !launcher.is_file() {
        return Err(Error::GenericError(format!(
            "launcher binary not found next to the build tool: {}",
            launcher.display()
        )));
    }
    Ok(launcher)
}

/// Copies an executable into place and marks it executable.
fn install_executable(from: &Path, to: &Path) -> Result<()> {
    std::fs::copy(from, to).fs_context("installing executable", from)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(to)
            .fs_context("reading executable metadata", to)?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(to, perms).fs_context("marking executable", to)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prebuilt_binary_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("no-such-binary");
        assert!(install_executable(&missing, &tmp.path().join("out")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn installed_executable_carries_exec_bit() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src-bin");
        std::fs::write(&src, b"#!/bin/sh\n").unwrap();
        let dst = tmp.path().join("dst-bin");
        install_executable(&src, &dst).unwrap();
        let mode = std::fs::metadata(&dst).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
