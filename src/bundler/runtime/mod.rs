//! Embedded runtime assembly.
//!
//! Produces a working, isolated Python runtime under the bundle: acquire a
//! distribution, copy it in, relocate its load paths, generate the
//! bootstrap wrapper from the detected version, bootstrap pip, install the
//! declared dependency set into the bundle-scoped package directory, and
//! verify every critical import. There is no silent partial embed: any
//! verification failure fails the build.

pub mod acquire;
pub mod relocate;

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    layout::BundleLayout,
    settings::Settings,
    stages::wrappers,
    tools::Toolset,
    utils::fs,
};
use std::path::{Path, PathBuf};

pub use acquire::{AcquiredRuntime, detect_minor_version};
pub use relocate::{RelocationReport, relocate_tree, verify_relocated};

/// A fully embedded, verified runtime.
#[derive(Debug)]
pub struct EmbeddedRuntime {
    /// Detected `X.Y` version of the embedded interpreter.
    pub version: String,
    /// Relocation outcome for the copied tree.
    pub relocation: RelocationReport,
}

/// Embeds the runtime into the bundle.
pub async fn embed(
    settings: &Settings,
    tools: &Toolset,
    layout: &BundleLayout,
) -> Result<EmbeddedRuntime> {
    // 1. Acquire a distribution.
    let acquired = acquire::acquire(settings.runtime(), tools.expander.as_ref()).await?;

    // 2. Copy into the bundle.
    let python_home = layout.python_home();
    fs::create_dir_all(&python_home, true).await?;
    fs::copy_dir(&acquired.home, &python_home).await?;

    // 3. Relocate load paths and ad-hoc re-sign patched binaries.
    let relocation = relocate_tree(
        &python_home,
        &acquired.prefix,
        tools.patcher.as_ref(),
        tools.signer.as_ref(),
    )?;

    let offenders = verify_relocated(&python_home, &acquired.prefix)?;
    for (path, reference) in &offenders {
        log::warn!(
            "unrelocated reference remains in {}: {}",
            path.display(),
            reference
        );
    }

    // 4. Bootstrap wrapper, parameterized by the detected version.
    let version = detect_minor_version(&python_home)?;
    wrappers::write_python_wrapper(layout, &version)?;

    // 5-6. Bootstrap pip and install the declared set, isolated.
    let site_packages = layout.site_packages();
    fs::create_dir_all(&site_packages, true).await?;
    install_packages(settings, tools, &python_home, &site_packages, &version)?;

    // 7. Smoke-test every critical import.
    verify_imports(settings, tools, &python_home, &site_packages)?;

    log::info!(
        "embedded runtime {} with {} packages",
        version,
        settings.runtime().packages.len()
    );
    Ok(EmbeddedRuntime {
        version,
        relocation,
    })
}

fn interpreter_env(python_home: &Path, site_packages: &Path) -> Vec<(String, String)> {
    vec![
        (
            "PYTHONHOME".to_string(),
            python_home.to_string_lossy().into_owned(),
        ),
        (
            "PYTHONPATH".to_string(),
            site_packages.to_string_lossy().into_owned(),
        ),
        ("PYTHONNOUSERSITE".to_string(), "1".to_string()),
    ]
}

/// Installs the declared dependency set into the isolated package
/// directory, falling back to the cached known-good set on failure.
fn install_packages(
    settings: &Settings,
    tools: &Toolset,
    python_home: &Path,
    site_packages: &Path,
    version: &str,
) -> Result<()> {
    let packages = &settings.runtime().packages;
    if packages.is_empty() {
        log::debug!("no runtime packages declared");
        return Ok(());
    }

    let interpreter = python_home.join("bin").join("python3");
    let envs = interpreter_env(python_home, site_packages);

    let bootstrap = tools.python.run_python(
        &interpreter,
        &["-m".into(), "ensurepip".into(), "--upgrade".into()],
        &envs,
    );

    let install = bootstrap.and_then(|_| {
        let mut args: Vec<String> = vec![
            "-m".into(),
            "pip".into(),
            "install".into(),
            "--no-warn-script-location".into(),
            "--target".into(),
            site_packages.to_string_lossy().into_owned(),
        ];
        args.extend(packages.iter().cloned());
        tools.python.run_python(&interpreter, &args, &envs)
    });

    match install {
        Ok(_) => {
            // Refresh the known-good cache for the next offline build.
            if let Err(e) = pack_cache(site_packages, &cache_archive(version)) {
                log::warn!("could not refresh package cache: {e}");
            }
            Ok(())
        }
        Err(e) => {
            let archive = cache_archive(version);
            if archive.is_file() {
                log::warn!(
                    "dependency install failed ({e}); restoring cached package set from {}",
                    archive.display()
                );
                unpack_cache(&archive, site_packages)
            } else {
                Err(Error::DependencyInstall(format!(
                    "{e} (no cached package set at {})",
                    archive.display()
                )))
            }
        }
    }
}

/// Runs a verification import of each critical dependency.
fn verify_imports(
    settings: &Settings,
    tools: &Toolset,
    python_home: &Path,
    site_packages: &Path,
) -> Result<()> {
    let interpreter = python_home.join("bin").join("python3");
    let envs = interpreter_env(python_home, site_packages);

    for module in &settings.runtime().critical_imports {
        tools
            .python
            .run_python(
                &interpreter,
                &["-c".into(), format!("import {module}")],
                &envs,
            )
            .map_err(|e| {
                Error::DependencyInstall(format!("verification import of {module} failed: {e}"))
            })?;
        log::debug!("verified import: {module}");
    }
    Ok(())
}

/// Location of the known-good package-set archive for a runtime version.
pub fn cache_archive(version: &str) -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("studio-bundler")
        .join(format!("site-packages-{version}.tar.gz"))
}

/// Archives a package directory as the known-good set.
pub fn pack_cache(site_packages: &Path, archive: &Path) -> Result<()> {
    if let Some(parent) = archive.parent() {
        std::fs::create_dir_all(parent).fs_context("creating cache directory", parent)?;
    }
    let file = std::fs::File::create(archive).fs_context("creating cache archive", archive)?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(".", site_packages)
        .fs_context("archiving package set", site_packages)?;
    builder
        .into_inner()
        .and_then(|enc| enc.finish())
        .fs_context("finishing cache archive", archive)?;
    Ok(())
}

/// Restores a cached package set into the isolated package directory.
pub fn unpack_cache(archive: &Path, site_packages: &Path) -> Result<()> {
    let file = std::fs::File::open(archive).fs_context("opening cache archive", archive)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut tarball = tar::Archive::new(decoder);
    tarball
        .unpack(site_packages)
        .fs_context("restoring cached package set", site_packages)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_roundtrip_restores_files() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("site-packages");
        std::fs::create_dir_all(src.join("pkg")).unwrap();
        std::fs::write(src.join("pkg/__init__.py"), b"VERSION = 1\n").unwrap();

        let archive = tmp.path().join("cache/site-packages-3.12.tar.gz");
        pack_cache(&src, &archive).unwrap();
        assert!(archive.is_file());

        let restored = tmp.path().join("restored");
        std::fs::create_dir_all(&restored).unwrap();
        unpack_cache(&archive, &restored).unwrap();
        assert_eq!(
            std::fs::read(restored.join("pkg/__init__.py")).unwrap(),
            b"VERSION = 1\n"
        );
    }
}
