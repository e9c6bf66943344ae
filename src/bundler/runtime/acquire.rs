//! Runtime distribution acquisition.
//!
//! Prefers a local pre-installed distribution; otherwise downloads the
//! versioned installer package and expands its payload. Either way the
//! result is a directory tree containing `bin/python3` plus the original
//! absolute install prefix its binaries were linked against.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    settings::RuntimeSettings,
    tools::PackageExpander,
    utils::http,
};
use std::path::{Path, PathBuf};

/// An acquired distribution, ready to copy into the bundle.
pub struct AcquiredRuntime {
    /// Root of the distribution tree (contains `bin/python3`).
    pub home: PathBuf,
    /// Absolute install prefix baked into the distribution's binaries.
    pub prefix: String,
    /// Keeps downloaded payloads alive until the copy completes.
    _staging: Option<tempfile::TempDir>,
}

/// Acquires a runtime distribution per the configured preference order.
pub async fn acquire(
    settings: &RuntimeSettings,
    expander: &dyn PackageExpander,
) -> Result<AcquiredRuntime> {
    if let Some(home) = &settings.source_home {
        return acquire_local(home, settings);
    }
    acquire_download(settings, expander).await
}

fn acquire_local(home: &Path, settings: &RuntimeSettings) -> Result<AcquiredRuntime> {
    let interpreter = home.join("bin").join("python3");
    if !interpreter.is_file() {
        return Err(Error::Acquisition(format!(
            "local distribution at {} has no bin/python3",
            home.display()
        )));
    }

    let prefix = match &settings.install_prefix {
        Some(p) => p.clone(),
        None => home
            .canonicalize()
            .fs_context("canonicalizing runtime home", home)?
            .to_string_lossy()
            .into_owned(),
    };

    log::info!("using local runtime distribution at {}", home.display());
    Ok(AcquiredRuntime {
        home: home.to_path_buf(),
        prefix,
        _staging: None,
    })
}

async fn acquire_download(
    settings: &RuntimeSettings,
    expander: &dyn PackageExpander,
) -> Result<AcquiredRuntime> {
    let version = &settings.requested_version;
    let url = format!("https://www.python.org/ftp/python/{version}/python-{version}-macos11.pkg");

    let bytes = http::download(&url).await?;

    let staging = tempfile::tempdir()
        .map_err(|e| Error::Acquisition(format!("failed to create staging directory: {e}")))?;
    let pkg_path = staging.path().join("runtime.pkg");
    tokio::fs::write(&pkg_path, &bytes)
        .await
        .fs_context("writing downloaded package", &pkg_path)?;

    let expanded = staging.path().join("expanded");
    expander.expand(&pkg_path, &expanded)?;

    let home = find_payload_home(&expanded).ok_or_else(|| {
        Error::Acquisition(format!(
            "expanded package at {} contains no interpreter payload",
            expanded.display()
        ))
    })?;

    let minor = detect_minor_version(&home)?;
    let prefix = match &settings.install_prefix {
        Some(p) => p.clone(),
        None => format!("/Library/Frameworks/Python.framework/Versions/{minor}"),
    };

    log::info!(
        "downloaded runtime {} ({} payload at {})",
        version,
        minor,
        home.display()
    );
    Ok(AcquiredRuntime {
        home,
        prefix,
        _staging: Some(staging),
    })
}

/// Locates the interpreter payload inside an expanded installer package.
fn find_payload_home(expanded: &Path) -> Option<PathBuf> {
    walkdir::WalkDir::new(expanded)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .find(|dir| dir.join("bin").join("python3").is_file())
}

/// Reads the runtime's `X.Y` version back from the copied tree itself.
///
/// The acquired point version may differ from the requested one, so the
/// version is always detected from the `lib/pythonX.Y` directory, never
/// hard-coded.
pub fn detect_minor_version(home: &Path) -> Result<String> {
    let lib_dir = home.join("lib");
    let entries = std::fs::read_dir(&lib_dir).map_err(|e| {
        Error::Acquisition(format!(
            "no readable lib directory under {}: {e}",
            home.display()
        ))
    })?;

    for entry in entries.flatten() {
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if let Some(version) = name.strip_prefix("python") {
                if version.starts_with('3') && version.contains('.') {
                    return Ok(version.to_string());
                }
            }
        }
    }

    Err(Error::Acquisition(format!(
        "no lib/pythonX.Y directory under {}",
        home.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_version_from_lib_directory_name() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("lib/python3.12")).unwrap();
        std::fs::create_dir_all(tmp.path().join("lib/pkgconfig")).unwrap();
        assert_eq!(detect_minor_version(tmp.path()).unwrap(), "3.12");
    }

    #[test]
    fn missing_lib_directory_is_an_acquisition_failure() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            detect_minor_version(tmp.path()),
            Err(Error::Acquisition(_))
        ));
    }

    #[test]
    fn payload_home_requires_an_interpreter() {
        let tmp = tempfile::tempdir().unwrap();
        let payload = tmp.path().join("pkg/Payload/Versions/3.12");
        std::fs::create_dir_all(payload.join("bin")).unwrap();
        assert!(find_payload_home(tmp.path()).is_none());

        std::fs::write(payload.join("bin/python3"), b"").unwrap();
        assert_eq!(find_payload_home(tmp.path()).unwrap(), payload);
    }
}
