//! Project metadata discovery from the shell project's Cargo.toml.
//!
//! The manifest is the single source of truth for the bundle version: the
//! `[package]` section supplies name, version, and description, and the
//! `[package.metadata.bundle]` table supplies everything bundle-specific
//! (identifier, icon, protected paths, runtime packages, helper tools).

use crate::bundler::{BundleSettings, PackageSettings, RuntimeSettings};
use crate::error::{BundlerError, CliError, Result};
use std::path::{Path, PathBuf};

/// Everything the pipeline needs out of the project manifest.
pub struct ProjectManifest {
    /// Package metadata (`[package]` section).
    pub package: PackageSettings,

    /// Bundle content configuration (`[package.metadata.bundle]`).
    pub bundle: BundleSettings,

    /// Embedded runtime configuration (`[package.metadata.bundle.python]`).
    pub runtime: RuntimeSettings,
}

/// Loads the project manifest with a single read and parse.
pub fn load_manifest(project_root: &Path) -> Result<ProjectManifest> {
    let manifest_path = project_root.join("Cargo.toml");
    let manifest = std::fs::read_to_string(&manifest_path).map_err(|e| {
        BundlerError::Cli(CliError::ExecutionFailed {
            command: "read_cargo_toml".to_string(),
            reason: format!("Failed to read {}: {}", manifest_path.display(), e),
        })
    })?;

    let toml_value: toml::Value = toml::from_str(&manifest)?;

    let package_table = toml_value.get("package").ok_or_else(|| {
        BundlerError::Cli(CliError::InvalidArguments {
            reason: "No [package] section in Cargo.toml".to_string(),
        })
    })?;

    let name = package_table
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            BundlerError::Cli(CliError::InvalidArguments {
                reason: "Missing 'name' in [package]".to_string(),
            })
        })?
        .to_string();

    // A project with no declared version gets the sentinel, which never
    // matches a deployed marker and therefore always forces a resync.
    let version = match package_table.get("version").and_then(|v| v.as_str()) {
        Some(v) => {
            if semver::Version::parse(v).is_err() {
                log::warn!("version {v:?} in {} is not semver", manifest_path.display());
            }
            v.to_string()
        }
        None => {
            log::warn!(
                "no version in {}; using {:?}",
                manifest_path.display(),
                PackageSettings::UNKNOWN_VERSION
            );
            PackageSettings::UNKNOWN_VERSION.to_string()
        }
    };

    let description = package_table
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    // [[bin]] name first, package name as fallback.
    let shell_binary = toml_value
        .get("bin")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|first| first.get("name"))
        .and_then(|v| v.as_str())
        .map(String::from)
        .unwrap_or_else(|| name.clone());

    let bundle_table = toml_value
        .get("package")
        .and_then(|p| p.get("metadata"))
        .and_then(|m| m.get("bundle"));

    let mut bundle = parse_bundle_settings(bundle_table);
    let runtime = parse_runtime_settings(bundle_table);

    let product_name = bundle_table
        .and_then(|t| t.get("product_name"))
        .and_then(|v| v.as_str())
        .map(String::from)
        .unwrap_or_else(|| name.clone());

    discover_icon(project_root, &mut bundle);

    Ok(ProjectManifest {
        package: PackageSettings {
            product_name,
            version,
            description,
            shell_binary,
        },
        bundle,
        runtime,
    })
}

fn parse_bundle_settings(table: Option<&toml::Value>) -> BundleSettings {
    let mut settings = BundleSettings::default();
    let Some(table) = table else {
        return settings;
    };

    if let Some(identifier) = table.get("identifier").and_then(|v| v.as_str()) {
        settings.identifier = identifier.to_string();
    }
    if let Some(entitlements) = table.get("entitlements").and_then(|v| v.as_str()) {
        settings.entitlements = Some(PathBuf::from(entitlements));
    }
    if let Some(excludes) = table.get("snapshot_excludes").and_then(|v| v.as_array()) {
        settings
            .snapshot_excludes
            .extend(excludes.iter().filter_map(|v| v.as_str().map(String::from)));
    }
    if let Some(protected) = table.get("protected_paths").and_then(|v| v.as_array()) {
        settings.protected_subpaths = protected
            .iter()
            .filter_map(|v| v.as_str().map(PathBuf::from))
            .collect();
    }
    if let Some(tools) = table.get("helper_tools").and_then(|v| v.as_array()) {
        settings.helper_tools = tools
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
    }

    settings
}

fn parse_runtime_settings(table: Option<&toml::Value>) -> RuntimeSettings {
    let mut settings = RuntimeSettings::default();
    let Some(python) = table.and_then(|t| t.get("python")) else {
        return settings;
    };

    if let Some(version) = python.get("version").and_then(|v| v.as_str()) {
        settings.requested_version = version.to_string();
    }
    if let Some(packages) = python.get("packages").and_then(|v| v.as_array()) {
        settings.packages = packages
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
    }
    if let Some(imports) = python.get("critical_imports").and_then(|v| v.as_array()) {
        settings.critical_imports = imports
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
    }

    settings
}

/// Finds the application icon at its conventional location.
fn discover_icon(project_root: &Path, settings: &mut BundleSettings) {
    let icon = project_root.join("assets").join("icon.png");
    if icon.is_file() {
        log::debug!("found application icon: {}", icon.display());
        settings.icon = Some(icon);
    } else {
        log::debug!("no icon at {}", icon.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &Path, contents: &str) {
        std::fs::write(dir.join("Cargo.toml"), contents).unwrap();
    }

    #[test]
    fn manifest_supplies_version_and_bundle_tables() {
        let tmp = tempfile::tempdir().unwrap();
        write_manifest(
            tmp.path(),
            r#"
[package]
name = "studio-shell"
version = "1.2.3"
description = "Studio desktop shell"

[[bin]]
name = "studio-shell"

[package.metadata.bundle]
product_name = "Studio"
identifier = "com.studio.app"
protected_paths = ["output", "logs"]
helper_tools = ["ffmpeg"]

[package.metadata.bundle.python]
version = "3.12.4"
packages = ["numpy"]
critical_imports = ["numpy"]
"#,
        );

        let manifest = load_manifest(tmp.path()).unwrap();
        assert_eq!(manifest.package.product_name, "Studio");
        assert_eq!(manifest.package.version, "1.2.3");
        assert_eq!(manifest.package.shell_binary, "studio-shell");
        assert_eq!(manifest.bundle.identifier, "com.studio.app");
        assert_eq!(manifest.bundle.helper_tools, vec!["ffmpeg"]);
        assert_eq!(manifest.runtime.packages, vec!["numpy"]);
    }

    #[test]
    fn missing_version_gets_the_sentinel() {
        let tmp = tempfile::tempdir().unwrap();
        write_manifest(
            tmp.path(),
            "[package]\nname = \"studio-shell\"\n",
        );

        let manifest = load_manifest(tmp.path()).unwrap();
        assert_eq!(manifest.package.version, PackageSettings::UNKNOWN_VERSION);
    }

    #[test]
    fn missing_manifest_is_a_cli_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_manifest(tmp.path()).is_err());
    }
}
