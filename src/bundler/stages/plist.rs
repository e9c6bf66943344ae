//! Metadata stage: Info.plist and PkgInfo.
//!
//! `CFBundleExecutable` names the launcher so Finder starts reconciliation
//! first; the compiled shell binary is recorded under the custom
//! `StudioShellExecutable` key, which the launcher reads back at start.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    layout::BundleLayout,
    settings::Settings,
};
use plist::Value;

/// Custom Info.plist key naming the compiled shell binary.
pub const SHELL_EXECUTABLE_KEY: &str = "StudioShellExecutable";

/// Custom Info.plist key listing subpaths a resync must never delete.
pub const PROTECTED_PATHS_KEY: &str = "StudioProtectedPaths";

/// Runs the metadata stage.
pub async fn run(settings: &Settings, layout: &BundleLayout) -> Result<()> {
    let contents = layout.contents();
    std::fs::create_dir_all(&contents).fs_context("creating Contents directory", &contents)?;

    let mut dict = plist::Dictionary::new();
    dict.insert(
        "CFBundleName".into(),
        Value::String(settings.product_name().into()),
    );
    dict.insert(
        "CFBundleDisplayName".into(),
        Value::String(settings.product_name().into()),
    );
    dict.insert(
        "CFBundleIdentifier".into(),
        Value::String(settings.bundle_settings().identifier.clone()),
    );
    dict.insert(
        "CFBundleExecutable".into(),
        Value::String(settings.product_name().into()),
    );
    dict.insert(
        SHELL_EXECUTABLE_KEY.into(),
        Value::String(settings.shell_binary().into()),
    );
    dict.insert("CFBundlePackageType".into(), Value::String("APPL".into()));
    dict.insert(
        "CFBundleShortVersionString".into(),
        Value::String(settings.version_string().into()),
    );
    dict.insert(
        "CFBundleVersion".into(),
        Value::String(settings.version_string().into()),
    );
    dict.insert(
        "CFBundleIconFile".into(),
        Value::String("icon.icns".into()),
    );
    dict.insert(
        PROTECTED_PATHS_KEY.into(),
        Value::Array(
            settings
                .bundle_settings()
                .protected_subpaths
                .iter()
                .map(|p| Value::String(p.to_string_lossy().into_owned()))
                .collect(),
        ),
    );
    dict.insert("NSHighResolutionCapable".into(), Value::Boolean(true));
    if let Some(min) = &settings.macos().minimum_system_version {
        dict.insert(
            "LSMinimumSystemVersion".into(),
            Value::String(min.clone()),
        );
    }

    let plist_path = layout.info_plist();
    Value::Dictionary(dict)
        .to_file_xml(&plist_path)
        .map_err(Error::from)?;

    let pkginfo = contents.join("PkgInfo");
    std::fs::write(&pkginfo, b"APPL????").fs_context("writing PkgInfo", &pkginfo)?;

    Ok(())
}

/// Reads a string value back out of an Info.plist.
pub fn read_string(plist_path: &std::path::Path, key: &str) -> Result<String> {
    let value = Value::from_file(plist_path).map_err(Error::from)?;
    value
        .as_dictionary()
        .and_then(|d| d.get(key))
        .and_then(|v| v.as_string())
        .map(String::from)
        .ok_or_else(|| {
            Error::GenericError(format!(
                "{} has no {key} entry",
                plist_path.display()
            ))
        })
}

/// Reads a string-array value back out of an Info.plist. A missing key
/// reads as empty.
pub fn read_string_array(plist_path: &std::path::Path, key: &str) -> Result<Vec<String>> {
    let value = Value::from_file(plist_path).map_err(Error::from)?;
    Ok(value
        .as_dictionary()
        .and_then(|d| d.get(key))
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_string().map(String::from))
                .collect()
        })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{BundleSettings, PackageSettings, SettingsBuilder};
    use std::path::Path;

    fn settings(tmp: &Path) -> Settings {
        SettingsBuilder::new()
            .project_root(tmp)
            .out_dir(tmp.join("dist"))
            .package_settings(PackageSettings {
                product_name: "Studio".into(),
                version: "2.1.0".into(),
                description: String::new(),
                shell_binary: "studio-shell".into(),
            })
            .bundle_settings(BundleSettings {
                identifier: "com.studio.app".into(),
                ..Default::default()
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn plist_records_launcher_and_shell_separately() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings(tmp.path());
        let layout = BundleLayout::new(&tmp.path().join("dist"), "Studio");
        run(&settings, &layout).await.unwrap();

        let plist = layout.info_plist();
        assert_eq!(read_string(&plist, "CFBundleExecutable").unwrap(), "Studio");
        assert_eq!(
            read_string(&plist, SHELL_EXECUTABLE_KEY).unwrap(),
            "studio-shell"
        );
        assert_eq!(
            read_string(&plist, "CFBundleIdentifier").unwrap(),
            "com.studio.app"
        );
        assert_eq!(
            std::fs::read(layout.contents().join("PkgInfo")).unwrap(),
            b"APPL????"
        );
        assert_eq!(
            read_string_array(&plist, PROTECTED_PATHS_KEY).unwrap(),
            vec!["output", "logs"]
        );
    }
}
