//! Snapshot stage: embed the source tree and its version marker.
//!
//! Copies the project tree into `Contents/Resources/repo`, excluding
//! transient directories and the bundle output itself, then writes the
//! `.version` marker. The marker goes in last so a snapshot that failed
//! partway never carries a valid version.

use crate::bundler::{
    error::{ErrorExt, Result},
    layout::BundleLayout,
    settings::Settings,
    utils::fs,
};
use std::path::PathBuf;

/// Runs the snapshot stage.
pub async fn run(settings: &Settings, layout: &BundleLayout) -> Result<()> {
    let repo_dir = layout.repo_dir();
    fs::create_dir_all(&repo_dir, true).await?;

    // If the out dir sits inside the project, keep it out of the snapshot
    // so the bundle never embeds itself.
    let mut exclude_prefixes: Vec<PathBuf> = Vec::new();
    if let Ok(rel) = settings.out_dir().strip_prefix(settings.project_root()) {
        if !rel.as_os_str().is_empty() {
            exclude_prefixes.push(rel.to_path_buf());
        }
    }

    let project_root = settings.project_root().to_path_buf();
    let excludes = settings.bundle_settings().snapshot_excludes.clone();
    let dest = repo_dir.clone();
    let stats = tokio::task::spawn_blocking(move || {
        fs::copy_dir_filtered(&project_root, &dest, &excludes, &exclude_prefixes)
    })
    .await
    .map_err(|e| {
        crate::bundler::error::Error::GenericError(format!("snapshot copy task panicked: {e}"))
    })??;

    let marker = layout.repo_marker();
    std::fs::write(&marker, settings.version_string().as_bytes())
        .fs_context("writing version marker", &marker)?;

    log::info!(
        "snapshot embedded: {} files, {} directories",
        stats.files_copied,
        stats.dirs_created
    );
    Ok(())
}
