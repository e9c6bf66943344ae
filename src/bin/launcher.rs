//! Studio launcher.
//!
//! Installed as the bundle entry point (`Contents/MacOS/<Product>`).
//! Reconciles the per-user deployed copy of the embedded source tree with
//! the shipped bundle, then replaces itself with the compiled shell
//! binary. Any reconciliation failure aborts this launch attempt; stale
//! code is never run.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use studio_bundler::bundler::error::{Error, ErrorExt, Result};
use studio_bundler::bundler::layout::BundleLayout;
use studio_bundler::bundler::stages::plist;
use studio_bundler::launcher::{self, ReconcileOutcome, Reconciler};

fn main() {
    env_logger::init();

    let err = match launch() {
        Ok(err) => err, // exec only returns on failure
        Err(e) => e,
    };
    eprintln!("launch failed: {err}");
    std::process::exit(1);
}

/// Reconciles and execs. Returns only when the final exec failed.
fn launch() -> Result<Error> {
    let bundle = locate_bundle()?;
    let layout = BundleLayout::from_root(bundle);

    let info_plist = layout.info_plist();
    let product = plist::read_string(&info_plist, "CFBundleName")?;
    let shell = plist::read_string(&info_plist, plist::SHELL_EXECUTABLE_KEY)?;
    let protected: Vec<PathBuf> = plist::read_string_array(&info_plist, plist::PROTECTED_PATHS_KEY)?
        .into_iter()
        .map(PathBuf::from)
        .collect();

    let app_data = dirs::data_dir()
        .ok_or_else(|| Error::Sync("no per-user data directory available".into()))?
        .join(&product);
    let deployed = app_data.join("repo");

    let reconciler = Reconciler::new(layout.repo_dir(), deployed.clone(), protected);
    let outcome = reconciler.run()?;
    log_outcome(&app_data, &outcome);

    let entry = layout.macos_dir().join(&shell);
    let envs = launch_env(&layout, &app_data, &deployed);
    Ok(launcher::exec_entry(&entry, &envs))
}

/// The bundle root, three levels above the running executable
/// (`<Product>.app/Contents/MacOS/<Product>`).
fn locate_bundle() -> Result<PathBuf> {
    let exe = std::env::current_exe()
        .map_err(|e| Error::Sync(format!("cannot locate launcher executable: {e}")))?;
    exe.ancestors()
        .nth(3)
        .map(Path::to_path_buf)
        .filter(|root| root.join("Contents/Info.plist").is_file())
        .ok_or_else(|| {
            Error::Sync(format!(
                "{} is not inside an application bundle",
                exe.display()
            ))
        })
}

/// Environment handed to the shell binary.
fn launch_env(layout: &BundleLayout, app_data: &Path, deployed: &Path) -> Vec<(String, String)> {
    let path = format!(
        "{}:{}:{}",
        layout.helper_bin_dir().display(),
        layout.runtime_dir().join("bin").display(),
        std::env::var("PATH").unwrap_or_default()
    );
    vec![
        ("STUDIO_DIR".into(), app_data.display().to_string()),
        ("STUDIO_REPO_DIR".into(), deployed.display().to_string()),
        (
            "STUDIO_RUNTIME_HOME".into(),
            layout.runtime_dir().display().to_string(),
        ),
        (
            "PYTHONHOME".into(),
            layout.python_home().display().to_string(),
        ),
        (
            "PYTHONPATH".into(),
            layout.site_packages().display().to_string(),
        ),
        ("PYTHONNOUSERSITE".into(), "1".into()),
        ("PATH".into(), path),
    ]
}

/// Appends one line per launch to the diagnostics log. Best effort; a
/// logging failure never blocks the launch.
fn log_outcome(app_data: &Path, outcome: &ReconcileOutcome) {
    let log_dir = app_data.join("logs");
    let write = (|| -> Result<()> {
        std::fs::create_dir_all(&log_dir).fs_context("creating log directory", &log_dir)?;
        let line = format!(
            "{} state={:?} copied={} removed={}\n",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            outcome.initial_state,
            outcome.files_copied,
            outcome.files_removed
        );
        use std::io::Write;
        let path = log_dir.join("launcher.log");
        let mut file = std::fs::File::options()
            .create(true)
            .append(true)
            .open(&path)
            .fs_context("opening launcher log", &path)?;
        file.write_all(line.as_bytes())
            .fs_context("appending launcher log", &path)?;
        Ok(())
    })();
    if let Err(e) = write {
        log::warn!("could not record launch outcome: {e}");
    }
}
