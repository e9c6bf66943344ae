//! Deployment reconciler for the launched application.
//!
//! At every launch the deployed per-user copy of the embedded source tree
//! is reconciled with the shipped bundle before the real entry point runs.
//! The observable guarantee is simple: after a successful launch, the code
//! that runs is exactly the code that shipped, while user-generated data
//! under the protected subpaths survives every update.
//!
//! State is derived entirely from the filesystem by comparing version
//! markers byte-for-byte; there is no database and nothing to migrate.

pub mod lock;
pub mod sync;

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    layout::VERSION_MARKER,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use lock::DeployLock;
pub use sync::{SyncStats, mirror_sync};

/// Relationship between the shipped snapshot and the deployed copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeployState {
    /// First launch: nothing deployed yet.
    NoDeployedCopy,
    /// Markers match byte-for-byte; nothing to do.
    InSync,
    /// Markers differ, or the deployed marker is missing. A missing
    /// marker means a previous sync died partway, so the copy cannot be
    /// trusted regardless of its contents.
    Stale,
}

/// Outcome of a reconciliation run.
#[derive(Clone, Copy, Debug)]
pub struct ReconcileOutcome {
    /// State observed before any mutation.
    pub initial_state: DeployState,
    /// Files copied from the snapshot.
    pub files_copied: usize,
    /// Entries removed from the deployed copy.
    pub files_removed: usize,
}

/// Reconciles a deployed copy with the bundled snapshot.
pub struct Reconciler {
    snapshot: PathBuf,
    deployed: PathBuf,
    protected: Vec<PathBuf>,
    lock_timeout: Duration,
}

impl Reconciler {
    /// Default budget for waiting on a concurrent launch.
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a reconciler between a bundled snapshot and a deployed copy.
    pub fn new(snapshot: PathBuf, deployed: PathBuf, protected: Vec<PathBuf>) -> Self {
        Self {
            snapshot,
            deployed,
            protected,
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Overrides the lock wait budget.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Classifies the deployed copy against the bundled snapshot.
    pub fn state(&self) -> Result<DeployState> {
        let bundled = self.bundled_version()?;

        if !self.deployed.is_dir() {
            return Ok(DeployState::NoDeployedCopy);
        }
        match read_marker(&self.deployed) {
            Some(deployed) if deployed == bundled => Ok(DeployState::InSync),
            _ => Ok(DeployState::Stale),
        }
    }

    /// Reconciles, returning once the deployed copy is trustworthy.
    ///
    /// The in-sync path performs zero filesystem mutations and takes no
    /// lock. Any error leaves the marker absent, so the next launch
    /// observes `Stale` and retries; stale code is never run.
    pub fn run(&self) -> Result<ReconcileOutcome> {
        let initial_state = self.state()?;
        if initial_state == DeployState::InSync {
            return Ok(ReconcileOutcome {
                initial_state,
                files_copied: 0,
                files_removed: 0,
            });
        }

        let _lock = DeployLock::acquire(&self.deployed, self.lock_timeout)?;

        // A concurrent launch may have finished the sync while this one
        // waited on the lock.
        if self.state()? == DeployState::InSync {
            return Ok(ReconcileOutcome {
                initial_state,
                files_copied: 0,
                files_removed: 0,
            });
        }

        let bundled = self.bundled_version()?;
        let stats = mirror_sync(&self.snapshot, &self.deployed, &self.protected)?;

        // Marker last: written only after the sync completed in full.
        let marker = self.deployed.join(VERSION_MARKER);
        std::fs::write(&marker, bundled.as_bytes())
            .fs_context("writing deployed version marker", &marker)?;

        log::info!(
            "deployed copy synced to {bundled}: {} copied, {} removed",
            stats.files_copied,
            stats.files_removed
        );
        Ok(ReconcileOutcome {
            initial_state,
            files_copied: stats.files_copied,
            files_removed: stats.files_removed,
        })
    }

    /// The bundled marker. Its absence means the bundle itself is broken.
    fn bundled_version(&self) -> Result<String> {
        read_marker(&self.snapshot).ok_or_else(|| {
            Error::Sync(format!(
                "bundled snapshot at {} has no version marker",
                self.snapshot.display()
            ))
        })
    }
}

fn read_marker(dir: &Path) -> Option<String> {
    std::fs::read_to_string(dir.join(VERSION_MARKER)).ok()
}

/// Replaces the current process with the real entry point.
///
/// Only returns on failure.
#[cfg(unix)]
pub fn exec_entry(entry: &Path, envs: &[(String, String)]) -> Error {
    use std::os::unix::process::CommandExt;

    let mut cmd = std::process::Command::new(entry);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    let err = cmd.exec();
    Error::Sync(format!("exec of {} failed: {err}", entry.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_with(version: &str, dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("main.py"), format!("# {version}")).unwrap();
        std::fs::write(dir.join(VERSION_MARKER), version).unwrap();
    }

    #[test]
    fn first_launch_deploys_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = tmp.path().join("snapshot");
        bundle_with("1.0.0", &snapshot);
        let deployed = tmp.path().join("app/repo");

        let reconciler = Reconciler::new(snapshot, deployed.clone(), vec![]);
        let outcome = reconciler.run().unwrap();

        assert_eq!(outcome.initial_state, DeployState::NoDeployedCopy);
        assert!(deployed.join("main.py").is_file());
        assert_eq!(
            std::fs::read_to_string(deployed.join(VERSION_MARKER)).unwrap(),
            "1.0.0"
        );
    }

    #[test]
    fn matching_markers_touch_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = tmp.path().join("snapshot");
        bundle_with("1.0.0", &snapshot);
        let deployed = tmp.path().join("app/repo");

        let reconciler = Reconciler::new(snapshot, deployed.clone(), vec![]);
        reconciler.run().unwrap();

        // A local edit without a marker change is deliberately left alone.
        std::fs::write(deployed.join("main.py"), "locally modified").unwrap();
        let outcome = reconciler.run().unwrap();

        assert_eq!(outcome.initial_state, DeployState::InSync);
        assert_eq!(outcome.files_copied, 0);
        assert_eq!(
            std::fs::read_to_string(deployed.join("main.py")).unwrap(),
            "locally modified"
        );
    }

    #[test]
    fn version_bump_resyncs_and_preserves_protected() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = tmp.path().join("snapshot");
        bundle_with("1.0.0", &snapshot);
        let deployed = tmp.path().join("app/repo");
        let protected = vec![PathBuf::from("output")];

        Reconciler::new(snapshot.clone(), deployed.clone(), protected.clone())
            .run()
            .unwrap();
        std::fs::create_dir_all(deployed.join("output")).unwrap();
        std::fs::write(deployed.join("output/user.dat"), "mine").unwrap();

        bundle_with("2.0.0", &snapshot);
        let outcome = Reconciler::new(snapshot, deployed.clone(), protected)
            .run()
            .unwrap();

        assert_eq!(outcome.initial_state, DeployState::Stale);
        assert_eq!(
            std::fs::read_to_string(deployed.join(VERSION_MARKER)).unwrap(),
            "2.0.0"
        );
        assert_eq!(
            std::fs::read_to_string(deployed.join("output/user.dat")).unwrap(),
            "mine"
        );
    }

    #[test]
    fn missing_deployed_marker_forces_resync() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = tmp.path().join("snapshot");
        bundle_with("1.0.0", &snapshot);
        let deployed = tmp.path().join("app/repo");

        let reconciler = Reconciler::new(snapshot, deployed.clone(), vec![]);
        reconciler.run().unwrap();

        // Simulate a sync that died before the marker was written.
        std::fs::remove_file(deployed.join(VERSION_MARKER)).unwrap();
        assert_eq!(reconciler.state().unwrap(), DeployState::Stale);

        let outcome = reconciler.run().unwrap();
        assert_eq!(outcome.initial_state, DeployState::Stale);
        assert!(deployed.join(VERSION_MARKER).is_file());
    }

    #[test]
    fn corrupt_bundle_without_marker_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = tmp.path().join("snapshot");
        std::fs::create_dir_all(&snapshot).unwrap();
        std::fs::write(snapshot.join("main.py"), "x").unwrap();

        let reconciler = Reconciler::new(snapshot, tmp.path().join("repo"), vec![]);
        assert!(matches!(reconciler.run(), Err(Error::Sync(_))));
    }
}
