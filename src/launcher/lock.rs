//! Deployment lock for concurrent launches.
//!
//! An advisory exclusive lock on a well-known file next to the deployed
//! copy. Acquisition is non-blocking with a bounded retry loop; the OS
//! releases the lock when the holder exits, crashed or not, so a stale
//! lock cannot wedge future launches.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Lock file name, placed next to the deployed copy.
pub const LOCK_FILE: &str = ".studio.lock";

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// A held deployment lock. Released on drop.
#[cfg(unix)]
pub struct DeployLock {
    _flock: nix::fcntl::Flock<std::fs::File>,
    path: PathBuf,
}

#[cfg(unix)]
impl DeployLock {
    /// Acquires the lock for the deployed copy at `deployed`, waiting up
    /// to `timeout` for a concurrent holder to finish.
    pub fn acquire(deployed: &Path, timeout: Duration) -> Result<Self> {
        let parent = deployed.parent().unwrap_or(Path::new("/"));
        std::fs::create_dir_all(parent).fs_context("creating deployment directory", parent)?;
        let path = parent.join(LOCK_FILE);

        let deadline = Instant::now() + timeout;
        loop {
            let file = std::fs::File::options()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&path)
                .fs_context("opening deployment lock", &path)?;

            match nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusiveNonblock) {
                Ok(mut flock) => {
                    // Best-effort holder pid, for diagnostics only.
                    let _ = writeln!(flock, "{}", std::process::id());
                    let _ = flock.flush();
                    return Ok(Self {
                        _flock: flock,
                        path,
                    });
                }
                Err((_file, errno)) if errno == nix::errno::Errno::EWOULDBLOCK => {
                    if Instant::now() >= deadline {
                        return Err(Error::LockContention(path));
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err((_file, errno)) => {
                    return Err(Error::Sync(format!(
                        "locking {} failed: {errno}",
                        path.display()
                    )));
                }
            }
        }
    }

    /// Path of the held lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
