//! Process Lock File
//!
//! Runs are expected to finish before the next scheduled one starts. The lock
//! file makes an overlap fail fast instead of two runs racing on the same
//! sled database and double-notifying.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while taking the run lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error(
        "another fermentwatch run is in progress (PID {pid}); \
         if no run is active, remove the stale lock file {}",
        path.display()
    )]
    AlreadyRunning { pid: u32, path: PathBuf },

    #[error("lock file {} is held by a run that has not written its PID yet", path.display())]
    InUse { path: PathBuf },

    #[error("lock file I/O error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Lock file holding the PID of the active run. Released on drop.
#[derive(Debug)]
pub struct ProcessLock {
    lock_path: PathBuf,
    owned: bool,
}

impl ProcessLock {
    const LOCK_FILE_NAME: &'static str = ".fermentwatch.lock";

    /// A lock whose holder cannot be checked directly is trusted for this long.
    const STALE_LOCK_AGE: Duration = Duration::from_secs(3600);

    /// A lock without a readable PID may be mid-write by another run.
    const PID_WRITE_GRACE: Duration = Duration::from_secs(5);

    /// Acquire the lock in `data_dir`, creating the directory if needed.
    pub fn acquire<P: AsRef<Path>>(data_dir: P) -> Result<Self, LockError> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).map_err(|source| LockError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;

        let lock_path = data_dir.join(Self::LOCK_FILE_NAME);
        let pid = std::process::id();

        // Second attempt only after clearing a stale lock
        for _ in 0..2 {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    if let Err(source) = writeln!(file, "{pid}") {
                        let _ = fs::remove_file(&lock_path);
                        return Err(LockError::Io {
                            path: lock_path,
                            source,
                        });
                    }
                    tracing::debug!(pid, path = %lock_path.display(), "Acquired run lock");
                    return Ok(Self {
                        lock_path,
                        owned: true,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let holder = read_pid(&lock_path);
                    if lock_is_live(&lock_path, holder) {
                        return Err(match holder {
                            Some(pid) => LockError::AlreadyRunning {
                                pid,
                                path: lock_path,
                            },
                            None => LockError::InUse { path: lock_path },
                        });
                    }
                    tracing::info!(path = %lock_path.display(), "Removing stale lock file");
                    match fs::remove_file(&lock_path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(source) => {
                            return Err(LockError::Io {
                                path: lock_path,
                                source,
                            })
                        }
                    }
                }
                Err(source) => {
                    return Err(LockError::Io {
                        path: lock_path,
                        source,
                    })
                }
            }
        }

        // Another run recreated the lock between our removal and retry
        Err(LockError::InUse { path: lock_path })
    }

    /// Release the lock (called automatically on drop)
    pub fn release(&mut self) {
        if self.owned {
            if let Err(e) = fs::remove_file(&self.lock_path) {
                tracing::warn!("Failed to remove lock file: {}", e);
            }
            self.owned = false;
        }
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// PID stored in an existing lock file; `None` when unreadable or corrupt.
fn read_pid(lock_path: &Path) -> Option<u32> {
    fs::read_to_string(lock_path).ok()?.trim().parse().ok()
}

/// Whether an existing lock still belongs to a running fermentwatch.
fn lock_is_live(lock_path: &Path, holder: Option<u32>) -> bool {
    match holder {
        Some(pid) => process_is_fermentwatch(pid)
            .unwrap_or_else(|| modified_within(lock_path, ProcessLock::STALE_LOCK_AGE)),
        None => modified_within(lock_path, ProcessLock::PID_WRITE_GRACE),
    }
}

/// `None` when the platform gives no way to inspect another process.
#[cfg(target_os = "linux")]
fn process_is_fermentwatch(pid: u32) -> Option<bool> {
    // A recycled PID belonging to another program does not count as a live run.
    Some(
        fs::read_to_string(format!("/proc/{pid}/cmdline"))
            .map(|cmdline| cmdline.contains("fermentwatch"))
            .unwrap_or(false),
    )
}

#[cfg(not(target_os = "linux"))]
fn process_is_fermentwatch(_pid: u32) -> Option<bool> {
    None
}

/// Whether `path` was modified less than `max_age` ago. A timestamp in the
/// future counts as recent; a missing file does not.
fn modified_within(path: &Path, max_age: Duration) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(|modified| {
            modified
                .elapsed()
                .map_or(true, |age| age < max_age)
        })
        .unwrap_or(false)
}
