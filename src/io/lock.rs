use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::model::template::check_list_name;

/// Advisory per-list write lock.
///
/// Writers to the same list (records, archive moves, template changes)
/// serialize on `<locks_dir>/<list>.lock` using flock on Unix. Readers
/// never take it. The lock is released when the handle drops; the lock
/// file stays behind so every writer contends on the same inode.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot lock list '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("could not lock {path} within {waited:?}: another lister process is writing to this list")]
    Timeout { path: PathBuf, waited: Duration },
}

impl FileLock {
    /// Lock `list_name` under `locks_dir`, waiting up to `timeout`.
    pub fn acquire(locks_dir: &Path, list_name: &str, timeout: Duration) -> Result<Self, LockError> {
        check_list_name(list_name).map_err(|reason| LockError::InvalidName {
            name: list_name.to_string(),
            reason,
        })?;
        let lock_path = locks_dir.join(format!("{}.lock", list_name));
        fs::create_dir_all(locks_dir).map_err(|e| LockError::CreateError {
            path: lock_path.clone(),
            source: e,
        })?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| LockError::CreateError {
                path: lock_path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        let mut backoff = Duration::from_millis(5);
        while try_lock(&file).is_err() {
            let waited = start.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout {
                    path: lock_path,
                    waited,
                });
            }
            std::thread::sleep(backoff.min(timeout - waited));
            backoff = (backoff * 2).min(Duration::from_millis(100));
        }
        tracing::trace!(lock = %lock_path.display(), "acquired list lock");
        Ok(FileLock {
            _file: file,
            path: lock_path,
        })
    }

    /// Acquire with default timeout (5 seconds)
    pub fn acquire_default(locks_dir: &Path, list_name: &str) -> Result<Self, LockError> {
        Self::acquire(locks_dir, list_name, Duration::from_secs(5))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Try to take an exclusive flock without blocking
#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}
