use crate::paths::BuildnotePaths;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::time::{Duration, Instant};

/// How long a state save waits for another `buildnote` process to finish its own.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(10);

const POLL: Duration = Duration::from_millis(25);

/// Exclusive lock on `.buildnote/LOCK`, held while the key, filter state or
/// other shared files are read-modify-written. Released when dropped.
///
/// Holders only keep it for a file write, so acquiring waits for the
/// current holder instead of failing outright.
pub struct WorkspaceLock {
    _file: File,
}

impl WorkspaceLock {
    /// Acquire the lock, waiting up to [`DEFAULT_WAIT`].
    pub fn acquire(paths: &BuildnotePaths) -> anyhow::Result<Self> {
        Self::acquire_within(paths, DEFAULT_WAIT)
    }

    /// Acquire the lock, polling until `wait` has elapsed.
    pub fn acquire_within(paths: &BuildnotePaths, wait: Duration) -> anyhow::Result<Self> {
        let file = open_lock_file(paths)?;
        let deadline = Instant::now() + wait;
        let mut contended = false;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { _file: file }),
                Err(_) if Instant::now() < deadline => {
                    if !contended {
                        tracing::debug!(
                            lock = %paths.lock_file.display(),
                            "workspace locked by another process, waiting"
                        );
                        contended = true;
                    }
                    std::thread::sleep(POLL);
                }
                Err(_) => anyhow::bail!(
                    "workspace still locked by another process after {}ms ({})",
                    wait.as_millis(),
                    paths.lock_file.display()
                ),
            }
        }
    }
}

fn open_lock_file(paths: &BuildnotePaths) -> anyhow::Result<File> {
    if let Some(parent) = paths.lock_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&paths.lock_file)
        .map_err(|e| anyhow::anyhow!("cannot open lock file {}: {}", paths.lock_file.display(), e))
}
