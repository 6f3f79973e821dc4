//! Single-writer lock for tripkit-sync.
//!
//! Two sync processes pointed at the same cache would race each other's
//! writes, so each cache path gets one advisory `flock` held for the life of
//! the process. Readers (`tripkit`) never take it; SQLite WAL lets them read
//! while a sync writes.

use anyhow::{Context, Result};
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{self, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

const SYNC_LOCK_FILE: &str = "tripkit-sync.lock";

/// Held by tripkit-sync until exit.
pub struct SyncProcessGuard {
    _lock: ProcessLock,
}

/// Take the sync lock for `cache_path`.
///
/// Fails if another tripkit-sync already holds it.
pub fn acquire_sync_guard(cache_path: &Path) -> Result<SyncProcessGuard> {
    let dir = lock_dir();
    match try_acquire_lock(&dir, SYNC_LOCK_FILE, cache_path)? {
        Some(lock) => Ok(SyncProcessGuard { _lock: lock }),
        None => anyhow::bail!(
            "another tripkit-sync is already refreshing {}",
            cache_path.display()
        ),
    }
}

struct ProcessLock {
    file: File,
    path: PathBuf,
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        let _ = unlock_file(&self.file);
        let _ = fs::remove_file(&self.path);
    }
}

fn try_acquire_lock(dir: &Path, filename: &str, cache_path: &Path) -> Result<Option<ProcessLock>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create lock directory: {}", dir.display()))?;

    let path = dir.join(scoped_lock_filename(filename, cache_path));
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("failed to open lock file: {}", path.display()))?;

    match lock_file_nonblocking(&file) {
        Ok(()) => {
            // Owner pid, for whoever finds a stale-looking lock file
            let _ = file.set_len(0);
            let _ = file.seek(SeekFrom::Start(0));
            let _ = writeln!(file, "pid={}", std::process::id());
            let _ = file.flush();

            Ok(Some(ProcessLock { file, path }))
        }
        Err(e) if is_lock_busy(&e) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to lock file: {}", path.display())),
    }
}

fn lock_dir() -> PathBuf {
    let mut dir = match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => std::env::temp_dir(),
    };
    dir.push("tripkit");
    dir
}

/// One lock per cache file, so separate XDG roots don't block each other.
fn scoped_lock_filename(base: &str, cache_path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    cache_path.to_string_lossy().hash(&mut hasher);
    format!("{base}.{:016x}", hasher.finish())
}

fn is_lock_busy(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::WouldBlock)
        || matches!(error.raw_os_error(), Some(11) | Some(35))
}

#[cfg(unix)]
fn lock_file_nonblocking(file: &File) -> io::Result<()> {
    const LOCK_EX: i32 = 2;
    const LOCK_NB: i32 = 4;
    // SAFETY: valid descriptor, constant flags.
    let rc = unsafe { flock(file.as_raw_fd(), LOCK_EX | LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
fn unlock_file(file: &File) -> io::Result<()> {
    const LOCK_UN: i32 = 8;
    // SAFETY: valid descriptor, constant flags.
    let rc = unsafe { flock(file.as_raw_fd(), LOCK_UN) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
extern "C" {
    fn flock(fd: i32, operation: i32) -> i32;
}

#[cfg(not(unix))]
compile_error!("tripkit-sync process locks currently require Unix (macOS/Linux)");
