// flock.rs - Exclusive advisory lock on the store's lock file.
//
// Every `pm` command is its own process, so an in-process mutex cannot
// serialize read-check-write sequences. Each writer opens the lock file
// and takes `flock(LOCK_EX)`; the lock is released when the guard drops
// and the descriptor closes. Separate opens of the same file contend even
// inside one process, so threads sharing a repository are covered too.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use crate::error::StoreError;

/// Held for the duration of one store write.
#[derive(Debug)]
pub(crate) struct StoreLock {
    _file: File,
}

impl StoreLock {
    /// Block until the exclusive lock on `path` is ours.
    pub(crate) fn acquire(path: &Path) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|source| StoreError::io(path, source))?;
        lock_exclusive(&file).map_err(|source| StoreError::io(path, source))?;
        Ok(Self { _file: file })
    }
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    loop {
        // Safety: the descriptor belongs to `file`, which outlives the call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

// Single-process use only on other platforms.
#[cfg(not(unix))]
fn lock_exclusive(_: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn second_holder_waits_for_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lock");
        let first = StoreLock::acquire(&path).unwrap();
        let released = Arc::new(AtomicBool::new(false));

        let waiter = {
            let path = path.clone();
            let released = released.clone();
            thread::spawn(move || {
                let _second = StoreLock::acquire(&path).unwrap();
                released.load(Ordering::SeqCst)
            })
        };

        thread::sleep(Duration::from_millis(50));
        released.store(true, Ordering::SeqCst);
        drop(first);
        assert!(waiter.join().unwrap(), "second lock taken while first was held");
    }
}
