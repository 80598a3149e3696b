// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive advisory lock over the runtime directory's lock file.
//!
//! The lock file's presence is persistent across daemon generations; the
//! advisory lock state is the semantic object, not the file itself.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use fs2::FileExt;

/// A held exclusive lock. Released on drop on every exit path, including
/// panics and early returns, since `fs2` releases the OS lock when the
/// file descriptor is closed.
pub struct RuntimeLock {
    file: File,
}

impl RuntimeLock {
    /// Acquire the lock without blocking. Returns `Ok(None)` if another
    /// holder currently owns it (not an error — that's the expected
    /// steady-state outcome when a peer wins the race).
    pub fn try_acquire(lock_path: &Path) -> io::Result<Option<Self>> {
        let file = open_lock_file(lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file })),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Drop for RuntimeLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn open_lock_file(lock_path: &Path) -> io::Result<File> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_try_acquire_fails_while_first_is_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lock");

        let first = RuntimeLock::try_acquire(&path).unwrap();
        assert!(first.is_some());

        let second = RuntimeLock::try_acquire(&path).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lock");

        {
            let _first = RuntimeLock::try_acquire(&path).unwrap().unwrap();
        }

        let second = RuntimeLock::try_acquire(&path).unwrap();
        assert!(second.is_some());
    }
}
