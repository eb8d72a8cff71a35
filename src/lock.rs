//! Process-exclusive advisory lock for an environment directory, backed
//! by `fs2`'s cross-platform flock wrapper.

use std::{
    fs,
    path::{Path, PathBuf},
};

use fs2::FileExt;

use crate::{
    err_at,
    error::{Result, UsageError},
};

/// Holds the sibling `nogdb.lock` file exclusively for the life of the
/// environment. Dropping it releases the OS advisory lock, which also
/// happens automatically on process death.
pub struct LockFile {
    path: PathBuf,
    file: fs::File,
}

impl LockFile {
    /// Acquire the exclusive lock at `dir/name`. Fails with
    /// `UsageError::ContextLocked` if another process already holds it.
    pub fn acquire(dir: &Path, name: &str) -> Result<LockFile> {
        let path = dir.join(name);
        let file = err_at!(IoError, fs::OpenOptions::new().create(true).write(true).open(&path))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(LockFile { path, file }),
            Err(_) => err_at!(
                Usage(UsageError::ContextLocked),
                msg: "environment at {:?} is locked by another process",
                dir
            ),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        // Best-effort: the OS also releases this on process exit.
        let _ = self.file.unlock();
    }
}
