//! Advisory locking for the checkpoint record
//!
//! Readers take a shared lock and writers an exclusive one on a sibling
//! `.lock` file, so processes sharing a checkpoint never race a rename.

use super::store::CheckpointError;
use fd_lock::RwLock;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Directory a record lives in; bare file names resolve to the working directory
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Lock file guarding `path`: the record's full file name plus `.lock`
///
/// Appending keeps the lock distinct from the record whatever its extension.
pub(crate) fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

/// Open (creating if needed) the lock file guarding `path`
///
/// The returned lock is not yet held; call `read()` or `write()` on it and
/// keep the guard alive for the duration of the access.
pub(crate) fn open_lock(path: &Path) -> Result<RwLock<File>, CheckpointError> {
    std::fs::create_dir_all(parent_dir(path))
        .map_err(|e| CheckpointError::IoError(e.to_string()))?;

    let lock_path = lock_path(path);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| CheckpointError::LockError(format!("Failed to open lock file: {e}")))?;

    Ok(RwLock::new(file))
}
