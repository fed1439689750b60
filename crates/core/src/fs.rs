//! Filesystem helpers used while assembling a package tree.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Remove a directory tree if it exists.
///
/// Returns `true` if something was removed.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be removed.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(path).map_err(|e| Error::io("remove directory", path, e))?;
    Ok(true)
}

/// List the children of a directory as absolute paths, sorted by name.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_dir_abs(path: &Path) -> Result<Vec<PathBuf>> {
    let dir = std::path::absolute(path).map_err(|e| Error::io("resolve path", path, e))?;
    let mut children = std::fs::read_dir(&dir)
        .map_err(|e| Error::io("read directory", &dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::io("read directory", &dir, e))?;
    children.sort();
    Ok(children)
}

/// List the names of a directory's children, sorted.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_dir_names(path: &Path) -> Result<Vec<String>> {
    Ok(list_dir_abs(path)?
        .iter()
        .filter_map(|child| child.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}

/// Recursively copy `src` (a file or directory) to `dst`.
///
/// Directories are created as needed; symlinks are copied as the files they
/// point to.
///
/// # Errors
///
/// Returns an error if any entry cannot be read or written.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            Error::io("walk directory", &path, e.into())
        })?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = if relative.as_os_str().is_empty() {
            dst.to_path_buf()
        } else {
            dst.join(relative)
        };

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| Error::io("create directory", &target, e))?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::io("create directory", parent, e))?;
            }
            std::fs::copy(entry.path(), &target)
                .map_err(|e| Error::io("copy file", entry.path(), e))?;
        }
    }
    Ok(())
}
