mod backup;
mod clipboard;
mod dupes;
mod listing;
mod metadata;
mod names;
mod ops;
mod walk;

#[cfg(test)]
mod tests;

use std::{
    ffi::OsStr,
    fs::Metadata,
    io,
    path::{Path, PathBuf},
};

use tokio::fs;

use crate::error::{Error, Result};

pub use self::{
    backup::{cleanup_temp_files, create_backup, safe_copy},
    clipboard::{Clipboard, ClipboardAction},
    dupes::{find_duplicates, normalize_extension, DuplicateGroups, DuplicateOptions},
    listing::{list_directory, sort_entries, Entry, ListOptions, SortBy},
    metadata::{file_info, guess_mime, has_access, FileInfo, FileKind, HASH_SIZE_LIMIT},
    names::{clean_filename, is_safe_path, is_within, normalize},
    ops::{
        copy, create_directory, create_file, delete, directory_size, directory_stats, move_path,
        move_target, read_bytes, read_file, rename, write_file, DEFAULT_SIZE_DEPTH,
    },
    walk::{ExcludeSet, Walker},
};

pub async fn try_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
    match fs::symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

pub async fn symlink_metadata(path: &Path) -> Result<Metadata> {
    fs::symlink_metadata(path)
        .await
        .map_err(|err| not_found_or(err, path))
}

pub fn metadata_blocking(path: &Path) -> Result<Metadata> {
    std::fs::metadata(path).map_err(|err| not_found_or(err, path))
}

pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(is_hidden_name)
}

pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// Lowercase extension including the leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

pub fn name_of(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().into_owned(),
        |name| name.to_string_lossy().into_owned(),
    )
}

pub async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    Ok(())
}

pub fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

pub fn not_found_or(err: io::Error, path: &Path) -> Error {
    match err.kind() {
        io::ErrorKind::NotFound => Error::FileDoesNotExist(path.to_owned()),
        io::ErrorKind::PermissionDenied => Error::PermissionDenied(path.to_owned()),
        _ => err.into(),
    }
}
