use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use chrono::Local;
use clap::builder::styling::AnsiColor;
use log::debug;
use tokio::fs;

use crate::{
    error::{handle_error, Error, Result},
    format::format_path,
    hash::{hash_file, HashAlgorithm},
};

use super::{ops::check_copy_target, symlink_metadata, try_exists};

/// Copies `path` to `stem_YYYYmmdd_HHMMSS.ext` (or `stem_backup.ext`) in
/// `backup_dir`, defaulting to the file's own directory.
pub async fn create_backup(
    path: &Path,
    backup_dir: Option<&Path>,
    timestamped: bool,
) -> Result<PathBuf> {
    let metadata = symlink_metadata(path).await?;
    if metadata.is_dir() {
        return Err(Error::FileIsDirectory(path.to_owned()));
    }

    let dir = match backup_dir {
        Some(dir) => {
            fs::create_dir_all(dir).await?;
            dir.to_owned()
        }
        None => path.parent().map(Path::to_owned).unwrap_or_default(),
    };

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let backup_name = if timestamped {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        format!("{stem}_{timestamp}{suffix}")
    } else {
        format!("{stem}_backup{suffix}")
    };

    let backup_path = dir.join(backup_name);
    fs::copy(path, &backup_path).await?;

    let formatted_path = format_path(&backup_path);
    let style = AnsiColor::Blue.on_default();
    debug!("{style}created backup{style:#} {formatted_path}");
    Ok(backup_path)
}

/// Copies a single file, refusing to replace `dst` unless `overwrite` is set.
/// With `verify`, a copy whose hash differs from the source is removed.
pub async fn safe_copy(src: &Path, dst: &Path, overwrite: bool, verify: bool) -> Result<u64> {
    let metadata = symlink_metadata(src).await?;
    if metadata.is_dir() {
        return Err(Error::FileIsDirectory(src.to_owned()));
    }

    if !overwrite && try_exists(dst).await? {
        return Err(Error::FileAlreadyExists(dst.to_owned()));
    }

    super::ensure_parent(dst).await?;
    check_copy_target(src, dst).await?;
    let size = fs::copy(src, dst).await?;

    if verify {
        let src_hash = hash_file(src.to_owned(), HashAlgorithm::Md5).await?;
        let dst_hash = hash_file(dst.to_owned(), HashAlgorithm::Md5).await?;
        if src_hash != dst_hash {
            fs::remove_file(dst).await?;
            return Err(Error::VerificationFailed(dst.to_owned()));
        }
    }

    let formatted_path = format_path(dst);
    let style = AnsiColor::Blue.on_default();
    debug!("{style}copied file{style:#} {formatted_path}");
    Ok(size)
}

/// Removes the files directly inside `dir` that were last modified more
/// than `older_than` ago, or all of them when no age is given.
pub async fn cleanup_temp_files(dir: &Path, older_than: Option<Duration>) -> Result<u64> {
    let metadata = symlink_metadata(dir).await?;
    if !metadata.is_dir() {
        return Err(Error::FileIsNotDirectory(dir.to_owned()));
    }

    let now = SystemTime::now();
    let mut removed = 0;
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(err) => {
                handle_error(Err(err.into()));
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let expired = match (older_than, metadata.modified()) {
            (None, _) => true,
            (Some(age), Ok(modified)) => now
                .duration_since(modified)
                .is_ok_and(|elapsed| elapsed >= age),
            (Some(_), Err(_)) => false,
        };
        if !expired {
            continue;
        }

        let path = entry.path();
        match fs::remove_file(&path).await {
            Ok(()) => {
                removed += 1;
                let formatted_path = format_path(&path);
                let style = AnsiColor::Red.on_default();
                debug!("{style}removed temp file{style:#} {formatted_path}");
            }
            Err(err) => handle_error(Err(err.into())),
        }
    }

    Ok(removed)
}
