use std::{
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
};

use async_recursion::async_recursion;
use clap::builder::styling::AnsiColor;
use log::debug;
use nix::errno::Errno;
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
    task::spawn_blocking,
};
use walkdir::WalkDir;

use crate::{
    error::{Error, Result},
    format::{format_path, format_size},
};

use super::{
    absolute, ensure_parent, is_hidden_name, not_found_or, symlink_metadata, try_exists,
};

pub const DEFAULT_SIZE_DEPTH: usize = 10;

pub async fn create_file(path: &Path, content: &str) -> Result<()> {
    ensure_parent(path).await?;
    fs::write(path, content).await?;

    let formatted_path = format_path(path);
    let style = AnsiColor::Green.on_default();
    debug!("{style}created file{style:#} {formatted_path}");
    Ok(())
}

pub async fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .map_err(|err| not_found_or(err, path))
}

pub async fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).await.map_err(|err| not_found_or(err, path))
}

pub async fn write_file(path: &Path, content: &[u8], append: bool) -> Result<()> {
    ensure_parent(path).await?;
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .await
        .map_err(|err| not_found_or(err, path))?;
    file.write_all(content).await?;
    file.flush().await?;

    let formatted_path = format_path(path);
    let formatted_size = format_size(content.len());
    let msg_style = AnsiColor::Green.on_default();
    let size_style = AnsiColor::BrightBlack.on_default();
    debug!(
        "{msg_style}wrote file{msg_style:#} {formatted_path} {size_style}({formatted_size}){size_style:#}"
    );
    Ok(())
}

pub async fn delete(path: &Path) -> Result<()> {
    let metadata = symlink_metadata(path).await?;
    if metadata.is_dir() {
        fs::remove_dir_all(path).await?;
    } else {
        fs::remove_file(path).await?;
    }

    let formatted_path = format_path(path);
    let style = AnsiColor::Red.on_default();
    debug!("{style}deleted{style:#} {formatted_path}");
    Ok(())
}

/// Copies a file, symlink or directory tree. Directories are merged into an
/// existing destination.
pub async fn copy(src: &Path, dst: &Path) -> Result<u64> {
    symlink_metadata(src).await?;
    ensure_parent(dst).await?;
    check_copy_target(src, dst).await?;
    copy_recursive(src, dst).await
}

/// Refuses copies onto the source itself and copies of a directory into
/// its own subtree. The parent of `dst` must exist.
pub(crate) async fn check_copy_target(src: &Path, dst: &Path) -> Result<()> {
    let src_metadata = symlink_metadata(src).await?;
    let src_location = resolve_location(src).await?;
    let dst_location = resolve_location(dst).await?;
    if src_location == dst_location {
        return Err(Error::SameFile(dst.to_owned()));
    }

    // hard links and symlinked destinations share the source inode
    if !src_metadata.is_symlink() {
        if let (Ok(src_target), Ok(dst_target)) = (fs::metadata(src).await, fs::metadata(dst).await) {
            if (src_target.dev(), src_target.ino()) == (dst_target.dev(), dst_target.ino()) {
                return Err(Error::SameFile(dst.to_owned()));
            }
        }
    }

    if src_metadata.is_dir() && dst_location.starts_with(&src_location) {
        return Err(Error::CopyIntoItself {
            src: src.to_owned(),
            dst: dst.to_owned(),
        });
    }

    Ok(())
}

/// Absolute form of `path` with its parent canonicalised. The last
/// component is not resolved, so a symlink stays itself.
async fn resolve_location(path: &Path) -> Result<PathBuf> {
    let path = absolute(path)?;
    let location = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent).await?.join(name),
        _ => fs::canonicalize(&path).await?,
    };
    Ok(location)
}

#[async_recursion]
async fn copy_recursive(src: &Path, dst: &Path) -> Result<u64> {
    let metadata = fs::symlink_metadata(src).await?;
    let file_type = metadata.file_type();

    if file_type.is_symlink() {
        let target = fs::read_link(src).await?;
        if try_exists(dst).await? {
            fs::remove_file(dst).await?;
        }
        fs::symlink(&target, dst).await?;

        let formatted_path = format_path(dst);
        let style = AnsiColor::Cyan.on_default();
        debug!("{style}created symlink{style:#} {formatted_path}");
        return Ok(0);
    }

    if file_type.is_dir() {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(src).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name());
        }

        fs::create_dir_all(dst).await?;
        let mut total = 0;
        for name in names {
            total += copy_recursive(&src.join(&name), &dst.join(&name)).await?;
        }
        // after the children, so read-only directories can still be filled
        fs::set_permissions(dst, metadata.permissions()).await?;

        let formatted_path = format_path(dst);
        let style = AnsiColor::Magenta.on_default();
        debug!("{style}copied directory{style:#} {formatted_path}");
        return Ok(total);
    }

    let size = fs::copy(src, dst).await?;

    let formatted_path = format_path(dst);
    let formatted_size = format_size(size);
    let msg_style = AnsiColor::Blue.on_default();
    let size_style = AnsiColor::BrightBlack.on_default();
    debug!(
        "{msg_style}copied file{msg_style:#} {formatted_path} {size_style}({formatted_size}){size_style:#}"
    );
    Ok(size)
}

/// Moves `src` to `dst`, or into `dst` when it is an existing directory.
/// Returns the final location.
pub async fn move_path(src: &Path, dst: &Path) -> Result<PathBuf> {
    symlink_metadata(src).await?;
    let target = move_target(src, dst).await?;

    ensure_parent(&target).await?;
    match fs::rename(src, &target).await {
        Ok(()) => {}
        Err(err) if err.raw_os_error() == Some(Errno::EXDEV as i32) => {
            copy_recursive(src, &target).await?;
            delete(src).await?;
        }
        Err(err) => return Err(not_found_or(err, src)),
    }

    let formatted_src = format_path(src);
    let formatted_dst = format_path(&target);
    let style = AnsiColor::Yellow.on_default();
    debug!("{style}moved{style:#} {formatted_src} -> {formatted_dst}");
    Ok(target)
}

/// Where [`move_path`] puts `src`: inside `dst` when it is a directory.
pub async fn move_target(src: &Path, dst: &Path) -> Result<PathBuf> {
    match fs::metadata(dst).await {
        Ok(metadata) if metadata.is_dir() => match src.file_name() {
            Some(name) => Ok(dst.join(name)),
            None => Err(Error::InvalidName(src.to_string_lossy().into_owned())),
        },
        _ => Ok(dst.to_owned()),
    }
}

/// Renames `path` within its parent directory.
pub async fn rename(path: &Path, new_name: &str) -> Result<PathBuf> {
    if new_name.trim().is_empty() || new_name.contains(['/', '\\']) || new_name == ".." {
        return Err(Error::InvalidName(new_name.to_owned()));
    }

    symlink_metadata(path).await?;
    let target = match path.parent() {
        Some(parent) => parent.join(new_name),
        None => PathBuf::from(new_name),
    };
    if try_exists(&target).await? {
        return Err(Error::FileAlreadyExists(target));
    }

    fs::rename(path, &target).await?;

    let formatted_src = format_path(path);
    let formatted_dst = format_path(&target);
    let style = AnsiColor::Yellow.on_default();
    debug!("{style}renamed{style:#} {formatted_src} -> {formatted_dst}");
    Ok(target)
}

pub async fn create_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|err| not_found_or(err, path))?;

    let formatted_path = format_path(path);
    let style = AnsiColor::Magenta.on_default();
    debug!("{style}created directory{style:#} {formatted_path}");
    Ok(())
}

/// Total size of the files below `path`, descending at most `max_depth`
/// levels. Unreadable entries are skipped.
pub async fn directory_size(path: &Path, max_depth: usize) -> Result<u64> {
    let metadata = symlink_metadata(path).await?;
    if !metadata.is_dir() {
        return Ok(metadata.len());
    }

    let root = path.to_owned();
    let size = spawn_blocking(move || {
        WalkDir::new(root)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|metadata| metadata.len())
            .sum::<u64>()
    })
    .await?;

    Ok(size)
}

/// Returns `(total size, file count)` for the files below `path`.
pub async fn directory_stats(path: &Path, include_hidden: bool) -> Result<(u64, u64)> {
    let metadata = symlink_metadata(path).await?;
    if !metadata.is_dir() {
        return Err(Error::FileIsNotDirectory(path.to_owned()));
    }

    let root = path.to_owned();
    let stats = spawn_blocking(move || {
        let mut size = 0;
        let mut count = 0;

        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            include_hidden
                || entry.depth() == 0
                || !is_hidden_name(&entry.file_name().to_string_lossy())
        });
        for entry in walker.filter_map(std::result::Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }

            if let Ok(metadata) = entry.metadata() {
                size += metadata.len();
                count += 1;
            }
        }

        (size, count)
    })
    .await?;

    Ok(stats)
}
