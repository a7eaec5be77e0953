mod bookmarks;
mod disk;
mod tree;

#[cfg(test)]
mod tests;

use std::{
    collections::{HashSet, VecDeque},
    path::{Path, PathBuf},
};

use clap::builder::styling::AnsiColor;
use log::debug;
use nix::unistd::AccessFlags;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{
    error::{Error, Result},
    file::{self, not_found_or},
    format::format_path,
    serde::{read_json, write_json},
};

pub use self::{
    bookmarks::{Bookmark, BookmarkStore},
    disk::{disk_usage, drives, DiskUsage, Drive},
    tree::{directory_tree, DirectoryTree},
};

pub const HISTORY_LIMIT: usize = 50;
pub const DEFAULT_TREE_DEPTH: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crumb {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Clone, Debug, Serialize)]
pub struct PathInfo {
    pub path: PathBuf,
    pub exists: bool,
    pub readable: bool,
    pub writable: bool,
    pub file_count: u64,
    pub dir_count: u64,
    pub disk: Option<DiskUsage>,
    pub error: Option<String>,
}

/// Current directory plus back and forward histories. The whole state
/// serialises so a session can be resumed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigator {
    current: PathBuf,
    back: VecDeque<PathBuf>,
    forward: VecDeque<PathBuf>,
}

impl Navigator {
    pub fn new<P: Into<PathBuf>>(current: P) -> Self {
        Navigator {
            current: current.into(),
            back: VecDeque::new(),
            forward: VecDeque::new(),
        }
    }

    pub fn at_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(Error::NoHomeDirectory)?;
        Ok(Navigator::new(home))
    }

    /// Resumes the session stored in `file`, starting at `fallback` when
    /// there is none or its directory has vanished.
    pub async fn load(file: &Path, fallback: &Path) -> Result<Self> {
        let maybe_navigator: Option<Navigator> = read_json(file).await?;
        match maybe_navigator {
            Some(navigator) if is_valid_path(&navigator.current).await => Ok(navigator),
            _ => Ok(Navigator::new(fallback)),
        }
    }

    pub async fn save(&self, file: &Path) -> Result<()> {
        write_json(file, self).await
    }

    pub fn current(&self) -> &Path {
        &self.current
    }

    pub fn parent(&self) -> Option<&Path> {
        self.current.parent()
    }

    pub fn history(&self) -> impl Iterator<Item = &PathBuf> {
        self.back.iter()
    }

    pub fn forward_history(&self) -> impl Iterator<Item = &PathBuf> {
        self.forward.iter()
    }

    pub fn clear_history(&mut self) {
        self.back.clear();
        self.forward.clear();
    }

    pub async fn navigate_to(&mut self, path: &Path) -> Result<&Path> {
        let target = fs::canonicalize(path)
            .await
            .map_err(|err| not_found_or(err, path))?;

        let metadata = fs::metadata(&target).await?;
        if !metadata.is_dir() {
            return Err(Error::FileIsNotDirectory(target));
        }
        if !file::has_access(&target, AccessFlags::R_OK | AccessFlags::X_OK) {
            return Err(Error::PermissionDenied(target));
        }

        if target != self.current {
            let previous = std::mem::replace(&mut self.current, target);
            push_capped(&mut self.back, previous);
            self.forward.clear();
        }

        let formatted_path = format_path(&self.current);
        let style = AnsiColor::Cyan.on_default();
        debug!("{style}navigated to{style:#} {formatted_path}");
        Ok(&self.current)
    }

    pub fn go_back(&mut self) -> Result<&Path> {
        let previous = self.back.pop_back().ok_or(Error::NoBackHistory)?;
        let current = std::mem::replace(&mut self.current, previous);
        push_capped(&mut self.forward, current);
        Ok(&self.current)
    }

    pub fn go_forward(&mut self) -> Result<&Path> {
        let next = self.forward.pop_back().ok_or(Error::NoForwardHistory)?;
        let current = std::mem::replace(&mut self.current, next);
        push_capped(&mut self.back, current);
        Ok(&self.current)
    }

    pub async fn go_up(&mut self) -> Result<&Path> {
        let parent = self.current.parent().ok_or(Error::AlreadyAtRoot)?.to_owned();
        self.navigate_to(&parent).await
    }

    pub async fn go_home(&mut self) -> Result<&Path> {
        let home = dirs::home_dir().ok_or(Error::NoHomeDirectory)?;
        self.navigate_to(&home).await
    }

    pub async fn navigate_to_bookmark(
        &mut self,
        bookmarks: &BookmarkStore,
        name: &str,
    ) -> Result<&Path> {
        let path = bookmarks.get(name)?.path.clone();
        self.navigate_to(&path).await
    }

    /// Path components from the root down to the current directory.
    pub fn breadcrumbs(&self) -> Vec<Crumb> {
        let mut crumbs = self
            .current
            .ancestors()
            .map(|path| Crumb {
                name: path.file_name().map_or_else(
                    || path.to_string_lossy().into_owned(),
                    |name| name.to_string_lossy().into_owned(),
                ),
                path: path.to_owned(),
            })
            .collect::<Vec<_>>();
        crumbs.reverse();
        crumbs
    }

    /// The current directory followed by the back history, newest first,
    /// without duplicates or vanished directories.
    pub fn recent_directories(&self, limit: usize) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut recent = Vec::new();

        let candidates = std::iter::once(&self.current).chain(self.back.iter().rev());
        for (index, path) in candidates.enumerate() {
            if recent.len() >= limit {
                break;
            }

            if (index == 0 || path.is_dir()) && seen.insert(path) {
                recent.push(path.clone());
            }
        }

        recent
    }

    /// Creates `name` inside `parent`, or inside the current directory.
    pub async fn create_directory(&self, name: &str, parent: Option<&Path>) -> Result<PathBuf> {
        let parent = parent.unwrap_or(&self.current);
        let path = parent.join(name);
        if file::try_exists(&path).await? {
            return Err(Error::FileAlreadyExists(path));
        }

        file::create_directory(&path).await?;
        Ok(path)
    }

    pub async fn path_info(&self, path: Option<&Path>) -> PathInfo {
        path_info(path.unwrap_or(&self.current)).await
    }
}

/// Removes a directory; without `recursive` only an empty one.
pub async fn delete_directory(path: &Path, recursive: bool) -> Result<()> {
    let metadata = file::symlink_metadata(path).await?;
    if !metadata.is_dir() {
        return Err(Error::FileIsNotDirectory(path.to_owned()));
    }

    if recursive {
        fs::remove_dir_all(path).await?;
    } else {
        fs::remove_dir(path).await?;
    }

    let formatted_path = format_path(path);
    let style = AnsiColor::Red.on_default();
    debug!("{style}deleted directory{style:#} {formatted_path}");
    Ok(())
}

pub async fn is_valid_path(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(metadata) => metadata.is_dir() && file::has_access(path, AccessFlags::R_OK),
        Err(_) => false,
    }
}

pub async fn path_info(path: &Path) -> PathInfo {
    let mut info = PathInfo {
        path: path.to_owned(),
        exists: file::try_exists(path).await.unwrap_or(false),
        readable: file::has_access(path, AccessFlags::R_OK),
        writable: file::has_access(path, AccessFlags::W_OK),
        file_count: 0,
        dir_count: 0,
        disk: None,
        error: None,
    };

    if !info.exists {
        info.error = Some(Error::FileDoesNotExist(path.to_owned()).to_string());
        return info;
    }

    match disk_usage(path) {
        Ok(usage) => info.disk = Some(usage),
        Err(err) => info.error = Some(err.to_string()),
    }

    if let Ok(mut entries) = fs::read_dir(path).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            match fs::metadata(entry.path()).await {
                Ok(metadata) if metadata.is_dir() => info.dir_count += 1,
                Ok(metadata) if metadata.is_file() => info.file_count += 1,
                _ => {}
            }
        }
    }

    info
}

fn push_capped(history: &mut VecDeque<PathBuf>, path: PathBuf) {
    if history.len() >= HISTORY_LIMIT {
        history.pop_front();
    }
    history.push_back(path);
}
