use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{copy, move_path, symlink_metadata};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardAction {
    Copy,
    Cut,
}

impl fmt::Display for ClipboardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardAction::Copy => write!(f, "copy"),
            ClipboardAction::Cut => write!(f, "cut"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clipboard {
    pub paths: Vec<PathBuf>,
    pub action: Option<ClipboardAction>,
}

impl Clipboard {
    pub fn new() -> Self {
        Clipboard::default()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() || self.action.is_none()
    }

    pub fn copy(&mut self, paths: Vec<PathBuf>) {
        self.set(paths, ClipboardAction::Copy);
    }

    pub fn cut(&mut self, paths: Vec<PathBuf>) {
        self.set(paths, ClipboardAction::Cut);
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.action = None;
    }

    /// Copies or moves every held path into `dir`, returning the new paths.
    /// Moved paths leave a cut as they go, so a failed paste keeps only the
    /// entries still in place; a completed cut is cleared.
    pub async fn paste(&mut self, dir: &Path) -> Result<Vec<PathBuf>> {
        let Some(action) = self.action.filter(|_| !self.paths.is_empty()) else {
            return Err(Error::ClipboardEmpty);
        };

        let metadata = symlink_metadata(dir).await?;
        if !metadata.is_dir() {
            return Err(Error::FileIsNotDirectory(dir.to_owned()));
        }

        let mut pasted = Vec::with_capacity(self.paths.len());
        match action {
            ClipboardAction::Copy => {
                for src in &self.paths {
                    let dst = target_in(dir, src)?;
                    copy(src, &dst).await?;
                    pasted.push(dst);
                }
            }
            ClipboardAction::Cut => {
                while let Some(src) = self.paths.first() {
                    let dst = target_in(dir, src)?;
                    move_path(src, &dst).await?;
                    self.paths.remove(0);
                    pasted.push(dst);
                }
                self.clear();
            }
        }

        Ok(pasted)
    }

    fn set(&mut self, paths: Vec<PathBuf>, action: ClipboardAction) {
        self.paths = paths;
        self.action = Some(action);
    }
}

fn target_in(dir: &Path, src: &Path) -> Result<PathBuf> {
    match src.file_name() {
        Some(name) => Ok(dir.join(name)),
        None => Err(Error::InvalidName(src.to_string_lossy().into_owned())),
    }
}
