use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use log::warn;
use walkdir::{DirEntry, WalkDir};

use crate::error::Result;

use super::is_hidden_name;

/// Glob patterns matched against an entry's base name and its full path.
#[derive(Clone, Debug)]
pub struct ExcludeSet {
    set: GlobSet,
}

impl ExcludeSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern.as_ref())?);
        }

        Ok(ExcludeSet {
            set: builder.build()?,
        })
    }

    pub fn empty() -> Self {
        ExcludeSet {
            set: GlobSet::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.set.is_empty() {
            return false;
        }

        path.file_name().is_some_and(|name| self.set.is_match(name)) || self.set.is_match(path)
    }
}

impl Default for ExcludeSet {
    fn default() -> Self {
        ExcludeSet::empty()
    }
}

/// Recursive directory walk that logs and skips unreadable entries.
#[derive(Clone, Debug)]
pub struct Walker {
    root: PathBuf,
    skip_hidden: bool,
    excludes: ExcludeSet,
    max_depth: Option<usize>,
    sorted: bool,
}

impl Walker {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Walker {
            root: root.as_ref().to_owned(),
            skip_hidden: false,
            excludes: ExcludeSet::empty(),
            max_depth: None,
            sorted: false,
        }
    }

    /// Hidden directories are pruned; hidden files are still yielded.
    #[must_use]
    pub fn skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }

    #[must_use]
    pub fn excludes(mut self, excludes: ExcludeSet) -> Self {
        self.excludes = excludes;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    #[must_use]
    pub fn sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    pub fn entries(self) -> impl Iterator<Item = DirEntry> {
        let mut walk_dir = WalkDir::new(&self.root);
        if let Some(max_depth) = self.max_depth {
            walk_dir = walk_dir.max_depth(max_depth);
        }
        if self.sorted {
            walk_dir = walk_dir.sort_by_file_name();
        }

        let skip_hidden = self.skip_hidden;
        let excludes = self.excludes;
        walk_dir
            .into_iter()
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }

                if skip_hidden
                    && entry.file_type().is_dir()
                    && is_hidden_name(&entry.file_name().to_string_lossy())
                {
                    return false;
                }

                !excludes.is_excluded(entry.path())
            })
            .filter_map(|result| match result {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("{err}");
                    None
                }
            })
    }

    pub fn files(self) -> impl Iterator<Item = DirEntry> {
        self.entries().filter(|entry| entry.file_type().is_file())
    }
}
