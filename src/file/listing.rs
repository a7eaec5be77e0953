use std::{
    cmp::Ordering,
    fmt,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio_stream::{wrappers::ReadDirStream, StreamExt};

use crate::{
    error::{Error, Result},
    format::{format_mode, format_path},
};

use super::{extension_of, is_hidden_name, metadata::FileKind, symlink_metadata};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Name,
    Size,
    Date,
    Type,
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortBy::Name => write!(f, "name"),
            SortBy::Size => write!(f, "size"),
            SortBy::Date => write!(f, "date"),
            SortBy::Type => write!(f, "type"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ListOptions {
    pub show_hidden: bool,
    pub sort_by: SortBy,
    pub reverse: bool,
    /// Directories sort before everything else regardless of `reverse`.
    pub directories_first: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions {
            show_hidden: false,
            sort_by: SortBy::Name,
            reverse: false,
            directories_first: true,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub kind: Option<FileKind>,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub permissions: Option<String>,
    pub extension: String,
    pub is_hidden: bool,
    pub error: Option<String>,
}

impl Entry {
    pub fn is_directory(&self) -> bool {
        self.kind == Some(FileKind::Directory)
    }

    fn new(name: String, path: PathBuf) -> Self {
        let is_hidden = is_hidden_name(&name);
        Entry {
            name,
            path,
            kind: None,
            size: 0,
            modified: None,
            permissions: None,
            extension: String::new(),
            is_hidden,
            error: None,
        }
    }
}

/// Lists the direct children of `path`, sorted by `options`.
pub async fn list_directory(path: &Path, options: ListOptions) -> Result<Vec<Entry>> {
    let metadata = symlink_metadata(path).await?;
    if !metadata.is_dir() {
        return Err(Error::FileIsNotDirectory(path.to_owned()));
    }

    let read_dir = fs::read_dir(path)
        .await
        .map_err(|err| super::not_found_or(err, path))?;
    let mut stream = ReadDirStream::new(read_dir);
    let mut entries = Vec::new();

    while let Some(result) = stream.next().await {
        let dir_entry = match result {
            Ok(dir_entry) => dir_entry,
            Err(err) => {
                warn!("failed to read entry in {}: {err}", format_path(path));
                continue;
            }
        };

        let name = dir_entry.file_name().to_string_lossy().into_owned();
        if !options.show_hidden && is_hidden_name(&name) {
            continue;
        }

        let mut entry = Entry::new(name, dir_entry.path());
        match fs::symlink_metadata(&entry.path).await {
            Ok(metadata) => {
                let kind = FileKind::from_file_type(metadata.file_type());
                entry.kind = Some(kind);
                entry.size = metadata.len();
                entry.modified = metadata.modified().ok().map(Into::into);
                entry.permissions = Some(format_mode(metadata.permissions().mode()));
                if !kind.is_directory() {
                    entry.extension = extension_of(&entry.path);
                }
            }
            Err(err) => entry.error = Some(err.to_string()),
        }

        entries.push(entry);
    }

    sort_entries(&mut entries, &options);
    Ok(entries)
}

pub fn sort_entries(entries: &mut [Entry], options: &ListOptions) {
    entries.sort_by(|a, b| {
        if options.directories_first {
            let directories_first = b.is_directory().cmp(&a.is_directory());
            if directories_first != Ordering::Equal {
                return directories_first;
            }
        }

        let ordering = match options.sort_by {
            SortBy::Name => compare_names(a, b),
            SortBy::Size => a.size.cmp(&b.size).then_with(|| compare_names(a, b)),
            SortBy::Date => a.modified.cmp(&b.modified).then_with(|| compare_names(a, b)),
            SortBy::Type => a
                .extension
                .cmp(&b.extension)
                .then_with(|| compare_names(a, b)),
        };

        if options.reverse {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn compare_names(a: &Entry, b: &Entry) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}
