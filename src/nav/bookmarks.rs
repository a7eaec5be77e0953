use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use clap::builder::styling::AnsiColor;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{
    error::{Error, Result},
    format::format_path,
    serde::{read_json, write_json},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub path: PathBuf,
    pub created: Option<DateTime<Utc>>,
}

/// Named bookmarks persisted as a JSON object keyed by name.
#[derive(Debug, Default)]
pub struct BookmarkStore {
    file: Option<PathBuf>,
    bookmarks: BTreeMap<String, Bookmark>,
}

impl BookmarkStore {
    pub fn in_memory() -> Self {
        BookmarkStore::default()
    }

    pub async fn load(file: &Path) -> Result<Self> {
        let bookmarks = read_json(file).await?.unwrap_or_default();
        Ok(BookmarkStore {
            file: Some(file.to_owned()),
            bookmarks,
        })
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(file) = &self.file {
            write_json(file, &self.bookmarks).await?;
        }

        Ok(())
    }

    pub async fn add(&mut self, name: &str, path: &Path) -> Result<&Bookmark> {
        if self.bookmarks.contains_key(name) {
            return Err(Error::BookmarkAlreadyExists(name.to_owned()));
        }

        let created = match fs::metadata(path).await {
            Ok(metadata) => Some(
                metadata
                    .created()
                    .or_else(|_| metadata.modified())
                    .map_or_else(|_| Utc::now(), Into::into),
            ),
            Err(_) => None,
        };
        let bookmark = Bookmark {
            path: path.to_owned(),
            created,
        };
        self.bookmarks.insert(name.to_owned(), bookmark);
        self.save().await?;

        let formatted_path = format_path(path);
        let style = AnsiColor::Green.on_default();
        debug!("{style}added bookmark{style:#} {name} -> {formatted_path}");
        self.get(name)
    }

    pub async fn remove(&mut self, name: &str) -> Result<Bookmark> {
        let bookmark = self
            .bookmarks
            .remove(name)
            .ok_or_else(|| Error::BookmarkDoesNotExist(name.to_owned()))?;
        self.save().await?;

        let style = AnsiColor::Red.on_default();
        debug!("{style}removed bookmark{style:#} {name}");
        Ok(bookmark)
    }

    pub fn get(&self, name: &str) -> Result<&Bookmark> {
        self.bookmarks
            .get(name)
            .ok_or_else(|| Error::BookmarkDoesNotExist(name.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Bookmark)> {
        self.bookmarks.iter()
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }
}
