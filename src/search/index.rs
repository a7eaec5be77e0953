use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use clap::builder::styling::AnsiColor;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    file::Walker,
    format::format_path,
    serde::{deserialize, serialize},
    stats::{report, ProgressFn},
    task::CancelFlag,
};

static WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

const COMPRESSION_LEVEL: i32 = 3;

/// Lowercase `\w+` tokens of `text`.
pub fn words(text: &str) -> Vec<String> {
    let lowercase = text.to_lowercase();
    WORD_REGEX
        .find_iter(&lowercase)
        .map(|word| word.as_str().to_owned())
        .collect()
}

/// Maps file name words to the files containing them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIndex {
    words: BTreeMap<String, BTreeSet<PathBuf>>,
    mtimes: BTreeMap<PathBuf, SystemTime>,
}

impl SearchIndex {
    pub fn new() -> Self {
        SearchIndex::default()
    }

    pub fn len(&self) -> usize {
        self.mtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mtimes.is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.mtimes.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.mtimes.contains_key(path)
    }

    /// Whether `path` is indexed and unchanged since.
    pub fn is_indexed(&self, path: &Path) -> bool {
        let Some(indexed) = self.mtimes.get(path) else {
            return false;
        };

        fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .is_ok_and(|modified| *indexed >= modified)
    }

    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let modified = fs::metadata(path)?.modified()?;
        self.remove_file(path);

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        for word in words(&name) {
            self.words.entry(word).or_default().insert(path.to_owned());
        }
        self.mtimes.insert(path.to_owned(), modified);

        Ok(())
    }

    pub fn remove_file(&mut self, path: &Path) -> bool {
        if self.mtimes.remove(path).is_none() {
            return false;
        }

        self.words.retain(|_, paths| {
            paths.remove(path);
            !paths.is_empty()
        });
        true
    }

    /// Files whose name words contain every word of `query` as a substring.
    /// A query without words matches every indexed file.
    pub fn search(&self, query: &str) -> BTreeSet<PathBuf> {
        let query_words = words(query);
        if query_words.is_empty() {
            return self.mtimes.keys().cloned().collect();
        }

        let mut result: Option<BTreeSet<PathBuf>> = None;
        for query_word in &query_words {
            let matches = self
                .words
                .iter()
                .filter(|(word, _)| word.contains(query_word.as_str()))
                .flat_map(|(_, paths)| paths.iter().cloned())
                .collect::<BTreeSet<_>>();

            result = Some(match result {
                Some(previous) => previous.intersection(&matches).cloned().collect(),
                None => matches,
            });
        }

        result.unwrap_or_default()
    }

    /// Indexes new or changed files below `root` and drops entries under it
    /// that no longer exist. Returns the number of files (re)indexed.
    pub fn update(
        &mut self,
        root: &Path,
        cancel: &CancelFlag,
        progress: Option<&ProgressFn>,
    ) -> Result<u64> {
        let mut stale = Vec::new();
        for entry in Walker::new(root).skip_hidden(true).files() {
            cancel.check()?;
            if !self.is_indexed(entry.path()) {
                stale.push(entry.into_path());
            }
        }

        let total = stale.len() as u64;
        let mut indexed = 0;
        for (i, path) in stale.iter().enumerate() {
            cancel.check()?;
            match self.add_file(path) {
                Ok(()) => indexed += 1,
                Err(err) => warn!("failed to index {}: {err}", format_path(path)),
            }

            if i % 100 == 0 {
                report(progress, i as u64, total);
            }
        }
        report(progress, total, total);

        let pruned = self.prune(Some(root));
        let style = AnsiColor::Cyan.on_default();
        debug!(
            "{style}updated index{style:#} {} ({indexed} indexed, {pruned} pruned)",
            format_path(root)
        );
        Ok(indexed)
    }

    /// Drops entries whose file has vanished, optionally only below `root`.
    pub fn prune(&mut self, root: Option<&Path>) -> usize {
        let vanished = self
            .mtimes
            .keys()
            .filter(|path| root.map_or(true, |root| path.starts_with(root)))
            .filter(|path| !path.is_file())
            .cloned()
            .collect::<Vec<_>>();

        for path in &vanished {
            self.remove_file(path);
        }

        vanished.len()
    }

    /// Encodes the index as zstd-compressed bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = serialize(self)?;
        let compressed_bytes = zstd::encode_all(bytes.as_slice(), COMPRESSION_LEVEL)?;
        Ok(compressed_bytes)
    }

    pub fn from_bytes(compressed_bytes: &[u8]) -> Result<Self> {
        let bytes = zstd::decode_all(compressed_bytes)?;
        deserialize(&bytes)
    }
}
