mod index;
mod matcher;

#[cfg(test)]
mod tests;

use std::{
    collections::VecDeque,
    fmt,
    fs::Metadata,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use clap::{builder::styling::AnsiColor, ValueEnum};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::RwLock, task::spawn_blocking};

use crate::{
    error::{Error, Result},
    file::{self, ExcludeSet, Walker},
    format::format_path,
    serde::write_atomic,
    stats::{report, ProgressFn},
    task::CancelFlag,
};

pub use self::{
    index::{words, SearchIndex},
    matcher::{find_in_file, is_text_file, looks_like_text, NameMatcher},
};

pub const HISTORY_LIMIT: usize = 50;
pub const DEFAULT_MAX_RESULTS: usize = 1000;
pub const DEFAULT_QUICK_RESULTS: usize = 100;
pub const MAX_CONTENT_SIZE: u64 = 10 * 1024 * 1024;

const PROGRESS_INTERVAL: u64 = 50;
const ESTIMATE_LIMIT: u64 = 10_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub pattern: String,
    pub content: Option<String>,
    /// Required file name suffix, compared case-insensitively.
    pub file_type: Option<String>,
    pub size_min: Option<u64>,
    pub size_max: Option<u64>,
    pub modified_from: Option<DateTime<Utc>>,
    pub modified_to: Option<DateTime<Utc>>,
    pub case_sensitive: bool,
    pub regex: bool,
    pub max_results: usize,
    pub use_index: bool,
    /// Globs for names or paths to leave out; excluded directories are not
    /// searched.
    pub excludes: Vec<String>,
    /// Without this only the direct children of the root are searched.
    pub recursive: bool,
}

impl SearchQuery {
    pub fn new<S: Into<String>>(pattern: S) -> Self {
        SearchQuery {
            pattern: pattern.into(),
            ..SearchQuery::default()
        }
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        SearchQuery {
            pattern: "*".to_owned(),
            content: None,
            file_type: None,
            size_min: None,
            size_max: None,
            modified_from: None,
            modified_to: None,
            case_sensitive: false,
            regex: false,
            max_results: DEFAULT_MAX_RESULTS,
            use_index: true,
            excludes: Vec::new(),
            recursive: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Filename,
    Content,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Filename => write!(f, "filename"),
            MatchKind::Content => write!(f, "content"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub directory: PathBuf,
    pub kind: MatchKind,
    pub line: Option<String>,
    pub line_number: Option<u64>,
}

impl SearchResult {
    fn new(path: PathBuf, metadata: &Metadata, kind: MatchKind) -> Self {
        SearchResult {
            name: file::name_of(&path),
            directory: path.parent().map(Path::to_owned).unwrap_or_default(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(Into::into),
            path,
            kind,
            line: None,
            line_number: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub pattern: String,
    pub content: Option<String>,
    pub file_type: Option<String>,
    pub root: PathBuf,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub indexed_files: usize,
    pub indexed_words: usize,
    pub history_count: usize,
    pub indexing_enabled: bool,
    pub max_content_size: u64,
}

/// Compiled form of a [`SearchQuery`], shared with blocking workers.
struct Criteria {
    query: SearchQuery,
    matcher: NameMatcher,
    content_matcher: Option<NameMatcher>,
    excludes: ExcludeSet,
    max_content_size: u64,
}

impl Criteria {
    fn new(query: SearchQuery, max_content_size: u64) -> Result<Self> {
        let matcher = NameMatcher::new(&query.pattern, query.case_sensitive, query.regex)?;
        // a content string that is not a valid pattern simply never matches names
        let content_matcher = query
            .content
            .as_deref()
            .and_then(|content| NameMatcher::new(content, query.case_sensitive, query.regex).ok());

        let excludes = ExcludeSet::new(&query.excludes)?;

        Ok(Criteria {
            query,
            matcher,
            content_matcher,
            excludes,
            max_content_size,
        })
    }

    fn walker(&self, root: &Path) -> Walker {
        let walker = Walker::new(root)
            .skip_hidden(true)
            .excludes(self.excludes.clone());
        if self.query.recursive {
            walker
        } else {
            walker.max_depth(1)
        }
    }

    /// Whether an indexed path lies where a filesystem walk of `root` would
    /// not reach.
    fn is_out_of_scope(&self, root: &Path, path: &Path) -> bool {
        if !self.query.recursive && path.parent() != Some(root) {
            return true;
        }

        path.ancestors()
            .take_while(|ancestor| *ancestor != root)
            .any(|ancestor| self.excludes.is_excluded(ancestor))
    }

    /// Name, suffix, size and date checks shared by both search strategies.
    fn matches(&self, path: &Path) -> Option<Metadata> {
        let name = file::name_of(path);
        if !self.matcher.is_match(&name) {
            return None;
        }

        if let Some(file_type) = &self.query.file_type {
            if !name.to_lowercase().ends_with(&file_type.to_lowercase()) {
                return None;
            }
        }

        let metadata = std::fs::metadata(path).ok()?;
        let size = metadata.len();
        if self.query.size_min.is_some_and(|min| size < min)
            || self.query.size_max.is_some_and(|max| size > max)
        {
            return None;
        }

        if self.query.modified_from.is_some() || self.query.modified_to.is_some() {
            let modified: DateTime<Utc> = metadata.modified().ok()?.into();
            if self.query.modified_from.is_some_and(|from| modified < from)
                || self.query.modified_to.is_some_and(|to| modified > to)
            {
                return None;
            }
        }

        Some(metadata)
    }

    fn evaluate(&self, path: &Path) -> Option<SearchResult> {
        let metadata = self.matches(path)?;
        let mut result = SearchResult::new(path.to_owned(), &metadata, MatchKind::Filename);

        let Some(content) = &self.query.content else {
            return Some(result);
        };

        if metadata.len() > self.max_content_size {
            debug!("skipping content search of large file {}", format_path(path));
        } else if is_text_file(path) {
            if let Ok(Some((line, line_number))) =
                find_in_file(path, content, self.query.case_sensitive)
            {
                result.kind = MatchKind::Content;
                result.line = Some(line);
                result.line_number = Some(line_number);
                return Some(result);
            }
        }

        let name_matches = self
            .content_matcher
            .as_ref()
            .is_some_and(|matcher| matcher.is_match(&result.name));
        name_matches.then_some(result)
    }
}

/// File search over the filesystem, accelerated by a name index.
#[derive(Debug)]
pub struct SearchEngine {
    index: Arc<RwLock<SearchIndex>>,
    history: VecDeque<HistoryEntry>,
    cancel: CancelFlag,
    pub indexing_enabled: bool,
    pub max_content_size: u64,
}

impl Default for SearchEngine {
    fn default() -> Self {
        SearchEngine::new()
    }
}

impl SearchEngine {
    pub fn new() -> Self {
        SearchEngine::with_index(SearchIndex::new())
    }

    pub fn with_index(index: SearchIndex) -> Self {
        SearchEngine {
            index: Arc::new(RwLock::new(index)),
            history: VecDeque::new(),
            cancel: CancelFlag::new(),
            indexing_enabled: true,
            max_content_size: MAX_CONTENT_SIZE,
        }
    }

    /// Loads a persisted index, starting empty when the file is missing or
    /// unreadable.
    pub async fn load(index_file: &Path) -> Result<Self> {
        let index = match fs::read(index_file).await {
            Ok(bytes) => spawn_blocking(move || SearchIndex::from_bytes(&bytes))
                .await?
                .unwrap_or_else(|err| {
                    warn!("discarding unreadable search index: {err}");
                    SearchIndex::new()
                }),
            Err(_) => SearchIndex::new(),
        };

        Ok(SearchEngine::with_index(index))
    }

    pub async fn save(&self, index_file: &Path) -> Result<()> {
        let index = self.index.clone();
        let bytes = spawn_blocking(move || index.blocking_read().to_bytes()).await??;
        write_atomic(index_file, &bytes).await
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
        info!("search cancellation requested");
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Appends stored entries, oldest first, keeping the newest
    /// `HISTORY_LIMIT`.
    pub fn restore_history<I: IntoIterator<Item = HistoryEntry>>(&mut self, entries: I) {
        for entry in entries {
            if self.history.len() >= HISTORY_LIMIT {
                self.history.pop_front();
            }
            self.history.push_back(entry);
        }
    }

    pub async fn clear_index(&self) {
        self.index.write().await.clear();
    }

    pub async fn stats(&self) -> SearchStats {
        let index = self.index.read().await;
        SearchStats {
            indexed_files: index.len(),
            indexed_words: index.word_count(),
            history_count: self.history.len(),
            indexing_enabled: self.indexing_enabled,
            max_content_size: self.max_content_size,
        }
    }

    pub async fn search(
        &mut self,
        root: &Path,
        query: SearchQuery,
        progress: Option<ProgressFn>,
    ) -> Result<Vec<SearchResult>> {
        let root = check_root(root).await?;
        self.cancel.reset();
        self.push_history(&root, &query);

        let use_index = query.use_index && self.indexing_enabled && query.content.is_none();
        let criteria = Criteria::new(query, self.max_content_size)?;
        let index = self.index.clone();
        let cancel = self.cancel.clone();
        let indexing_enabled = self.indexing_enabled;
        let search_root = root.clone();

        let start = Utc::now();
        let results = spawn_blocking(move || {
            if use_index {
                search_index(&search_root, &criteria, &index, &cancel, progress.as_ref())
            } else {
                let index = indexing_enabled.then_some(&*index);
                search_filesystem(&search_root, &criteria, index, &cancel, progress.as_ref())
            }
        })
        .await??;

        let elapsed = (Utc::now() - start).to_std().unwrap_or_default();
        let style = AnsiColor::Green.on_default();
        debug!(
            "{style}searched{style:#} {} in {} ({} results)",
            format_path(&root),
            humantime::format_duration(elapsed),
            results.len()
        );
        Ok(results)
    }

    /// Substring search over file and directory names. Indexed files are
    /// used when they give any hit, otherwise the tree is walked.
    pub async fn quick_search(
        &self,
        root: &Path,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<PathBuf>> {
        let root = check_root(root).await?;

        if self.indexing_enabled {
            let indexed = self
                .index
                .read()
                .await
                .search(query)
                .into_iter()
                .filter(|path| path.starts_with(&root))
                .take(max_results)
                .collect::<Vec<_>>();
            if !indexed.is_empty() {
                return Ok(indexed);
            }
        }

        let needle = query.to_lowercase();
        let cancel = self.cancel.clone();
        spawn_blocking(move || {
            let mut results = Vec::new();
            for entry in Walker::new(&root).entries().skip(1) {
                cancel.check()?;
                if results.len() >= max_results {
                    break;
                }

                let name = entry.file_name().to_string_lossy().to_lowercase();
                if name.contains(&needle) {
                    results.push(entry.into_path());
                }
            }

            Ok(results)
        })
        .await?
    }

    /// Refreshes the index for `root` without searching.
    pub async fn update_index(&self, root: &Path, progress: Option<ProgressFn>) -> Result<u64> {
        let root = check_root(root).await?;
        let index = self.index.clone();
        let cancel = self.cancel.clone();
        spawn_blocking(move || index.blocking_write().update(&root, &cancel, progress.as_ref()))
            .await?
    }

    fn push_history(&mut self, root: &Path, query: &SearchQuery) {
        if self.history.len() >= HISTORY_LIMIT {
            self.history.pop_front();
        }

        self.history.push_back(HistoryEntry {
            pattern: query.pattern.clone(),
            content: query.content.clone(),
            file_type: query.file_type.clone(),
            root: root.to_owned(),
            timestamp: Utc::now(),
        });
    }
}

async fn check_root(root: &Path) -> Result<PathBuf> {
    let root = fs::canonicalize(root)
        .await
        .map_err(|err| file::not_found_or(err, root))?;
    if !fs::metadata(&root).await?.is_dir() {
        return Err(Error::FileIsNotDirectory(root));
    }

    Ok(root)
}

fn search_index(
    root: &Path,
    criteria: &Criteria,
    index: &RwLock<SearchIndex>,
    cancel: &CancelFlag,
    progress: Option<&ProgressFn>,
) -> Result<Vec<SearchResult>> {
    let mut index = index.blocking_write();
    index.update(root, cancel, progress)?;

    let candidates = index
        .search(&criteria.query.pattern)
        .into_iter()
        .filter(|path| path.starts_with(root) && !criteria.is_out_of_scope(root, path))
        .collect::<Vec<_>>();
    drop(index);

    let total = candidates.len() as u64;
    let mut results = Vec::new();
    for (i, path) in candidates.into_iter().enumerate() {
        cancel.check()?;
        if results.len() >= criteria.query.max_results {
            break;
        }

        if let Some(metadata) = criteria.matches(&path) {
            results.push(SearchResult::new(path, &metadata, MatchKind::Filename));
        }

        if i as u64 % PROGRESS_INTERVAL == 0 {
            report(progress, i as u64, total);
        }
    }

    Ok(results)
}

fn search_filesystem(
    root: &Path,
    criteria: &Criteria,
    index: Option<&RwLock<SearchIndex>>,
    cancel: &CancelFlag,
    progress: Option<&ProgressFn>,
) -> Result<Vec<SearchResult>> {
    let total = if progress.is_some() {
        estimate_file_count(criteria.walker(root))
    } else {
        0
    };

    let mut results = Vec::new();
    let mut visited = 0;
    for entry in criteria.walker(root).files() {
        cancel.check()?;
        if results.len() >= criteria.query.max_results {
            break;
        }

        visited += 1;
        if visited % PROGRESS_INTERVAL == 0 {
            report(progress, visited, total);
        }

        if let Some(result) = criteria.evaluate(entry.path()) {
            if let Some(index) = index {
                if let Err(err) = index.blocking_write().add_file(entry.path()) {
                    debug!("failed to index {}: {err}", format_path(entry.path()));
                }
            }
            results.push(result);
        }
    }

    Ok(results)
}

fn estimate_file_count(walker: Walker) -> u64 {
    let mut count = 0;
    for _ in walker.files() {
        count += 1;
        if count >= ESTIMATE_LIMIT {
            break;
        }
    }

    count
}
