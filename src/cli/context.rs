use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::builder::styling::AnsiColor;
use log::debug;
use serde_json::json;

use crate::{
    config::{self, default_config_file, Settings, SettingsManager},
    error::{Error, Result},
    file::{self, is_within, Clipboard},
    nav::{BookmarkStore, Navigator},
    search::{HistoryEntry, SearchEngine},
    serde::{read_json, write_json},
    stats::{Progress, ProgressFn},
};

use super::args::GlobalArgs;

const SESSION_FILE: &str = "session.json";
const BOOKMARKS_FILE: &str = "bookmarks.json";
const CLIPBOARD_FILE: &str = "clipboard.json";
const INDEX_FILE: &str = "index.bin";
const SEARCH_HISTORY_FILE: &str = "search_history.json";

/// Settings plus the per-user state files kept next to them.
pub struct Context {
    pub settings: SettingsManager,
    pub json: bool,
    pub stats: bool,
}

impl Context {
    pub async fn load(global: &GlobalArgs) -> Result<Self> {
        let file = match &global.config {
            Some(file) => file.clone(),
            None => default_config_file()?,
        };
        let settings = SettingsManager::load(file).await?;

        Ok(Context {
            settings,
            json: global.json,
            stats: global.stats,
        })
    }

    pub fn settings(&self) -> &Settings {
        self.settings.settings()
    }

    fn state_file(&self, name: &str) -> PathBuf {
        config::state_file(self.settings.file(), name)
    }

    /// The stored session, or a new one at the configured startup directory,
    /// the last directory or the process working directory.
    pub async fn navigator(&self) -> Result<Navigator> {
        let settings = self.settings();
        let fallback = match settings
            .startup_directory
            .as_ref()
            .or(settings.last_directory.as_ref())
        {
            Some(dir) => dir.clone(),
            None => env::current_dir()?,
        };

        Navigator::load(&self.state_file(SESSION_FILE), &fallback).await
    }

    pub async fn save_navigator(&mut self, navigator: &Navigator) -> Result<()> {
        navigator.save(&self.state_file(SESSION_FILE)).await?;

        let current = navigator.current();
        self.settings.add_recent_directory(current).await?;
        self.settings.set("last_directory", json!(current)).await
    }

    /// `path`, or the session directory when none is given.
    pub async fn resolve(&self, path: Option<&Path>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(path.to_owned()),
            None => Ok(self.navigator().await?.current().to_owned()),
        }
    }

    pub async fn bookmarks(&self) -> Result<BookmarkStore> {
        BookmarkStore::load(&self.state_file(BOOKMARKS_FILE)).await
    }

    pub async fn clipboard(&self) -> Result<Clipboard> {
        let clipboard = read_json(&self.state_file(CLIPBOARD_FILE)).await?;
        Ok(clipboard.unwrap_or_default())
    }

    pub async fn save_clipboard(&self, clipboard: &Clipboard) -> Result<()> {
        write_json(&self.state_file(CLIPBOARD_FILE), clipboard).await
    }

    pub fn index_file(&self) -> PathBuf {
        self.state_file(INDEX_FILE)
    }

    /// The stored index and search history.
    pub async fn search_engine(&self) -> Result<SearchEngine> {
        let mut engine = SearchEngine::load(&self.index_file()).await?;
        engine.indexing_enabled = self.settings().search.enable_indexing;

        let history: Option<Vec<HistoryEntry>> =
            read_json(&self.state_file(SEARCH_HISTORY_FILE)).await?;
        engine.restore_history(history.unwrap_or_default());
        Ok(engine)
    }

    /// Stores the search history, and the index when indexing is enabled.
    pub async fn save_search_engine(&self, engine: &SearchEngine) -> Result<()> {
        if engine.indexing_enabled {
            engine.save(&self.index_file()).await?;
        }

        let history = engine.history().collect::<Vec<_>>();
        write_json(&self.state_file(SEARCH_HISTORY_FILE), &history).await
    }

    /// Refuses paths below a restricted path unless system access is
    /// allowed.
    pub fn check_allowed(&self, path: &Path) -> Result<()> {
        let security = &self.settings().security;
        if security.allow_system_access || security.restricted_paths.is_empty() {
            return Ok(());
        }

        let absolute = file::normalize(&file::absolute(path)?);
        if security
            .restricted_paths
            .iter()
            .any(|restricted| is_within(restricted, &absolute))
        {
            return Err(Error::PermissionDenied(absolute));
        }

        Ok(())
    }
}

/// Logs progress at debug level, roughly every five percent.
pub fn progress_logger(label: &'static str) -> ProgressFn {
    Arc::new(move |progress: Progress| {
        let step = (progress.total / 20).max(1);
        if progress.current % step != 0 && progress.current != progress.total {
            return;
        }

        let percent = progress.percent();
        let style = AnsiColor::BrightBlack.on_default();
        debug!(
            "{style}{label}{style:#} {}/{} ({percent:.0}%)",
            progress.current, progress.total
        );
    })
}
