use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::builder::styling::AnsiColor;
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    file,
    format::format_path,
    serde::{read_json, write_json},
};

use super::{is_section, PathBookmark, Settings};

/// Called with `(key, old value, new value)` after a setting changes.
pub type Observer = Box<dyn Fn(&str, &Value, &Value) + Send + Sync>;

pub struct SettingsManager {
    file: PathBuf,
    backup_file: PathBuf,
    settings: Settings,
    observers: Vec<(usize, Observer)>,
    next_observer: usize,
    auto_save: bool,
}

impl SettingsManager {
    /// Defaults backed by `file`; nothing is read.
    pub fn new<P: Into<PathBuf>>(file: P) -> Self {
        let file = file.into();
        SettingsManager {
            backup_file: backup_path(&file),
            file,
            settings: Settings::default(),
            observers: Vec::new(),
            next_observer: 0,
            auto_save: true,
        }
    }

    /// Loads `file`, falling back to its backup and then to defaults.
    pub async fn load<P: Into<PathBuf>>(file: P) -> Result<Self> {
        let mut manager = SettingsManager::new(file);

        match read_settings(&manager.file).await {
            Ok(Some(settings)) => manager.settings = settings,
            Ok(None) => {
                if let Some(settings) = manager.load_backup().await {
                    warn!("settings file missing, loaded backup");
                    manager.settings = settings;
                } else {
                    debug!("no settings file, using defaults");
                }
            }
            Err(err) => {
                warn!("failed to load {}: {err}", format_path(&manager.file));
                if let Some(settings) = manager.load_backup().await {
                    manager.settings = settings;
                }
            }
        }

        Ok(manager)
    }

    async fn load_backup(&self) -> Option<Settings> {
        match read_settings(&self.backup_file).await {
            Ok(settings) => settings,
            Err(err) => {
                warn!("failed to load {}: {err}", format_path(&self.backup_file));
                None
            }
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn backup_file(&self) -> &Path {
        &self.backup_file
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn auto_save(&self) -> bool {
        self.auto_save
    }

    pub fn set_auto_save(&mut self, auto_save: bool) {
        self.auto_save = auto_save;
    }

    /// Copies the current file to the backup, then writes atomically.
    pub async fn save(&mut self) -> Result<()> {
        if file::try_exists(&self.file).await? {
            if let Err(err) = tokio::fs::copy(&self.file, &self.backup_file).await {
                warn!("failed to back up settings: {err}");
            }
        }

        self.settings.last_updated = Some(Utc::now());
        write_json(&self.file, &self.settings).await?;

        let style = AnsiColor::Cyan.on_default();
        debug!("{style}saved settings{style:#} {}", format_path(&self.file));
        Ok(())
    }

    async fn changed(&mut self) -> Result<()> {
        if self.auto_save {
            self.save().await
        } else {
            Ok(())
        }
    }

    pub fn add_observer(&mut self, observer: Observer) -> usize {
        let id = self.next_observer;
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn remove_observer(&mut self, id: usize) -> bool {
        let count = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != count
    }

    fn notify(&self, key: &str, old: &Value, new: &Value) {
        for (_, observer) in &self.observers {
            observer(key, old, new);
        }
    }

    /// Value at a dot-separated key such as `browser.sort_by`.
    pub fn get(&self, key: &str) -> Result<Value> {
        let value = serde_json::to_value(&self.settings)?;
        value
            .pointer(&pointer(key)?)
            .cloned()
            .ok_or_else(|| Error::UnknownSetting(key.to_owned()))
    }

    pub async fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let mut current = serde_json::to_value(&self.settings)?;
        let old = assign(&mut current, key, value)?;
        self.settings = serde_json::from_value(current)?;

        let new = self.get(key)?;
        self.notify(key, &old, &new);
        self.changed().await
    }

    /// Sets several fields of one section; nothing changes if any is invalid.
    pub async fn update_section(&mut self, section: &str, fields: &Map<String, Value>) -> Result<()> {
        if !is_section(section) {
            return Err(Error::UnknownSetting(section.to_owned()));
        }

        let mut current = serde_json::to_value(&self.settings)?;
        let mut changes = Vec::new();
        for (field, value) in fields {
            let key = format!("{section}.{field}");
            let old = assign(&mut current, &key, value.clone())?;
            changes.push((key, old, value));
        }
        self.settings = serde_json::from_value(current)?;

        for (key, old, new) in &changes {
            self.notify(key, old, new);
        }
        self.changed().await
    }

    /// Restores one top-level key, or everything, to its default.
    pub async fn reset(&mut self, section: Option<&str>) -> Result<()> {
        match section {
            None => self.settings = Settings::default(),
            Some(section) => {
                let defaults = serde_json::to_value(Settings::default())?;
                let default = defaults
                    .pointer(&pointer(section)?)
                    .cloned()
                    .ok_or_else(|| Error::UnknownSetting(section.to_owned()))?;

                let mut current = serde_json::to_value(&self.settings)?;
                assign(&mut current, section, default)?;
                self.settings = serde_json::from_value(current)?;
            }
        }

        self.changed().await
    }

    /// Writes the settings, or only the named top-level keys, to `path`.
    pub async fn export(&self, path: &Path, sections: &[String]) -> Result<()> {
        let mut data = match serde_json::to_value(&self.settings)? {
            Value::Object(data) => data,
            _ => Map::new(),
        };

        if !sections.is_empty() {
            if let Some(unknown) = sections.iter().find(|name| !data.contains_key(*name)) {
                return Err(Error::UnknownSetting(unknown.clone()));
            }
            data.retain(|key, _| sections.contains(key));
        }

        write_json(path, &data).await
    }

    /// Applies the settings in `path` on top of the current ones, or on top
    /// of the defaults when not merging.
    pub async fn import(&mut self, path: &Path, merge: bool) -> Result<()> {
        let data = read_json::<Value>(path)
            .await?
            .ok_or_else(|| Error::FileDoesNotExist(path.to_owned()))?;

        let base = if merge {
            self.settings.clone()
        } else {
            Settings::default()
        };
        self.settings = overlay(&base, &data)?;
        self.changed().await
    }

    pub async fn add_recent_directory(&mut self, path: &Path) -> Result<()> {
        let recent = &mut self.settings.recent_directories;
        recent.retain(|existing| existing != path);
        recent.insert(0, path.to_owned());
        recent.truncate(self.settings.performance.max_recent_directories);
        self.changed().await
    }

    pub fn bookmarks(&self) -> &[PathBookmark] {
        &self.settings.bookmarks
    }

    pub async fn add_bookmark(&mut self, path: &Path, name: Option<&str>, icon: &str) -> Result<()> {
        if self.settings.bookmarks.iter().any(|bookmark| bookmark.path == path) {
            return Err(Error::BookmarkAlreadyExists(path.display().to_string()));
        }

        let name = name.map_or_else(|| file::name_of(path), ToOwned::to_owned);
        self.settings.bookmarks.push(PathBookmark {
            name,
            path: path.to_owned(),
            icon: icon.to_owned(),
            created: Some(Utc::now()),
        });
        self.changed().await
    }

    pub async fn remove_bookmark(&mut self, path: &Path) -> Result<()> {
        let count = self.settings.bookmarks.len();
        self.settings.bookmarks.retain(|bookmark| bookmark.path != path);
        if self.settings.bookmarks.len() == count {
            return Err(Error::BookmarkDoesNotExist(path.display().to_string()));
        }

        self.changed().await
    }

    pub fn favorites(&self) -> &[PathBuf] {
        &self.settings.favorite_files
    }

    pub async fn add_favorite(&mut self, path: &Path) -> Result<bool> {
        if self.settings.favorite_files.iter().any(|favorite| favorite == path) {
            return Ok(false);
        }

        self.settings.favorite_files.push(path.to_owned());
        self.changed().await?;
        Ok(true)
    }

    pub async fn remove_favorite(&mut self, path: &Path) -> Result<bool> {
        let count = self.settings.favorite_files.len();
        self.settings.favorite_files.retain(|favorite| favorite != path);
        if self.settings.favorite_files.len() == count {
            return Ok(false);
        }

        self.changed().await?;
        Ok(true)
    }

    pub fn custom_setting(&self, key: &str) -> Option<&Value> {
        self.settings.custom_settings.get(key)
    }

    pub async fn set_custom_setting(&mut self, key: &str, value: Value) -> Result<()> {
        let old = self
            .settings
            .custom_settings
            .insert(key.to_owned(), value.clone())
            .unwrap_or(Value::Null);
        self.notify(&format!("custom_settings.{key}"), &old, &value);
        self.changed().await
    }

    /// Reports problems and drops recent directories and bookmarks whose
    /// paths no longer exist.
    pub async fn validate(&mut self) -> Result<Vec<String>> {
        let mut problems = Vec::new();
        let settings = &self.settings;

        if let Some(last) = &settings.last_directory {
            if !file::try_exists(last).await? {
                problems.push(format!("last directory does not exist: {}", last.display()));
            }
        }

        if settings.performance.max_worker_threads < 1 {
            problems.push("max worker threads must be at least 1".to_owned());
        }

        if settings.compression.compression_level > crate::archive::MAX_LEVEL {
            problems.push(format!(
                "compression level {} is not in range 0-{}",
                settings.compression.compression_level,
                crate::archive::MAX_LEVEL
            ));
        }

        if settings.search.max_search_results == 0 {
            problems.push("max search results must be at least 1".to_owned());
        }

        let mut recent = Vec::new();
        for dir in &settings.recent_directories {
            if file::try_exists(dir).await? {
                recent.push(dir.clone());
            } else {
                problems.push(format!("recent directory does not exist: {}", dir.display()));
            }
        }

        let mut bookmarks = Vec::new();
        for bookmark in &settings.bookmarks {
            if file::try_exists(&bookmark.path).await? {
                bookmarks.push(bookmark.clone());
            } else {
                problems.push(format!(
                    "bookmark path does not exist: {}",
                    bookmark.path.display()
                ));
            }
        }

        let pruned = recent.len() != settings.recent_directories.len()
            || bookmarks.len() != settings.bookmarks.len();
        self.settings.recent_directories = recent;
        self.settings.bookmarks = bookmarks;
        if pruned {
            self.changed().await?;
        }

        Ok(problems)
    }
}

/// `settings.json` -> `settings.backup.json`
fn backup_path(file: &Path) -> PathBuf {
    file.with_extension("backup.json")
}

fn pointer(key: &str) -> Result<String> {
    if key.is_empty() || key.contains('/') || key.contains('~') {
        return Err(Error::UnknownSetting(key.to_owned()));
    }

    Ok(format!("/{}", key.replace('.', "/")))
}

/// Replaces the value at `key` inside serialised settings, returning the
/// previous value. The slot must exist and the result must still
/// deserialise; otherwise `current` is left unchanged.
fn assign(current: &mut Value, key: &str, value: Value) -> Result<Value> {
    let pointer = pointer(key)?;
    let slot = current
        .pointer_mut(&pointer)
        .ok_or_else(|| Error::UnknownSetting(key.to_owned()))?;
    let old = std::mem::replace(slot, value);

    if let Err(err) = serde_json::from_value::<Settings>(current.clone()) {
        if let Some(slot) = current.pointer_mut(&pointer) {
            *slot = old;
        }

        return Err(Error::InvalidSetting {
            key: key.to_owned(),
            reason: err.to_string(),
        });
    }

    Ok(old)
}

/// Applies `data` field by field; unknown keys are skipped and invalid
/// values keep the value from `base`.
fn overlay(base: &Settings, data: &Value) -> Result<Settings> {
    let Value::Object(data) = data else {
        return Err(Error::InvalidSetting {
            key: String::new(),
            reason: "settings must be a JSON object".to_owned(),
        });
    };

    let mut current = serde_json::to_value(base)?;
    for (key, value) in data {
        match value {
            Value::Object(fields) if is_section(key) => {
                for (field, field_value) in fields {
                    apply(&mut current, &format!("{key}.{field}"), field_value);
                }
            }
            _ => apply(&mut current, key, value),
        }
    }

    Ok(serde_json::from_value(current)?)
}

fn apply(current: &mut Value, key: &str, value: &Value) {
    match assign(current, key, value.clone()) {
        Ok(_) => {}
        Err(Error::UnknownSetting(_)) => debug!("ignoring unknown setting `{key}`"),
        Err(err) => warn!("{err}, keeping previous value"),
    }
}

async fn read_settings(path: &Path) -> Result<Option<Settings>> {
    let Some(data) = read_json::<Value>(path).await? else {
        return Ok(None);
    };

    overlay(&Settings::default(), &data).map(Some)
}
