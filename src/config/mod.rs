mod manager;
mod paths;


use std::{collections::BTreeMap, path::PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{archive::ArchiveFormat, file::SortBy};

pub use self::{
    manager::{Observer, SettingsManager},
    paths::{default_config_file, state_file, ENV_VAR_CONFIG},
};

pub const CONFIG_VERSION: &str = "1.0";

/// Names of the typed sections, in the order they are serialised.
pub const SECTIONS: [&str; 5] = ["browser", "search", "compression", "security", "performance"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub show_hidden_files: bool,
    pub show_file_extensions: bool,
    pub sort_by: SortBy,
    pub sort_ascending: bool,
    pub group_directories_first: bool,
    /// Stored for other front ends, not read by the CLI.
    pub confirm_navigation: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        BrowserSettings {
            show_hidden_files: false,
            show_file_extensions: true,
            sort_by: SortBy::Name,
            sort_ascending: true,
            group_directories_first: true,
            confirm_navigation: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub max_search_results: usize,
    pub search_in_content: bool,
    pub case_sensitive_search: bool,
    pub use_regex: bool,
    pub search_subdirectories: bool,
    pub exclude_patterns: Vec<String>,
    pub enable_indexing: bool,
    /// Stored for other front ends, not read by the CLI.
    pub max_indexed_file_size: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            max_search_results: 1000,
            search_in_content: false,
            case_sensitive_search: false,
            use_regex: false,
            search_subdirectories: true,
            exclude_patterns: ["*.tmp", "*.log", ".git", ".svn"]
                .map(str::to_owned)
                .to_vec(),
            enable_indexing: false,
            max_indexed_file_size: 1024 * 1024,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    pub default_format: ArchiveFormat,
    pub compression_level: u32,
    pub create_subdir_on_extract: bool,
    pub preserve_permissions: bool,
    pub overwrite_existing: bool,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        CompressionSettings {
            default_format: ArchiveFormat::Zip,
            compression_level: 6,
            create_subdir_on_extract: true,
            preserve_permissions: true,
            overwrite_existing: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    pub confirm_delete: bool,
    pub confirm_overwrite: bool,
    pub backup_before_edit: bool,
    pub block_executable_files: bool,
    pub restricted_paths: Vec<PathBuf>,
    pub allow_system_access: bool,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        SecuritySettings {
            confirm_delete: true,
            confirm_overwrite: true,
            backup_before_edit: false,
            block_executable_files: false,
            restricted_paths: Vec::new(),
            allow_system_access: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSettings {
    pub file_preview_size_limit: u64,
    /// Stored for other front ends, not read by the CLI.
    pub max_recent_files: usize,
    pub max_recent_directories: usize,
    pub max_worker_threads: usize,
    /// Stored for other front ends, not read by the CLI.
    pub enable_background_operations: bool,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        PerformanceSettings {
            file_preview_size_limit: 10 * 1024 * 1024,
            max_recent_files: 20,
            max_recent_directories: 15,
            max_worker_threads: 4,
            enable_background_operations: true,
        }
    }
}

/// A bookmarked path kept in the settings file, unique by path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathBookmark {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub icon: String,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub config_version: String,
    pub last_updated: Option<DateTime<Utc>>,
    pub browser: BrowserSettings,
    pub search: SearchSettings,
    pub compression: CompressionSettings,
    pub security: SecuritySettings,
    pub performance: PerformanceSettings,
    pub last_directory: Option<PathBuf>,
    pub startup_directory: Option<PathBuf>,
    pub recent_directories: Vec<PathBuf>,
    pub bookmarks: Vec<PathBookmark>,
    pub favorite_files: Vec<PathBuf>,
    pub custom_settings: BTreeMap<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            config_version: CONFIG_VERSION.to_owned(),
            last_updated: None,
            browser: BrowserSettings::default(),
            search: SearchSettings::default(),
            compression: CompressionSettings::default(),
            security: SecuritySettings::default(),
            performance: PerformanceSettings::default(),
            last_directory: None,
            startup_directory: None,
            recent_directories: Vec::new(),
            bookmarks: Vec::new(),
            favorite_files: Vec::new(),
            custom_settings: BTreeMap::new(),
        }
    }
}

pub fn is_section(name: &str) -> bool {
    SECTIONS.contains(&name)
}
