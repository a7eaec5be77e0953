use std::{ops::RangeInclusive, path::PathBuf, time::Duration};

use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Subcommand};
use concolor_clap::ColorChoice;
use humantime::parse_duration;

use crate::{
    archive::{ArchiveFormat, MAX_LEVEL},
    file::{SortBy, DEFAULT_SIZE_DEPTH},
    hash::HashAlgorithm,
    launch::AppKind,
    nav::DEFAULT_TREE_DEPTH,
};

use super::parse::{parse_range_inclusive, parse_size, parse_time};

const COMPRESSION_LEVEL_RANGE: RangeInclusive<u32> = 0..=MAX_LEVEL;
const TASK_COUNT_RANGE: RangeInclusive<usize> = 1..=1024;

fn parse_compression_level(s: &str) -> Result<u32, String> {
    parse_range_inclusive(s, COMPRESSION_LEVEL_RANGE)
}

fn parse_task_count(s: &str) -> Result<usize, String> {
    parse_range_inclusive(s, TASK_COUNT_RANGE)
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Directory to list (defaults to the session directory)
    pub path: Option<PathBuf>,

    /// Include hidden files
    #[arg(short = 'a', long, default_value_t = false)]
    pub all: bool,

    /// Sort key (defaults to the configured one)
    #[arg(short = 's', long, value_name = "KEY")]
    pub sort: Option<SortBy>,

    /// Reverse the sort order
    #[arg(short = 'r', long, default_value_t = false)]
    pub reverse: bool,

    /// Show size, modification time and permissions
    #[arg(short = 'l', long, default_value_t = false)]
    pub long: bool,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct MaybePathArgs {
    /// Defaults to the session directory
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TouchArgs {
    pub path: PathBuf,

    /// Initial content
    #[arg(short = 'c', long, value_name = "TEXT", default_value = "")]
    pub content: String,

    /// Replace an existing file
    #[arg(short = 'f', long, default_value_t = false)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CatArgs {
    pub path: PathBuf,

    /// Print files above the preview size limit
    #[arg(short = 'f', long, default_value_t = false)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    pub path: PathBuf,

    /// Text to write (read from stdin when omitted)
    pub content: Option<String>,

    /// Append instead of truncating
    #[arg(short = 'a', long, default_value_t = false)]
    pub append: bool,
}

#[derive(Args, Debug)]
pub struct MkdirArgs {
    /// Name of the new directory
    pub name: String,

    /// Parent directory (defaults to the session directory)
    #[arg(short = 'p', long, value_name = "DIR")]
    pub parent: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Files or directories to delete
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Delete non-empty directories
    #[arg(short = 'r', long, default_value_t = false)]
    pub recursive: bool,

    /// Confirm deletion when `security.confirm_delete` is set
    #[arg(short = 'y', long, default_value_t = false)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct CopyArgs {
    pub src: PathBuf,

    pub dst: PathBuf,

    /// Replace an existing destination (implied when overwrites need no
    /// confirmation)
    #[arg(short = 'f', long, default_value_t = false)]
    pub overwrite: bool,

    /// Compare hashes after copying a file
    #[arg(long, default_value_t = false)]
    pub verify: bool,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    pub src: PathBuf,

    pub dst: PathBuf,

    /// Replace an existing destination
    #[arg(short = 'f', long, default_value_t = false)]
    pub overwrite: bool,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    pub path: PathBuf,

    pub new_name: String,
}

#[derive(Args, Debug)]
pub struct UsageArgs {
    /// Defaults to the session directory
    pub path: Option<PathBuf>,

    /// Maximum depth to descend
    #[arg(short = 'd', long, value_name = "NUM", default_value_t = DEFAULT_SIZE_DEPTH)]
    pub depth: usize,

    /// Count hidden files
    #[arg(short = 'a', long, default_value_t = false)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct HashArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    #[arg(short = 'a', long, default_value_t = HashAlgorithm::Md5)]
    pub algorithm: HashAlgorithm,
}

#[derive(Args, Debug)]
pub struct DupesArgs {
    /// Defaults to the session directory
    pub path: Option<PathBuf>,

    /// Ignore files smaller than this (e.g. '10k', '2MiB')
    #[arg(long, value_name = "SIZE", default_value = "0", value_parser = parse_size)]
    pub min_size: u64,

    /// Only consider these extensions
    #[arg(short = 'e', long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Only look at the top-level files
    #[arg(long, default_value_t = false)]
    pub no_recursive: bool,

    #[arg(short = 'a', long, default_value_t = HashAlgorithm::Md5)]
    pub algorithm: HashAlgorithm,

    /// Number of background tasks to use (defaults to the configured worker count)
    #[arg(short = 'j', long, value_name = "NUM", value_parser = parse_task_count)]
    pub tasks: Option<usize>,
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    pub path: PathBuf,

    /// Directory to place the backup in
    #[arg(short = 'd', long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Name the backup `<stem>_backup` instead of using a timestamp
    #[arg(long, default_value_t = false)]
    pub no_timestamp: bool,
}

#[derive(Args, Debug)]
pub struct CleanNameArgs {
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Replacement for invalid characters
    #[arg(short = 'r', long, value_name = "TEXT", default_value = "_")]
    pub replacement: String,
}

#[derive(Args, Debug)]
pub struct CleanTempArgs {
    pub dir: PathBuf,

    /// Only remove files older than this (e.g. '2h', '7days')
    #[arg(long, value_name = "AGE", value_parser = parse_duration)]
    pub older_than: Option<Duration>,
}

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Defaults to the session directory
    pub path: Option<PathBuf>,

    /// Maximum depth to expand
    #[arg(short = 'd', long, value_name = "NUM", default_value_t = DEFAULT_TREE_DEPTH)]
    pub depth: usize,
}

#[derive(Args, Debug)]
pub struct NavArgs {
    #[command(subcommand)]
    pub command: NavCommand,
}

#[derive(Subcommand, Debug)]
pub enum NavCommand {
    /// Print the session directory
    Pwd,
    /// Change the session directory
    Cd(PathArgs),
    /// Go back in history
    Back,
    /// Go forward in history
    Forward,
    /// Go to the parent directory
    Up,
    /// Go to the home directory
    Home,
    /// Show the back and forward history
    History {
        /// Forget the history instead
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
    /// Show recently visited directories
    Recent {
        #[arg(short = 'n', long, value_name = "NUM")]
        limit: Option<usize>,
    },
    /// Show the path components of the session directory
    Crumbs,
    /// Show mounted filesystems and their usage
    Drives,
    /// Show entry counts and disk usage for a directory
    Info(MaybePathArgs),
}

#[derive(Args, Debug)]
pub struct BookmarkArgs {
    #[command(subcommand)]
    pub command: BookmarkCommand,
}

#[derive(Subcommand, Debug)]
pub enum BookmarkCommand {
    /// Bookmark a directory (defaults to the session directory)
    Add {
        name: String,
        path: Option<PathBuf>,
    },
    /// Remove a bookmark
    Rm { name: String },
    /// List bookmarks
    Ls,
    /// Change the session directory to a bookmark
    Go { name: String },
}

#[derive(Args, Debug)]
pub struct ClipArgs {
    #[command(subcommand)]
    pub command: ClipCommand,
}

#[derive(Subcommand, Debug)]
pub enum ClipCommand {
    /// Hold paths for copying
    Copy {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Hold paths for moving
    Cut {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Copy or move the held paths into a directory
    Paste(MaybePathArgs),
    /// Show the held paths
    Show,
    /// Forget the held paths
    Clear,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Glob (or regex with --regex) matched against file names
    #[arg(default_value = "*")]
    pub pattern: String,

    /// Directory to search (defaults to the session directory)
    #[arg(short = 'p', long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Text that matching files must contain
    #[arg(short = 'c', long, value_name = "TEXT")]
    pub content: Option<String>,

    /// Required file name suffix (e.g. '.rs')
    #[arg(short = 't', long = "type", value_name = "EXT")]
    pub file_type: Option<String>,

    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Modified at or after this time (e.g. '2024-01-31')
    #[arg(long, value_name = "TIME", value_parser = parse_time)]
    pub after: Option<DateTime<Utc>>,

    /// Modified at or before this time
    #[arg(long, value_name = "TIME", value_parser = parse_time)]
    pub before: Option<DateTime<Utc>>,

    #[arg(short = 's', long, default_value_t = false)]
    pub case_sensitive: bool,

    /// Treat the pattern as a regular expression
    #[arg(short = 'r', long, default_value_t = false)]
    pub regex: bool,

    /// Maximum number of results (defaults to the configured limit)
    #[arg(short = 'n', long, value_name = "NUM")]
    pub max_results: Option<usize>,

    /// Walk the filesystem even when an index is available
    #[arg(long, default_value_t = false)]
    pub no_index: bool,

    /// Only search the directory itself, not its subdirectories
    #[arg(long, default_value_t = false)]
    pub no_recursive: bool,

    /// Show previous searches instead of searching
    #[arg(long, default_value_t = false, conflicts_with = "clear_history")]
    pub history: bool,

    /// Forget previous searches
    #[arg(long, default_value_t = false)]
    pub clear_history: bool,
}

#[derive(Args, Debug)]
pub struct QuickSearchArgs {
    pub query: String,

    /// Directory to search (defaults to the session directory)
    #[arg(short = 'p', long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    #[arg(short = 'n', long, value_name = "NUM", default_value_t = crate::search::DEFAULT_QUICK_RESULTS)]
    pub max_results: usize,
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub command: IndexCommand,
}

#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Index the text files below a directory
    Update(MaybePathArgs),
    /// Drop the whole index
    Clear,
    /// Show index and history statistics
    Stats,
}

#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Files and directories to archive
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Archive to create
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: PathBuf,

    /// Archive format (defaults to the output extension, then the configured one)
    #[arg(short = 'f', long)]
    pub format: Option<ArchiveFormat>,

    /// Compression level (0-9)
    #[arg(short = 'l', long, value_name = "NUM", value_parser = parse_compression_level)]
    pub level: Option<u32>,

    /// Glob of names to leave out
    #[arg(short = 'x', long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Only print the estimated archive size
    #[arg(long, default_value_t = false)]
    pub estimate: bool,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    pub archive: PathBuf,

    /// Destination directory
    #[arg(short = 'o', long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Replace existing files
    #[arg(short = 'f', long, default_value_t = false)]
    pub overwrite: bool,

    /// Only extract entries matching these globs
    #[arg(long, value_name = "GLOB")]
    pub only: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ArchiveInfoArgs {
    pub archive: PathBuf,

    /// List every entry
    #[arg(short = 'l', long, default_value_t = false)]
    pub list: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the settings file location
    Path,
    /// Print a setting by dotted key, or every setting
    Get { key: Option<String> },
    /// Change a setting; the value is parsed as JSON, falling back to a string
    Set {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Restore the defaults of one section, or of everything
    Reset { section: Option<String> },
    /// Write settings to a file
    Export {
        path: PathBuf,
        /// Sections to include (defaults to all)
        sections: Vec<String>,
    },
    /// Read settings from a file
    Import {
        path: PathBuf,
        /// Start from defaults instead of merging into the current settings
        #[arg(long, default_value_t = false)]
        replace: bool,
    },
    /// Report problems and drop stale paths
    Validate,
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    pub path: PathBuf,

    /// Application kind to open with
    #[arg(short = 'a', long)]
    pub app: Option<AppKind>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    pub script: PathBuf,

    /// Arguments passed to the script
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Kill the script after this long
    #[arg(short = 't', long, value_parser = parse_duration, default_value = "30s")]
    pub timeout: Duration,
}

#[derive(Args, Debug)]
pub struct AppsArgs {
    /// Show the default application for this file instead of the table
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Settings file (defaults to `$FILEMAN_CONFIG`, then the user config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Print stats after completion
    #[arg(long, default_value_t = false)]
    pub stats: bool,

    #[command(flatten)]
    pub logger: LoggerArgs,
}

#[derive(Args, Debug)]
pub struct LoggerArgs {
    /// When to use color in output
    #[arg(short, long, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Print more output
    #[arg(short, long, action = ArgAction::Count, group = "verbosity")]
    pub verbose: u8,

    /// Print less output
    #[arg(short, long, action = ArgAction::Count, group = "verbosity")]
    pub quiet: u8,
}

#[cfg(test)]
mod tests {
    use crate::launch::DEFAULT_SCRIPT_TIMEOUT;

    use super::{parse_compression_level, parse_task_count};

    #[test]
    fn compression_levels_include_stored() {
        assert_eq!(parse_compression_level("0"), Ok(0));
        assert_eq!(parse_compression_level("9"), Ok(9));
        assert!(parse_compression_level("10").is_err());
    }

    #[test]
    fn task_counts_are_positive() {
        assert!(parse_task_count("0").is_err());
        assert_eq!(parse_task_count("8"), Ok(8));
    }

    #[test]
    fn default_run_timeout_matches_library() {
        let parsed = humantime::parse_duration("30s").unwrap();
        assert_eq!(parsed, DEFAULT_SCRIPT_TIMEOUT);
    }
}
