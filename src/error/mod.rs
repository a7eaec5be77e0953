mod from;

use std::{fmt::Display, path::PathBuf, time::Duration};

use log::warn;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("`{0}` does not exist")]
    FileDoesNotExist(PathBuf),

    #[error("`{0}` already exists")]
    FileAlreadyExists(PathBuf),

    #[error("`{0}` is the same file as its source")]
    SameFile(PathBuf),

    #[error("cannot copy `{src}` into itself at `{dst}`")]
    CopyIntoItself { src: PathBuf, dst: PathBuf },

    #[error("`{0}` is not a directory")]
    FileIsNotDirectory(PathBuf),

    #[error("`{0}` is a directory")]
    FileIsDirectory(PathBuf),

    #[error("permission denied for `{0}`")]
    PermissionDenied(PathBuf),

    #[error("`{0}` is not a valid name")]
    InvalidName(String),

    #[error("path is empty")]
    EmptyPath,

    #[error("already at root directory")]
    AlreadyAtRoot,

    #[error("home directory is unknown")]
    NoHomeDirectory,

    #[error("no back history available")]
    NoBackHistory,

    #[error("no forward history available")]
    NoForwardHistory,

    #[error("bookmark `{0}` already exists")]
    BookmarkAlreadyExists(String),

    #[error("bookmark `{0}` does not exist")]
    BookmarkDoesNotExist(String),

    #[error("clipboard is empty")]
    ClipboardEmpty,

    #[error("setting `{0}` does not exist")]
    UnknownSetting(String),

    #[error("invalid value for setting `{key}`: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("unsupported archive format `{0}`")]
    UnsupportedFormat(String),

    #[error("could not detect archive format of `{0}`")]
    UnknownArchiveFormat(PathBuf),

    #[error("compression level {0} is not in range 0-9")]
    InvalidCompressionLevel(u32),

    #[error("no input files given")]
    NoInputs,

    #[error("gzip compresses exactly one file")]
    GzipSingleFile,

    #[error("invalid or corrupted archive `{path}`: {reason}")]
    CorruptArchive { path: PathBuf, reason: String },

    #[error("archive `{0}` is encrypted")]
    EncryptedArchive(PathBuf),

    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("copy of `{0}` does not match its source")]
    VerificationFailed(PathBuf),

    #[error("unsupported script type `{0}`")]
    UnsupportedScript(String),

    #[error("no application available for `{0}`")]
    NoApplication(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Cli(String),

    #[error(transparent)]
    Other(AnyError),
}

#[derive(Error, Debug)]
pub struct AnyError(anyhow::Error);

impl Display for AnyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for AnyError {
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

impl Error {
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Other(AnyError(error.into()))
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Error::Other(AnyError(error))
    }
}

pub fn handle_error(result: Result<()>) {
    if let Err(err) = result {
        warn!("{err}");
    }
}
