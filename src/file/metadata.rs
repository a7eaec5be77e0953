use std::{
    fmt,
    os::unix::fs::{MetadataExt, PermissionsExt},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use nix::unistd::{access, AccessFlags};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{
    error::Result,
    format::format_mode,
    hash::{hash_file, HashAlgorithm},
};

use super::{absolute, extension_of, is_hidden, name_of, symlink_metadata};

/// Files larger than this are not hashed by [`file_info`].
pub const HASH_SIZE_LIMIT: u64 = 10 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl FileKind {
    pub fn from_file_type(file_type: std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        }
    }

    pub fn is_file(self) -> bool {
        self == FileKind::File
    }

    pub fn is_directory(self) -> bool {
        self == FileKind::Directory
    }

    pub fn is_symlink(self) -> bool {
        self == FileKind::Symlink
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::File => write!(f, "file"),
            FileKind::Directory => write!(f, "directory"),
            FileKind::Symlink => write!(f, "symlink"),
            FileKind::Other => write!(f, "special"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub kind: FileKind,
    pub extension: String,
    pub mime_type: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    pub permissions: String,
    pub is_readable: bool,
    pub is_writable: bool,
    pub is_executable: bool,
    pub is_hidden: bool,
    pub owner: u32,
    pub group: u32,
    pub inode: u64,
    pub link_target: Option<PathBuf>,
    pub md5: Option<String>,
}

pub async fn file_info(path: &Path) -> Result<FileInfo> {
    let native = symlink_metadata(path).await?;
    let kind = FileKind::from_file_type(native.file_type());
    let is_file = kind.is_file();

    let link_target = if kind.is_symlink() {
        fs::read_link(path).await.ok()
    } else {
        None
    };

    let md5 = if is_file && native.len() < HASH_SIZE_LIMIT {
        hash_file(path.to_owned(), HashAlgorithm::Md5).await.ok()
    } else {
        None
    };

    Ok(FileInfo {
        name: name_of(path),
        path: absolute(path)?,
        size: native.len(),
        kind,
        extension: if is_file {
            extension_of(path)
        } else {
            String::new()
        },
        mime_type: if is_file { guess_mime(path) } else { None },
        created: native.created().ok().map(Into::into),
        modified: native.modified().ok().map(Into::into),
        accessed: native.accessed().ok().map(Into::into),
        permissions: format_mode(native.permissions().mode()),
        is_readable: has_access(path, AccessFlags::R_OK),
        is_writable: has_access(path, AccessFlags::W_OK),
        is_executable: has_access(path, AccessFlags::X_OK),
        is_hidden: is_hidden(path),
        owner: native.uid(),
        group: native.gid(),
        inode: native.ino(),
        link_target,
        md5,
    })
}

pub fn has_access(path: &Path, flags: AccessFlags) -> bool {
    access(path, flags).is_ok()
}

pub fn guess_mime(path: &Path) -> Option<String> {
    let mime = match extension_of(path).as_str() {
        ".txt" | ".log" | ".ini" | ".cfg" | ".conf" => "text/plain",
        ".md" => "text/markdown",
        ".csv" => "text/csv",
        ".html" | ".htm" => "text/html",
        ".css" => "text/css",
        ".xml" => "application/xml",
        ".json" => "application/json",
        ".yaml" | ".yml" => "application/yaml",
        ".toml" => "application/toml",
        ".js" => "text/javascript",
        ".py" => "text/x-python",
        ".rs" => "text/x-rust",
        ".c" | ".h" => "text/x-c",
        ".cpp" | ".hpp" => "text/x-c++",
        ".java" => "text/x-java",
        ".sh" => "application/x-sh",
        ".sql" => "application/sql",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".bmp" => "image/bmp",
        ".svg" => "image/svg+xml",
        ".webp" => "image/webp",
        ".ico" => "image/vnd.microsoft.icon",
        ".pdf" => "application/pdf",
        ".doc" => "application/msword",
        ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".xls" => "application/vnd.ms-excel",
        ".xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".ppt" => "application/vnd.ms-powerpoint",
        ".pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".zip" => "application/zip",
        ".tar" => "application/x-tar",
        ".gz" | ".tgz" => "application/gzip",
        ".bz2" => "application/x-bzip2",
        ".zst" => "application/zstd",
        ".7z" => "application/x-7z-compressed",
        ".rar" => "application/vnd.rar",
        ".mp3" => "audio/mpeg",
        ".wav" => "audio/wav",
        ".flac" => "audio/flac",
        ".ogg" => "audio/ogg",
        ".mp4" => "video/mp4",
        ".avi" => "video/x-msvideo",
        ".mkv" => "video/x-matroska",
        ".mov" => "video/quicktime",
        _ => return None,
    };
    Some(mime.to_owned())
}
