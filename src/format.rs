use std::{borrow::Cow, path::Path, time::SystemTime};

use chrono::{DateTime, Local, Utc};
use humansize::{ToF64, Unsigned, BINARY, DECIMAL};

pub fn format_path(path: &Path) -> String {
    let path_str = path.to_string_lossy();
    let escaped_path = snailquote::escape(&path_str);
    if let Cow::Owned(owned_path) = escaped_path {
        owned_path
    } else {
        path_str.to_string()
    }
}

pub fn format_size<T: ToF64 + Unsigned>(input: T) -> String {
    humansize::format_size(input, DECIMAL)
}

pub fn format_size_binary<T: ToF64 + Unsigned>(input: T) -> String {
    humansize::format_size(input, BINARY)
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn format_system_time(time: SystemTime) -> String {
    format_time(&time.into())
}

/// Octal permission digits of a Unix mode, e.g. `644`.
pub fn format_mode(mode: u32) -> String {
    format!("{:03o}", mode & 0o777)
}
