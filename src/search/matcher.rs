use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use globset::{GlobBuilder, GlobMatcher};
use regex::{Regex, RegexBuilder};

use crate::{
    error::{Error, Result},
    file::extension_of,
};

const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".py", ".js", ".html", ".css", ".json", ".xml", ".md", ".csv", ".log", ".ini", ".cfg",
    ".conf", ".yaml", ".yml", ".sql", ".sh", ".bat", ".c", ".cpp", ".h", ".java", ".php", ".rb",
    ".go", ".rs", ".kt", ".swift", ".toml",
];

const SNIFF_SIZE: u64 = 1024;
const MAX_LINE_CHARS: usize = 200;

/// File name matcher built from a glob or, with `regex`, a regular
/// expression searched anywhere in the name.
#[derive(Clone, Debug)]
pub enum NameMatcher {
    Glob(GlobMatcher),
    Regex(Regex),
}

impl NameMatcher {
    pub fn new(pattern: &str, case_sensitive: bool, regex: bool) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidPattern {
            pattern: pattern.to_owned(),
            reason,
        };

        if regex {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(!case_sensitive)
                .build()
                .map_err(|err| invalid(err.to_string()))?;
            Ok(NameMatcher::Regex(regex))
        } else {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(!case_sensitive)
                .literal_separator(false)
                .build()
                .map_err(|err| invalid(err.to_string()))?;
            Ok(NameMatcher::Glob(glob.compile_matcher()))
        }
    }

    pub fn is_match(&self, name: &str) -> bool {
        match self {
            NameMatcher::Glob(glob) => glob.is_match(name),
            NameMatcher::Regex(regex) => regex.is_match(name),
        }
    }
}

/// Known text extensions, otherwise a sniff of the first KiB: no NUL bytes
/// and more than 70% printable characters.
pub fn is_text_file(path: &Path) -> bool {
    if TEXT_EXTENSIONS.contains(&extension_of(path).as_str()) {
        return true;
    }

    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut chunk = Vec::with_capacity(SNIFF_SIZE as usize);
    if file.take(SNIFF_SIZE).read_to_end(&mut chunk).is_err() {
        return false;
    }

    looks_like_text(&chunk)
}

pub fn looks_like_text(chunk: &[u8]) -> bool {
    if chunk.is_empty() {
        return true;
    }
    if chunk.contains(&0) {
        return false;
    }

    let printable = chunk
        .iter()
        .filter(|&&byte| (32..=126).contains(&byte) || matches!(byte, b'\t' | b'\n' | b'\r'))
        .count();
    printable * 10 > chunk.len() * 7
}

/// First line containing `text`, trimmed and cut to 200 characters, with its
/// 1-based line number. Invalid UTF-8 is replaced rather than rejected.
pub fn find_in_file(path: &Path, text: &str, case_sensitive: bool) -> Result<Option<(String, u64)>> {
    let needle = if case_sensitive {
        text.to_owned()
    } else {
        text.to_lowercase()
    };

    let mut reader = BufReader::new(File::open(path)?);
    let mut buffer = Vec::new();
    let mut line_number = 0;

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(None);
        }
        line_number += 1;

        let line = String::from_utf8_lossy(&buffer);
        let found = if case_sensitive {
            line.contains(&needle)
        } else {
            line.to_lowercase().contains(&needle)
        };

        if found {
            let excerpt = line.trim().chars().take(MAX_LINE_CHARS).collect();
            return Ok(Some((excerpt, line_number)));
        }
    }
}
