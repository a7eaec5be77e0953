use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

static INVALID_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00]"#).unwrap());

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

const FALLBACK_NAME: &str = "unnamed_file";

/// Makes `name` safe to use as a file name on any common filesystem.
pub fn clean_filename(name: &str, replacement: &str) -> String {
    let replaced = INVALID_CHARS.replace_all(name, replacement);
    let cleaned = replaced.trim().trim_end_matches('.').trim_end();
    if cleaned.is_empty() {
        return FALLBACK_NAME.to_owned();
    }

    let stem = Path::new(cleaned)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_uppercase())
        .unwrap_or_default();
    if RESERVED_NAMES.contains(&stem.as_str()) {
        return format!("{replacement}{cleaned}");
    }

    cleaned.to_owned()
}

/// Whether `target` resolves to `base` or a path below it. Symlinks are
/// resolved for the parts that exist.
pub fn is_safe_path(base: &Path, target: &Path) -> bool {
    let Ok(base) = base.canonicalize() else {
        return false;
    };

    let joined = base.join(target);
    let resolved = resolve_existing(&joined);
    resolved.starts_with(&base)
}

/// Lexical containment check; `..` components are folded without touching
/// the filesystem.
pub fn is_within(base: &Path, target: &Path) -> bool {
    normalize(&base.join(target)).starts_with(normalize(base))
}

pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // `..` above the root is the root
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            Component::CurDir => {}
            _ => normalized.push(component),
        }
    }

    normalized
}

fn resolve_existing(path: &Path) -> PathBuf {
    let normalized = normalize(path);
    let mut existing = normalized.as_path();
    let mut rest = Vec::new();

    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut resolved = canonical;
            for part in rest.iter().rev() {
                resolved.push(part);
            }
            return resolved;
        }

        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_owned());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}
