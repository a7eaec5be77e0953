use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use clap::builder::styling::AnsiColor;
use itertools::Itertools;
use log::{debug, warn};
use tokio::task::spawn_blocking;

use crate::{
    error::{Error, Result},
    format::format_path,
    hash::{hash_file_blocking, HashAlgorithm},
    stats::{report, ProgressFn},
    task::{BoundedJoinSet, CancelFlag},
};

use super::{extension_of, symlink_metadata, Walker};

/// Hash -> files with that content; only groups of two or more are kept.
pub type DuplicateGroups = BTreeMap<String, Vec<PathBuf>>;

#[derive(Clone)]
pub struct DuplicateOptions {
    pub recursive: bool,
    pub min_size: u64,
    /// Extensions to consider, with or without the leading dot; empty means
    /// all files.
    pub extensions: Vec<String>,
    pub algorithm: HashAlgorithm,
    pub jobs: usize,
    pub cancel: CancelFlag,
    pub progress: Option<ProgressFn>,
}

impl Default for DuplicateOptions {
    fn default() -> Self {
        DuplicateOptions {
            recursive: true,
            min_size: 0,
            extensions: Vec::new(),
            algorithm: HashAlgorithm::Md5,
            jobs: 4,
            cancel: CancelFlag::new(),
            progress: None,
        }
    }
}

pub async fn find_duplicates(dir: &Path, options: DuplicateOptions) -> Result<DuplicateGroups> {
    let metadata = symlink_metadata(dir).await?;
    if !metadata.is_dir() {
        return Err(Error::FileIsNotDirectory(dir.to_owned()));
    }

    let candidates = collect_candidates(dir.to_owned(), &options).await?;

    // files with a unique size cannot have a duplicate
    let by_size = candidates.into_iter().into_group_map();
    let to_hash = by_size
        .into_values()
        .filter(|paths| paths.len() > 1)
        .flatten()
        .collect::<Vec<_>>();

    let total = to_hash.len() as u64;
    let mut hashed = 0;
    let mut by_hash = DuplicateGroups::new();
    let mut tasks = BoundedJoinSet::new(options.jobs);
    let algorithm = options.algorithm;

    for path in to_hash {
        options.cancel.check()?;
        tasks
            .spawn_blocking(move || {
                let hash = hash_file_blocking(&path, algorithm);
                (path, hash)
            })
            .await?;

        while let Some(result) = tasks.try_join_next() {
            let (path, hash) = result?;
            hashed += 1;
            report(options.progress.as_ref(), hashed, total);
            insert_hash(&mut by_hash, path, hash);
        }
    }

    while let Some(result) = tasks.join_next().await {
        let (path, hash) = result?;
        hashed += 1;
        report(options.progress.as_ref(), hashed, total);
        insert_hash(&mut by_hash, path, hash);
    }

    by_hash.retain(|_, paths| {
        paths.sort();
        paths.len() > 1
    });

    let style = AnsiColor::Yellow.on_default();
    for (hash, paths) in &by_hash {
        debug!("{style}duplicate group{style:#} {hash} ({} files)", paths.len());
    }

    Ok(by_hash)
}

fn insert_hash(by_hash: &mut DuplicateGroups, path: PathBuf, hash: Result<String>) {
    match hash {
        Ok(hash) => by_hash.entry(hash).or_default().push(path),
        Err(err) => {
            let formatted_path = format_path(&path);
            warn!("skipped {formatted_path}: {err}");
        }
    }
}

async fn collect_candidates(
    dir: PathBuf,
    options: &DuplicateOptions,
) -> Result<Vec<(u64, PathBuf)>> {
    let recursive = options.recursive;
    let min_size = options.min_size;
    let extensions = options
        .extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .collect::<Vec<_>>();
    let cancel = options.cancel.clone();

    spawn_blocking(move || {
        let mut walker = Walker::new(&dir);
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut candidates = Vec::new();
        for entry in walker.files() {
            cancel.check()?;

            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.len() < min_size {
                continue;
            }

            let path = entry.into_path();
            if !extensions.is_empty() && !extensions.contains(&extension_of(&path)) {
                continue;
            }

            candidates.push((metadata.len(), path));
        }

        Ok(candidates)
    })
    .await?
}

/// `"TXT"` and `".txt"` both become `".txt"`.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
