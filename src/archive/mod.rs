mod format;
mod gzip;
mod tar;
mod zip;

#[cfg(test)]
mod tests;

use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use clap::builder::styling::AnsiColor;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::task::spawn_blocking;

use crate::{
    error::{Error, Result},
    file::{self, is_within, ExcludeSet, Walker},
    format::{format_path, format_size},
    stats::{report, ArchiveStats, ProgressFn},
    task::CancelFlag,
};

pub use self::format::ArchiveFormat;

pub const DEFAULT_LEVEL: u32 = 6;
pub const MAX_LEVEL: u32 = 9;

const CHUNK_SIZE: usize = 1024 * 1024;

/// Decides whether an archive entry, given by its stored name, is extracted.
pub type EntryFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct CompressOptions {
    pub format: ArchiveFormat,
    pub level: u32,
    /// Globs matched against base names and full paths; matching
    /// directories are not descended into.
    pub excludes: Vec<String>,
    pub cancel: CancelFlag,
    pub progress: Option<ProgressFn>,
}

impl Default for CompressOptions {
    fn default() -> Self {
        CompressOptions {
            format: ArchiveFormat::Zip,
            level: DEFAULT_LEVEL,
            excludes: Vec::new(),
            cancel: CancelFlag::new(),
            progress: None,
        }
    }
}

#[derive(Clone)]
pub struct ExtractOptions {
    pub overwrite: bool,
    /// Apply the modes stored in the archive to extracted files.
    pub preserve_permissions: bool,
    pub filter: Option<EntryFilter>,
    pub cancel: CancelFlag,
    pub progress: Option<ProgressFn>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            overwrite: false,
            preserve_permissions: true,
            filter: None,
            cancel: CancelFlag::new(),
            progress: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ArchiveInfo {
    pub format: ArchiveFormat,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub entries: Vec<String>,
    pub entry_count: usize,
    pub encrypted: bool,
}

/// A file scheduled for compression and the name it is stored under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedEntry {
    pub source: PathBuf,
    pub name: String,
    pub size: u64,
}

/// Progress, cancellation and statistics threaded through a codec run.
pub struct Job {
    pub cancel: CancelFlag,
    pub progress: Option<ProgressFn>,
    pub stats: ArchiveStats,
}

impl Job {
    fn new(cancel: CancelFlag, progress: Option<ProgressFn>) -> Self {
        Job {
            cancel,
            progress,
            stats: ArchiveStats::new(),
        }
    }

    pub fn check(&self) -> Result<()> {
        self.cancel.check()
    }

    pub fn report(&self, current: u64, total: u64) {
        report(self.progress.as_ref(), current, total);
    }

    pub fn record(&mut self, size: u64) {
        self.stats.files_processed += 1;
        self.stats.original_size += size;
    }
}

pub fn supported_formats() -> Vec<ArchiveFormat> {
    ArchiveFormat::ALL.to_vec()
}

/// Files below `inputs` that would be stored, with their archive names.
/// Plain files keep their base name; files inside a directory input are
/// named relative to that directory's parent.
pub fn plan_entries(inputs: &[PathBuf], excludes: &ExcludeSet) -> Result<Vec<PlannedEntry>> {
    let mut entries = Vec::new();

    for input in inputs {
        let metadata = file::metadata_blocking(input)?;
        if metadata.is_file() {
            if excludes.is_excluded(input) {
                continue;
            }

            entries.push(PlannedEntry {
                source: input.clone(),
                name: file::name_of(input),
                size: metadata.len(),
            });
            continue;
        }

        let base = input.parent().unwrap_or(input);
        for entry in Walker::new(input).excludes(excludes.clone()).sorted(true).files() {
            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(err) => {
                    warn!("cannot add {} to archive: {err}", format_path(entry.path()));
                    continue;
                }
            };

            let name = entry
                .path()
                .strip_prefix(base)?
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            entries.push(PlannedEntry {
                source: entry.into_path(),
                name,
                size,
            });
        }
    }

    Ok(entries)
}

pub async fn compress(
    inputs: &[PathBuf],
    output: &Path,
    options: CompressOptions,
) -> Result<ArchiveStats> {
    validate_compress(inputs, output, &options).await?;

    let inputs = inputs.to_vec();
    let output_path = output.to_owned();
    let result = spawn_blocking(move || {
        let excludes = ExcludeSet::new(&options.excludes)?;
        let mut job = Job::new(options.cancel, options.progress);
        info!(
            "compressing to {} as {}",
            format_path(&output_path),
            options.format
        );

        match options.format {
            ArchiveFormat::Gzip => gzip::compress(&inputs[0], &output_path, options.level, &mut job)?,
            ArchiveFormat::Zip => {
                let entries = plan_entries(&inputs, &excludes)?;
                zip::compress(&entries, &output_path, options.level, &mut job)?;
            }
            format => {
                let entries = plan_entries(&inputs, &excludes)?;
                tar::compress(&entries, &output_path, format, options.level, &mut job)?;
            }
        }

        job.stats.compressed_size = fs::metadata(&output_path)?.len();
        Result::Ok(job.stats)
    })
    .await?;

    let mut stats = match result {
        Ok(stats) => stats,
        Err(err) => {
            if file::try_exists(output).await.unwrap_or(false) {
                if let Err(remove_err) = tokio::fs::remove_file(output).await {
                    warn!("failed to remove partial archive: {remove_err}");
                }
            }
            return Err(err);
        }
    };

    stats.end();
    let formatted_path = format_path(output);
    let formatted_size = format_size(stats.compressed_size);
    let style = AnsiColor::Green.on_default();
    debug!(
        "{style}created archive{style:#} {formatted_path} ({formatted_size}, {:.1}% saved)",
        stats.ratio()
    );
    Ok(stats)
}

async fn validate_compress(inputs: &[PathBuf], output: &Path, options: &CompressOptions) -> Result<()> {
    if inputs.is_empty() {
        return Err(Error::NoInputs);
    }

    for input in inputs {
        if !file::try_exists(input).await? {
            return Err(Error::FileDoesNotExist(input.clone()));
        }
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !file::try_exists(parent).await? {
            return Err(Error::FileDoesNotExist(parent.to_owned()));
        }
    }

    if file::try_exists(output).await? {
        return Err(Error::FileAlreadyExists(output.to_owned()));
    }

    if options.level > MAX_LEVEL {
        return Err(Error::InvalidCompressionLevel(options.level));
    }

    if options.format == ArchiveFormat::Gzip {
        let single_file = inputs.len() == 1 && tokio::fs::metadata(&inputs[0]).await?.is_file();
        if !single_file {
            return Err(Error::GzipSingleFile);
        }
    }

    Ok(())
}

pub async fn extract(archive: &Path, dest: &Path, options: ExtractOptions) -> Result<ArchiveStats> {
    let metadata = file::symlink_metadata(archive).await?;
    if metadata.is_dir() {
        return Err(Error::FileIsDirectory(archive.to_owned()));
    }

    // entry names are checked against an absolute root
    let dest_path = file::absolute(dest)?;
    tokio::fs::create_dir_all(&dest_path).await?;

    let archive_path = archive.to_owned();
    let mut stats = spawn_blocking(move || {
        let format = ArchiveFormat::detect(&archive_path)?;
        info!(
            "extracting {} archive {}",
            format,
            format_path(&archive_path)
        );

        let mut job = Job::new(options.cancel.clone(), options.progress.clone());
        match format {
            ArchiveFormat::Gzip => {
                gzip::extract(&archive_path, &dest_path, options.overwrite, &mut job)?;
            }
            ArchiveFormat::Zip => zip::extract(&archive_path, &dest_path, &options, &mut job)?,
            format => tar::extract(&archive_path, &dest_path, format, &options, &mut job)?,
        }

        job.stats.compressed_size = fs::metadata(&archive_path)?.len();
        Result::Ok(job.stats)
    })
    .await??;

    stats.end();
    let formatted_path = format_path(dest);
    let style = AnsiColor::Green.on_default();
    debug!(
        "{style}extracted archive{style:#} into {formatted_path} ({} files)",
        stats.files_processed
    );
    Ok(stats)
}

/// Outcome of checking an entry before it is written to disk.
pub(crate) enum EntryDecision {
    Extract(PathBuf),
    Skip,
}

/// Applies the filter, path traversal and overwrite rules to `name`.
pub(crate) fn decide_entry(dest: &Path, name: &str, options: &ExtractOptions) -> EntryDecision {
    if let Some(filter) = &options.filter {
        if !filter(name) {
            return EntryDecision::Skip;
        }
    }

    let relative = Path::new(name);
    if relative.is_absolute() || !is_within(dest, relative) {
        warn!("skipping unsafe path {}", format_path(relative));
        return EntryDecision::Skip;
    }

    let target = dest.join(relative);
    if !options.overwrite && target.symlink_metadata().is_ok_and(|m| !m.is_dir()) {
        info!("skipping existing file {}", format_path(&target));
        return EntryDecision::Skip;
    }

    EntryDecision::Extract(target)
}

pub async fn info(archive: &Path) -> Result<ArchiveInfo> {
    let metadata = file::symlink_metadata(archive).await?;
    if metadata.is_dir() {
        return Err(Error::FileIsDirectory(archive.to_owned()));
    }

    let archive_path = archive.to_owned();
    let (format, entries, encrypted) = spawn_blocking(move || {
        let format = ArchiveFormat::detect(&archive_path)?;
        let (entries, encrypted) = match format {
            ArchiveFormat::Zip => zip::list(&archive_path)?,
            ArchiveFormat::Gzip => (vec![gzip::output_name(&archive_path)], false),
            format => (tar::list(&archive_path, format)?, false),
        };
        Result::Ok((format, entries, encrypted))
    })
    .await??;

    Ok(ArchiveInfo {
        format,
        size: metadata.len(),
        modified: metadata.modified().ok().map(Into::into),
        entry_count: entries.len(),
        entries,
        encrypted,
    })
}

/// Rough size of the archive `inputs` would produce.
pub async fn estimate_size(inputs: &[PathBuf], format: ArchiveFormat) -> Result<u64> {
    let mut total = 0;
    for input in inputs {
        total += file::directory_size(input, usize::MAX).await?;
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    let estimate = (total as f64 * format.estimated_ratio()) as u64;
    Ok(estimate)
}

/// Copies `reader` into `writer` in chunks, checking for cancellation
/// between them.
pub(crate) fn copy_chunked<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    job: &Job,
) -> Result<u64> {
    let mut buffer = vec![0; CHUNK_SIZE];
    let mut copied = 0;
    loop {
        job.check()?;
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            return Ok(copied);
        }

        writer.write_all(&buffer[..n])?;
        copied += n as u64;
    }
}

pub(crate) fn corrupt(path: &Path, reason: impl ToString) -> Error {
    Error::CorruptArchive {
        path: path.to_owned(),
        reason: reason.to_string(),
    }
}
