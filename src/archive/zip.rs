use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    os::unix::fs::PermissionsExt,
    path::Path,
};

use log::{trace, warn};
use zip::{
    result::ZipError,
    write::SimpleFileOptions,
    CompressionMethod, ZipArchive, ZipWriter,
};

use super::{
    copy_chunked, corrupt, decide_entry, EntryDecision, ExtractOptions, Job, PlannedEntry,
};
use crate::{
    error::{Error, Result},
    format::format_path,
};

const LARGE_FILE_THRESHOLD: u64 = u32::MAX as u64;

fn file_options(level: u32, entry: &PlannedEntry, mode: u32) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .unix_permissions(mode)
        .large_file(entry.size >= LARGE_FILE_THRESHOLD);

    if level == 0 {
        options.compression_method(CompressionMethod::Stored)
    } else {
        options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(level)))
    }
}

pub fn compress(entries: &[PlannedEntry], output: &Path, level: u32, job: &mut Job) -> Result<()> {
    let file = File::create(output)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let total = entries.len() as u64;

    for (i, entry) in entries.iter().enumerate() {
        job.check()?;

        let mut source = File::open(&entry.source)?;
        let mode = source.metadata()?.permissions().mode();
        writer.start_file(entry.name.as_str(), file_options(level, entry, mode))?;
        let size = copy_chunked(&mut source, &mut writer, job)?;

        trace!("stored {} as {}", format_path(&entry.source), entry.name);
        job.record(size);
        job.report(i as u64 + 1, total);
    }

    writer.finish()?;
    Ok(())
}

fn open(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = BufReader::new(File::open(path)?);
    ZipArchive::new(file).map_err(|err| corrupt(path, err))
}

fn is_encrypted(archive: &mut ZipArchive<BufReader<File>>) -> Result<bool> {
    for i in 0..archive.len() {
        if archive.by_index_raw(i)?.encrypted() {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Entry names and whether any entry needs a password.
pub fn list(path: &Path) -> Result<(Vec<String>, bool)> {
    let mut archive = open(path)?;
    let names = archive.file_names().map(ToOwned::to_owned).collect();
    let encrypted = is_encrypted(&mut archive)?;
    Ok((names, encrypted))
}

pub fn extract(path: &Path, dest: &Path, options: &ExtractOptions, job: &mut Job) -> Result<()> {
    let mut archive = open(path)?;
    if is_encrypted(&mut archive)? {
        return Err(Error::EncryptedArchive(path.to_owned()));
    }

    let total = archive.len() as u64;
    for i in 0..archive.len() {
        job.check()?;

        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(ZipError::UnsupportedArchive(reason)) => return Err(corrupt(path, reason)),
            Err(err) => return Err(err.into()),
        };

        // names that escape the archive root come back as None
        let name = entry.name().to_owned();
        if entry.enclosed_name().is_none() && !name.is_empty() {
            warn!("skipping unsafe path {name}");
            continue;
        }

        let target = match decide_entry(dest, &name, options) {
            EntryDecision::Extract(target) => target,
            EntryDecision::Skip => continue,
        };

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut output = BufWriter::new(File::create(&target)?);
        let size = copy_chunked(&mut entry, &mut output, job)?;
        output.flush()?;

        if let Some(mode) = entry.unix_mode().filter(|_| options.preserve_permissions) {
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))?;
        }

        trace!("extracted {name}");
        job.record(size);
        job.report(i as u64 + 1, total);
    }

    Ok(())
}
