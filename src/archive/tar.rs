use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    os::unix::fs::PermissionsExt,
    path::Path,
};

use bzip2::{read::BzDecoder, write::BzEncoder};
use flate2::{read::GzDecoder, write::GzEncoder};
use log::{trace, warn};
use tar::{Archive, Builder, EntryType, Header};

use super::{
    copy_chunked, corrupt, decide_entry, ArchiveFormat, EntryDecision, ExtractOptions, Job,
    PlannedEntry,
};
use crate::{
    error::{Error, Result},
    format::format_path,
};

/// Output stream of a tar archive, optionally compressed.
enum Compressor {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    Bzip2(BzEncoder<BufWriter<File>>),
    Zstd(zstd::Encoder<'static, BufWriter<File>>),
}

impl Compressor {
    fn new(file: File, format: ArchiveFormat, level: u32) -> Result<Self> {
        let writer = BufWriter::new(file);
        let compressor = match format {
            ArchiveFormat::TarGz => {
                Compressor::Gzip(GzEncoder::new(writer, flate2::Compression::new(level)))
            }
            ArchiveFormat::TarBz2 => {
                Compressor::Bzip2(BzEncoder::new(writer, bzip2::Compression::new(level.clamp(1, 9))))
            }
            #[allow(clippy::cast_possible_wrap)]
            ArchiveFormat::TarZst => Compressor::Zstd(zstd::Encoder::new(writer, level as i32)?),
            _ => Compressor::Plain(writer),
        };
        Ok(compressor)
    }

    fn finish(self) -> Result<()> {
        let mut writer = match self {
            Compressor::Plain(writer) => writer,
            Compressor::Gzip(encoder) => encoder.finish()?,
            Compressor::Bzip2(encoder) => encoder.finish()?,
            Compressor::Zstd(encoder) => encoder.finish()?,
        };
        writer.flush()?;
        Ok(())
    }
}

impl Write for Compressor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Compressor::Plain(writer) => writer.write(buf),
            Compressor::Gzip(encoder) => encoder.write(buf),
            Compressor::Bzip2(encoder) => encoder.write(buf),
            Compressor::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Compressor::Plain(writer) => writer.flush(),
            Compressor::Gzip(encoder) => encoder.flush(),
            Compressor::Bzip2(encoder) => encoder.flush(),
            Compressor::Zstd(encoder) => encoder.flush(),
        }
    }
}

fn decompressor(path: &Path, format: ArchiveFormat) -> Result<Box<dyn Read>> {
    let reader = BufReader::new(File::open(path)?);
    let decompressor: Box<dyn Read> = match format {
        ArchiveFormat::TarGz => Box::new(GzDecoder::new(reader)),
        ArchiveFormat::TarBz2 => Box::new(BzDecoder::new(reader)),
        ArchiveFormat::TarZst => Box::new(zstd::Decoder::with_buffer(reader)?),
        _ => Box::new(reader),
    };
    Ok(decompressor)
}

pub fn compress(
    entries: &[PlannedEntry],
    output: &Path,
    format: ArchiveFormat,
    level: u32,
    job: &mut Job,
) -> Result<()> {
    let file = File::create(output)?;
    let mut builder = Builder::new(Compressor::new(file, format, level)?);
    let total = entries.len() as u64;

    for (i, entry) in entries.iter().enumerate() {
        job.check()?;

        let mut source = File::open(&entry.source)?;
        let mut header = Header::new_gnu();
        header.set_metadata(&source.metadata()?);
        builder.append_data(&mut header, &entry.name, &mut source)?;

        trace!("stored {} as {}", format_path(&entry.source), entry.name);
        job.record(entry.size);
        job.report(i as u64 + 1, total);
    }

    builder.into_inner()?.finish()
}

pub fn list(path: &Path, format: ArchiveFormat) -> Result<Vec<String>> {
    let mut archive = Archive::new(decompressor(path, format)?);
    let mut names = Vec::new();
    for entry in archive.entries().map_err(|err| corrupt(path, err))? {
        let entry = entry.map_err(|err| corrupt(path, err))?;
        names.push(entry.path()?.to_string_lossy().into_owned());
    }

    Ok(names)
}

/// Extracts regular files and directories; links and special files are
/// skipped.
pub fn extract(
    path: &Path,
    dest: &Path,
    format: ArchiveFormat,
    options: &ExtractOptions,
    job: &mut Job,
) -> Result<()> {
    let mut archive = Archive::new(decompressor(path, format)?);

    for entry in archive.entries().map_err(|err| corrupt(path, err))? {
        job.check()?;

        let mut entry = entry.map_err(|err| corrupt(path, err))?;
        let name = entry.path()?.to_string_lossy().into_owned();
        let entry_type = entry.header().entry_type();

        let target = match decide_entry(dest, &name, options) {
            EntryDecision::Extract(target) => target,
            EntryDecision::Skip => continue,
        };

        match entry_type {
            EntryType::Directory => {
                fs::create_dir_all(&target)?;
            }
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut output = BufWriter::new(File::create(&target)?);
                let size = copy_chunked(&mut entry, &mut output, job).map_err(|err| match err {
                    Error::Other(_) => corrupt(path, err),
                    err => err,
                })?;
                output.flush()?;

                if options.preserve_permissions {
                    if let Ok(mode) = entry.header().mode() {
                        fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))?;
                    }
                }

                trace!("extracted {name}");
                job.record(size);
            }
            _ => {
                warn!("skipping unsupported entry {name} ({entry_type:?})");
            }
        }
    }

    Ok(())
}
