use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use super::{copy_chunked, corrupt, Job};
use crate::{
    error::{Error, Result},
    file,
};

/// Name of the file a gzip archive decompresses to: the archive name
/// without its last extension.
pub fn output_name(archive: &Path) -> String {
    archive
        .file_stem()
        .map_or_else(|| file::name_of(archive), |stem| stem.to_string_lossy().into_owned())
}

pub fn compress(input: &Path, output: &Path, level: u32, job: &mut Job) -> Result<()> {
    let mut source = File::open(input)?;
    let writer = BufWriter::new(File::create(output)?);
    let mut encoder = GzEncoder::new(writer, Compression::new(level));

    let size = copy_chunked(&mut source, &mut encoder, job)?;
    encoder.finish()?.flush()?;

    job.record(size);
    job.report(1, 1);
    Ok(())
}

pub fn extract(archive: &Path, dest: &Path, overwrite: bool, job: &mut Job) -> Result<PathBuf> {
    let target = dest.join(output_name(archive));
    if !overwrite && target.exists() {
        return Err(Error::FileAlreadyExists(target));
    }

    let mut decoder = GzDecoder::new(BufReader::new(File::open(archive)?));
    let mut output = BufWriter::new(File::create(&target)?);
    let copied = copy_chunked(&mut decoder, &mut output, job).and_then(|size| {
        output.flush()?;
        Ok(size)
    });

    let size = match copied {
        Ok(size) => size,
        Err(err) => {
            drop(output);
            let _ = fs::remove_file(&target);
            return Err(match err {
                Error::Other(_) => corrupt(archive, err),
                err => err,
            });
        }
    };

    job.record(size);
    job.report(1, 1);
    Ok(target)
}
