use std::{
    fmt,
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
    str::FromStr,
};

use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    format::format_path,
};

const TAR_MAGIC_OFFSET: u64 = 257;

const MAGIC_NUMBERS: &[(&[u8], ArchiveFormat)] = &[
    (b"PK\x03\x04", ArchiveFormat::Zip),
    (b"PK\x05\x06", ArchiveFormat::Zip),
    (b"PK\x07\x08", ArchiveFormat::Zip),
    (b"\x1f\x8b", ArchiveFormat::Gzip),
    (b"BZh", ArchiveFormat::TarBz2),
    (b"\x28\xb5\x2f\xfd", ArchiveFormat::TarZst),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum ArchiveFormat {
    #[serde(rename = "zip")]
    #[value(name = "zip")]
    Zip,
    #[serde(rename = "tar")]
    #[value(name = "tar")]
    Tar,
    #[serde(rename = "tar.gz")]
    #[value(name = "tar.gz", alias = "tgz")]
    TarGz,
    #[serde(rename = "tar.bz2")]
    #[value(name = "tar.bz2", alias = "tbz2")]
    TarBz2,
    #[serde(rename = "tar.zst")]
    #[value(name = "tar.zst", alias = "tzst")]
    TarZst,
    #[serde(rename = "gzip")]
    #[value(name = "gzip", alias = "gz")]
    Gzip,
}

impl ArchiveFormat {
    pub const ALL: [ArchiveFormat; 6] = [
        ArchiveFormat::Zip,
        ArchiveFormat::Tar,
        ArchiveFormat::TarGz,
        ArchiveFormat::TarBz2,
        ArchiveFormat::TarZst,
        ArchiveFormat::Gzip,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarBz2 => "tar.bz2",
            ArchiveFormat::TarZst => "tar.zst",
            ArchiveFormat::Gzip => "gzip",
        }
    }

    /// File extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => ".zip",
            ArchiveFormat::Tar => ".tar",
            ArchiveFormat::TarGz => ".tar.gz",
            ArchiveFormat::TarBz2 => ".tar.bz2",
            ArchiveFormat::TarZst => ".tar.zst",
            ArchiveFormat::Gzip => ".gz",
        }
    }

    pub fn is_tar(self) -> bool {
        matches!(
            self,
            ArchiveFormat::Tar | ArchiveFormat::TarGz | ArchiveFormat::TarBz2 | ArchiveFormat::TarZst
        )
    }

    /// Rough compressed/original size ratio used for estimates.
    pub fn estimated_ratio(self) -> f64 {
        match self {
            ArchiveFormat::Zip => 0.7,
            ArchiveFormat::Tar => 1.0,
            ArchiveFormat::TarGz | ArchiveFormat::TarZst | ArchiveFormat::Gzip => 0.3,
            ArchiveFormat::TarBz2 => 0.25,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        let mut suffixes = name.split('.').skip(1).collect::<Vec<_>>();
        if suffixes.is_empty() {
            return None;
        }

        if suffixes.len() >= 2 {
            let double = suffixes[suffixes.len() - 2..].join(".");
            match double.as_str() {
                "tar.gz" => return Some(ArchiveFormat::TarGz),
                "tar.bz2" => return Some(ArchiveFormat::TarBz2),
                "tar.zst" => return Some(ArchiveFormat::TarZst),
                _ => {}
            }
        }

        match suffixes.pop()? {
            "zip" => Some(ArchiveFormat::Zip),
            "tar" => Some(ArchiveFormat::Tar),
            "tgz" => Some(ArchiveFormat::TarGz),
            "tbz2" => Some(ArchiveFormat::TarBz2),
            "tzst" => Some(ArchiveFormat::TarZst),
            "gz" => Some(ArchiveFormat::Gzip),
            _ => None,
        }
    }

    pub fn from_magic(header: &[u8]) -> Option<Self> {
        MAGIC_NUMBERS
            .iter()
            .find(|(magic, _)| header.starts_with(magic))
            .map(|&(_, format)| format)
    }

    /// Detects the format from the file name, falling back to magic numbers.
    pub fn detect(path: &Path) -> Result<Self> {
        if let Some(format) = ArchiveFormat::from_extension(path) {
            return Ok(format);
        }

        match sniff(path) {
            Ok(Some(format)) => return Ok(format),
            Ok(None) => {}
            Err(err) => warn!("could not read header of {}: {err}", format_path(path)),
        }

        Err(Error::UnknownArchiveFormat(path.to_owned()))
    }
}

fn sniff(path: &Path) -> Result<Option<ArchiveFormat>> {
    let mut file = File::open(path)?;
    let mut header = Vec::with_capacity(10);
    file.by_ref().take(10).read_to_end(&mut header)?;
    if let Some(format) = ArchiveFormat::from_magic(&header) {
        return Ok(Some(format));
    }

    let mut signature = [0; 5];
    file.seek(SeekFrom::Start(TAR_MAGIC_OFFSET))?;
    if file.read_exact(&mut signature).is_ok() && &signature == b"ustar" {
        return Ok(Some(ArchiveFormat::Tar));
    }

    Ok(None)
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar" => Ok(ArchiveFormat::Tar),
            "tar.gz" | "tgz" => Ok(ArchiveFormat::TarGz),
            "tar.bz2" | "tbz2" => Ok(ArchiveFormat::TarBz2),
            "tar.zst" | "tzst" => Ok(ArchiveFormat::TarZst),
            "gzip" | "gz" => Ok(ArchiveFormat::Gzip),
            _ => Err(Error::UnsupportedFormat(s.to_owned())),
        }
    }
}
